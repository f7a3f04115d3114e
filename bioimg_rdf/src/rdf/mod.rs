pub mod attachment;
pub mod author;
pub mod badge;
pub mod bounded_string;
pub mod cite_entry;
pub mod collection;
pub mod file_description;
pub mod file_reference;
pub mod generic;
pub mod icon;
pub mod identifier;
pub mod legacy;
pub mod license;
pub mod lowercase;
pub mod maintainer;
pub mod model;
pub mod non_empty_list;
pub mod orcid;
pub mod si_units;
pub mod slashless_string;
pub mod tag;
pub mod version;

pub use attachment::Attachment;
pub use author::{Author, Email, GithubUser, PersonName};
pub use badge::Badge;
pub use bounded_string::BoundedString;
pub use cite_entry::{CiteEntry, Doi};
pub use collection::CollectionDescr;
pub use file_description::{FileDescr, Sha256};
pub use file_reference::{FileReference, FsPath, HttpUrl};
pub use generic::{ApplicationDescr, DatasetDescr, GenericBase, GenericDescr, NotebookDescr, Uploader};
pub use icon::{EmojiIcon, Icon};
pub use identifier::{Identifier, LowerCaseIdentifier, ResourceId};
pub use license::{LicenseId, LicenseStatus};
pub use maintainer::Maintainer;
pub use non_empty_list::NonEmptyList;
pub use orcid::Orcid;
pub use si_units::SiUnit;
pub use tag::Tag;
pub use version::{FormatVersion, Version};

pub type ResourceName = BoundedString<1, 128>;
pub type ResourceTextDescription = BoundedString<0, 1024>;

/// Declares a unit struct that serializes to a fixed `type` string.
#[macro_export]
macro_rules! declare_type_marker {
    ($name:ident, $text:literal) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        #[serde(try_from = "String")]
        #[serde(into = "String")]
        pub struct $name;

        impl From<$name> for String {
            fn from(_: $name) -> Self {
                $text.into()
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                if value == $text {
                    Ok(Self)
                } else {
                    Err(value)
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, $text)
            }
        }
    };
}
