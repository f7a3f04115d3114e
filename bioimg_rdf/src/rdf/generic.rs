use std::fmt::Display;

use crate::validation::{Severity, Validate, Validator};
use crate::yaml::{Mapping, YamlValue};

use super::attachment::Attachment;
use super::author::{Author, Email, PersonName};
use super::badge::Badge;
use super::bounded_string::BoundedString;
use super::cite_entry::CiteEntry;
use super::file_description::{check_source_exists, FileDescr};
use super::file_reference::{check_suffix, FileReference, HttpUrl};
use super::icon::Icon;
use super::identifier::ResourceId;
use super::license::LicenseId;
use super::maintainer::Maintainer;
use super::non_empty_list::NonEmptyList;
use super::tag::Tag;
use super::version::{FormatVersion, Version};
use crate::declare_type_marker;

pub const VALID_COVER_IMAGE_SUFFIXES: &[&str] = &[".gif", ".jpeg", ".jpg", ".png", ".svg"];

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Uploader {
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub name: Option<PersonName>,
}

impl Validate for Uploader {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["email", "name"]);
        let email = cx.required(map, "email");
        let name = cx.optional(map, "name");
        Some(Uploader { email: email?, name })
    }
}

/// How the `name` field is restricted, per resource kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamePolicy {
    Generic,
    Model,
}

/// The fields shared by every resource description kind.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct GenericBase {
    pub format_version: FormatVersion,
    pub name: BoundedString<1, 128>,
    pub description: BoundedString<0, 1024>,
    pub authors: NonEmptyList<Author>,
    pub cite: NonEmptyList<CiteEntry>,
    pub license: LicenseId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub covers: Vec<FileReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_emoji: Option<super::icon::EmojiIcon>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<Badge>,
    #[serde(skip_serializing_if = "Mapping::is_empty")]
    pub config: Mapping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_repo: Option<HttpUrl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<Maintainer>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_comment: Option<BoundedString<1, 1024>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<Uploader>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<FileDescr>,
}

pub const ENVELOPE_FIELDS: &[&str] = &[
    "format_version",
    "type",
    "name",
    "description",
    "authors",
    "cite",
    "license",
    "covers",
    "id",
    "id_emoji",
    "attachments",
    "badges",
    "config",
    "git_repo",
    "icon",
    "links",
    "maintainers",
    "tags",
    "version",
    "version_comment",
    "uploader",
    "documentation",
];

impl GenericBase {
    /// Validates the shared fields of `map`. Unknown-field checking is left
    /// to the caller, which knows the full field set of its resource kind.
    pub fn validate_fields(map: &Mapping, cx: &mut Validator, name_policy: NamePolicy) -> Option<Self> {
        let format_version: Option<FormatVersion> = cx.required(map, "format_version");
        let name = Self::validate_name(map, cx, name_policy);
        let description = cx.required(map, "description");
        let authors: Option<NonEmptyList<Author>> = cx.required(map, "authors");
        let cite: Option<NonEmptyList<CiteEntry>> = cx.required(map, "cite");
        let license: Option<LicenseId> = cx.required(map, "license");

        let covers: Vec<FileReference> = cx.optional_or(map, "covers", Vec::new());
        cx.with("covers", |cx| {
            for (idx, cover) in covers.iter().enumerate() {
                cx.with(idx, |cx| {
                    check_suffix(cx, cover, VALID_COVER_IMAGE_SUFFIXES, false);
                    check_source_exists(cx, cover);
                });
            }
        });

        let id = cx.optional(map, "id");
        let id_emoji = cx.optional(map, "id_emoji");
        let attachments: Vec<Attachment> = cx.optional_or(map, "attachments", Vec::new());
        let badges: Vec<Badge> = cx.optional_or(map, "badges", Vec::new());
        let config: Mapping = cx.optional_or_else(map, "config", Mapping::new);
        let git_repo = cx.optional(map, "git_repo");
        let icon: Option<Icon> = cx.optional(map, "icon");
        if let Some(Icon::FileRef(reference)) = &icon {
            cx.with("icon", |cx| check_source_exists(cx, reference));
        }
        let links: Vec<String> = cx.optional_or(map, "links", Vec::new());
        let maintainers: Vec<Maintainer> = cx.optional_or(map, "maintainers", Vec::new());
        let tags: Vec<Tag> = cx.optional_or(map, "tags", Vec::new());
        let version = cx.optional(map, "version");
        let version_comment = cx.optional(map, "version_comment");
        let uploader = cx.optional(map, "uploader");

        let documentation: Option<FileDescr> = cx.optional(map, "documentation");
        if let Some(doc) = &documentation {
            cx.with("documentation", |cx| {
                check_suffix(cx, &doc.source, &[".md"], true);
            });
        }

        Some(Self {
            format_version: format_version?,
            name: name?,
            description: description?,
            authors: authors?,
            cite: cite?,
            license: license?,
            covers,
            id,
            id_emoji,
            attachments,
            badges,
            config,
            git_repo,
            icon,
            links,
            maintainers,
            tags,
            version,
            version_comment,
            uploader,
            documentation,
        })
    }

    fn validate_name(map: &Mapping, cx: &mut Validator, policy: NamePolicy) -> Option<BoundedString<1, 128>> {
        let name: BoundedString<1, 128> = cx.required(map, "name")?;
        cx.with("name", |cx| {
            let text = name.as_str();
            match policy {
                NamePolicy::Generic => {}
                NamePolicy::Model => {
                    if text.chars().count() < 5 {
                        cx.error("value_error.str", "Model names must have at least 5 characters");
                    }
                    let ok = text
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | ' ' | '(' | ')'));
                    if !ok {
                        cx.error(
                            "value_error.str",
                            "Model names may only contain letters, digits, '_+-()' and spaces",
                        );
                    }
                }
            }
            if text.chars().count() > 64 {
                cx.warn(Severity::Info, "Name longer than 64 characters.");
            }
        });
        Some(name)
    }
}

declare_type_marker!(ApplicationTypeMarker, "application");
declare_type_marker!(DatasetTypeMarker, "dataset");
declare_type_marker!(NotebookTypeMarker, "notebook");

/// Fallback description for `generic` resources and unknown resource types.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct GenericDescr {
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(flatten)]
    pub base: GenericBase,
}

impl GenericDescr {
    pub fn validate_content(map: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(map, ENVELOPE_FIELDS);
        let resource_type = cx.optional_or(map, "type", "generic".to_owned());
        let base = GenericBase::validate_fields(map, cx, NamePolicy::Generic)?;
        Some(Self { resource_type, base })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ApplicationDescr {
    #[serde(rename = "type")]
    pub marker: ApplicationTypeMarker,
    #[serde(flatten)]
    pub base: GenericBase,
    /// The primary source of the application
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<FileDescr>,
}

impl ApplicationDescr {
    pub fn validate_content(map: &Mapping, cx: &mut Validator) -> Option<Self> {
        let mut known: Vec<&str> = ENVELOPE_FIELDS.to_vec();
        known.push("source");
        cx.forbid_unknown(map, &known);
        let source = cx.optional(map, "source");
        let base = GenericBase::validate_fields(map, cx, NamePolicy::Generic)?;
        Some(Self {
            marker: ApplicationTypeMarker,
            base,
            source,
        })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DatasetDescr {
    #[serde(rename = "type")]
    pub marker: DatasetTypeMarker,
    #[serde(flatten)]
    pub base: GenericBase,
    /// URL to the source of the dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<HttpUrl>,
}

impl DatasetDescr {
    pub fn validate_content(map: &Mapping, cx: &mut Validator) -> Option<Self> {
        let mut known: Vec<&str> = ENVELOPE_FIELDS.to_vec();
        known.push("source");
        cx.forbid_unknown(map, &known);
        let source = cx.optional(map, "source");
        let base = GenericBase::validate_fields(map, cx, NamePolicy::Generic)?;
        Some(Self {
            marker: DatasetTypeMarker,
            base,
            source,
        })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct NotebookDescr {
    #[serde(rename = "type")]
    pub marker: NotebookTypeMarker,
    #[serde(flatten)]
    pub base: GenericBase,
    /// The Jupyter notebook
    pub source: FileDescr,
}

impl NotebookDescr {
    pub fn validate_content(map: &Mapping, cx: &mut Validator) -> Option<Self> {
        let mut known: Vec<&str> = ENVELOPE_FIELDS.to_vec();
        known.push("source");
        cx.forbid_unknown(map, &known);
        let source: Option<FileDescr> = cx.required(map, "source");
        if let Some(src) = &source {
            cx.with("source", |cx| check_suffix(cx, &src.source, &[".ipynb"], true));
        }
        let base = GenericBase::validate_fields(map, cx, NamePolicy::Generic)?;
        Some(Self {
            marker: NotebookTypeMarker,
            base,
            source: source?,
        })
    }
}

impl Display for GenericDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.resource_type, self.base.name)
    }
}
