use std::fmt::Display;

use crate::validation::{Validate, Validator};
use crate::yaml::YamlValue;

use super::file_reference::FileReference;

#[derive(thiserror::Error, Debug, Clone)]
pub enum IconParsingError {
    #[error("Emoji icon must be 1 or 2 characters, found {found}")]
    BadLength { found: usize },
}

/// One or two characters standing in for an image icon.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct EmojiIcon(String);

impl EmojiIcon {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmojiIcon {
    type Error = IconParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let found = value.chars().count();
        if found == 0 || found > 2 {
            return Err(IconParsingError::BadLength { found });
        }
        Ok(Self(value))
    }
}

impl From<EmojiIcon> for String {
    fn from(value: EmojiIcon) -> Self {
        value.0
    }
}

impl Display for EmojiIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validate_from_string!(EmojiIcon, "value_error.icon");

/// An icon for illustration, either an emoji or an image file.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Icon {
    Emoji(EmojiIcon),
    FileRef(FileReference),
}

impl Display for Icon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emoji(emoji) => emoji.fmt(f),
            Self::FileRef(reference) => reference.fmt(f),
        }
    }
}

impl Validate for Icon {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = String::validate(value, cx)?;
        if raw.chars().count() <= 2 {
            return match EmojiIcon::try_from(raw) {
                Ok(emoji) => Some(Icon::Emoji(emoji)),
                Err(err) => {
                    cx.error("value_error.icon", err.to_string());
                    None
                }
            };
        }
        FileReference::validate(value, cx).map(Icon::FileRef)
    }
}
