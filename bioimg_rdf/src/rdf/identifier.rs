use std::borrow::Borrow;
use std::fmt::Display;

/// Keywords of the reference implementation's language, rejected for
/// round-trip compatibility.
const RESERVED_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue", "def",
    "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierParsingError {
    #[error("Identifier must not be empty")]
    Empty,
    #[error("Identifier must start with a letter or underscore: '{found}'")]
    BadFirstCharacter { found: String },
    #[error("Identifier may only contain letters, digits and underscores: '{found}'")]
    BadCharacter { found: String },
    #[error("'{found}' is a reserved keyword")]
    ReservedKeyword { found: String },
    #[error("Identifier too long ({found} > {max} characters): '{value}'")]
    TooLong { value: String, found: usize, max: usize },
    #[error("Identifier must be all-lowercase: '{found}'")]
    NotLowercase { found: String },
}

fn check_identifier(value: &str) -> Result<(), IdentifierParsingError> {
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(IdentifierParsingError::Empty);
    };
    if !(first.is_alphabetic() || first == '_') {
        return Err(IdentifierParsingError::BadFirstCharacter { found: value.into() });
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return Err(IdentifierParsingError::BadCharacter { found: value.into() });
    }
    if RESERVED_KEYWORDS.contains(&value) {
        return Err(IdentifierParsingError::ReservedKeyword { found: value.into() });
    }
    Ok(())
}

/// A valid identifier: non-empty, starts with a letter or underscore,
/// otherwise letters, digits and underscores.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_identifier(&value)?;
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Identifier {
    type Error = IdentifierParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An all-lowercase [`Identifier`] with a maximum length.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct LowerCaseIdentifier<const MAX: usize>(String);

impl<const MAX: usize> LowerCaseIdentifier<MAX> {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<const MAX: usize> TryFrom<String> for LowerCaseIdentifier<MAX> {
    type Error = IdentifierParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_identifier(&value)?;
        if value.chars().any(|c| c.is_uppercase()) {
            return Err(IdentifierParsingError::NotLowercase { found: value });
        }
        let found = value.chars().count();
        if found > MAX {
            return Err(IdentifierParsingError::TooLong { value, found, max: MAX });
        }
        Ok(Self(value))
    }
}

impl<const MAX: usize> TryFrom<&str> for LowerCaseIdentifier<MAX> {
    type Error = IdentifierParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl<const MAX: usize> From<LowerCaseIdentifier<MAX>> for String {
    fn from(value: LowerCaseIdentifier<MAX>) -> Self {
        value.0
    }
}

impl<const MAX: usize> Borrow<str> for LowerCaseIdentifier<MAX> {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<const MAX: usize> Display for LowerCaseIdentifier<MAX> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceIdParsingError {
    #[error("Resource id must not be empty")]
    Empty,
    #[error("Resource id must not start or end with '/': '{found}'")]
    BadSlashPosition { found: String },
    #[error("Resource id may only contain [a-z0-9_\\-/.]: '{found}'")]
    BadCharacter { found: String },
}

/// A bioimage.io wide resource identifier, e.g. `affable-shark` or
/// `ilastik/ilastik`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ResourceIdParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ResourceIdParsingError::Empty);
        }
        if value.starts_with('/') || value.ends_with('/') {
            return Err(ResourceIdParsingError::BadSlashPosition { found: value });
        }
        let ok = value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '/' | '.'));
        if !ok {
            return Err(ResourceIdParsingError::BadCharacter { found: value });
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for ResourceId {
    type Error = ResourceIdParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<ResourceId> for String {
    fn from(value: ResourceId) -> Self {
        value.0
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validate_from_string!(Identifier, "value_error.identifier");
impl_validate_from_string!(ResourceId, "value_error.resource_id");

impl<const MAX: usize> crate::validation::Validate for LowerCaseIdentifier<MAX> {
    fn validate(value: &crate::yaml::YamlValue, cx: &mut crate::validation::Validator) -> Option<Self> {
        let raw = <String as crate::validation::Validate>::validate(value, cx)?;
        match Self::try_from(raw) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                cx.error("value_error.identifier", err.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_identifier_rules() {
        assert!(Identifier::try_from("valid_name1").is_ok());
        assert!(Identifier::try_from("_leading").is_ok());
        assert!(Identifier::try_from("1starts_with_digit").is_err());
        assert!(Identifier::try_from("has-dash").is_err());
        assert!(Identifier::try_from("").is_err());
        assert!(Identifier::try_from("lambda").is_err());
    }

    #[test]
    fn test_lowercase_identifier_bounds() {
        type AxisStyle = LowerCaseIdentifier<16>;
        assert!(AxisStyle::try_from("x").is_ok());
        assert!(AxisStyle::try_from("X").is_err());
        assert!(AxisStyle::try_from("a_very_long_axis_name").is_err());
    }

    #[test]
    fn test_resource_id() {
        assert!(ResourceId::try_from("affable-shark").is_ok());
        assert!(ResourceId::try_from("ilastik/ilastik").is_ok());
        assert!(ResourceId::try_from("/leading").is_err());
        assert!(ResourceId::try_from("trailing/").is_err());
        assert!(ResourceId::try_from("UpperCase").is_err());
    }
}
