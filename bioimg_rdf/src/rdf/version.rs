use std::fmt::Display;
use std::str::FromStr;

#[derive(thiserror::Error, Debug)]
pub enum VersionParsingError {
    #[error(transparent)]
    BadVersionString {
        #[from]
        source: versions::Error,
    },
}

/// A resource or library version, parsed leniently (PEP-440 style epochs,
/// pre/post/dev segments and local parts are accepted).
#[derive(
    PartialOrd,
    Ord,
    Clone,
    Debug,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    derive_more::Display,
    derive_more::Deref,
    derive_more::FromStr,
)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Version(versions::Version);

impl Version {
    pub fn major_minor_patch(major: u32, minor: u32, patch: u32) -> Self {
        Version(versions::Version {
            chunks: versions::Chunks(vec![
                versions::Chunk::Numeric(major),
                versions::Chunk::Numeric(minor),
                versions::Chunk::Numeric(patch),
            ]),
            ..Default::default()
        })
    }
}

impl TryFrom<String> for Version {
    type Error = VersionParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let inner = versions::Version::from_str(&value)?;
        Ok(Self(inner))
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.0.to_string()
    }
}

impl crate::validation::Validate for Version {
    fn validate(value: &crate::yaml::YamlValue, cx: &mut crate::validation::Validator) -> Option<Self> {
        use crate::yaml::YamlValue;
        // version fields are commonly written unquoted, so YAML hands us
        // numbers for e.g. `version: 0.1`
        let raw = match value {
            YamlValue::String(s) => s.clone(),
            YamlValue::Number(n) => n.to_string(),
            other => {
                cx.type_error("str", other);
                return None;
            }
        };
        match Self::try_from(raw) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                cx.error("value_error.version", err.to_string());
                None
            }
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatVersionParsingError {
    #[error("Expected a 'MAJOR.MINOR.PATCH' version, found '{found}'")]
    BadShape { found: String },
    #[error("Version component is not a number in '{found}'")]
    NotANumber { found: String },
}

/// The RDF schema version; only `MAJOR.MINOR` selects the schema, patch
/// differences are tolerated.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FormatVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    pub fn major_minor(&self) -> (u32, u32) {
        (self.major, self.minor)
    }
}

impl TryFrom<String> for FormatVersion {
    type Error = FormatVersionParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&str> for FormatVersion {
    type Error = FormatVersionParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parts: Vec<&str> = value.split('.').collect();
        let (major, minor, patch) = match parts.as_slice() {
            [major] => (*major, "0", "0"),
            [major, minor] => (*major, *minor, "0"),
            [major, minor, patch] => (*major, *minor, *patch),
            _ => return Err(FormatVersionParsingError::BadShape { found: value.into() }),
        };
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|_| FormatVersionParsingError::NotANumber { found: value.into() })
        };
        Ok(Self {
            major: parse(major)?,
            minor: parse(minor)?,
            patch: parse(patch)?,
        })
    }
}

impl From<FormatVersion> for String {
    fn from(value: FormatVersion) -> Self {
        value.to_string()
    }
}

impl Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl_validate_from_string!(FormatVersion, "value_error.format_version");

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_format_version_rounding() {
        let v = FormatVersion::try_from("0.5.3").unwrap();
        assert_eq!(v.major_minor(), (0, 5));
        assert_eq!(FormatVersion::try_from("0.5").unwrap().patch, 0);
        assert!(FormatVersion::try_from("0.5.x").is_err());
        assert!(FormatVersion::try_from("0.5.3.1").is_err());
    }

    #[test]
    fn test_version_ordering() {
        let a = Version::try_from("0.4.10".to_owned()).unwrap();
        let b = Version::try_from("0.5.0".to_owned()).unwrap();
        assert!(a < b);
    }
}
