use std::fmt::Display;

use crate::validation::{Severity, Validate, Validator};
use crate::yaml::{Mapping, YamlValue};

use super::file_reference::FileReference;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Sha256ParsingError {
    #[error("Expected 64 characters, found {found}")]
    BadLength { found: usize },
    #[error("Expected lower-case hex characters: '{found}'")]
    BadCharacter { found: String },
}

/// A SHA-256 digest as 64 lower-case hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Sha256(String);

impl Sha256 {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sha256 {
    type Error = Sha256ParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() != 64 {
            return Err(Sha256ParsingError::BadLength { found: value.len() });
        }
        if !value.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)) {
            return Err(Sha256ParsingError::BadCharacter { found: value });
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Sha256 {
    type Error = Sha256ParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<Sha256> for String {
    fn from(value: Sha256) -> Self {
        value.0
    }
}

impl Display for Sha256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validate_from_string!(Sha256, "value_error.sha256");

/// A referenced file with an optional content hash.
///
/// Accepts either a bare file source string or `{source, sha256?}`. When I/O
/// checks are enabled the referenced bytes are fetched (or read from cache),
/// hashed streamingly and compared against the declared hash; a missing hash
/// is filled in with the computed one.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileDescr {
    pub source: FileReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub sha256: Option<Sha256>,
}

impl FileDescr {
    pub fn new(source: FileReference) -> Self {
        Self { source, sha256: None }
    }

    /// The I/O dependent part of file validation, shared by `FileDescr`
    /// fields and bare `FileSource` fields.
    pub fn run_io_checks(&mut self, cx: &mut Validator) {
        if let FileReference::AbsolutePath(path) = &self.source {
            // absolute local paths are checked even with io checks disabled
            if !path.exists() {
                cx.io_error(format!("File not found: {}", path.to_string_lossy()));
                return;
            }
        }
        if !cx.ctx.perform_io_checks {
            return;
        }
        let Some(checker) = cx.ctx.source_checker.clone() else {
            return;
        };

        let computed = match cx.ctx.known_sha(&self.source) {
            Some(known) => known,
            None => match checker.fetch_sha256(cx.ctx, &self.source) {
                Ok(sha) => {
                    cx.ctx.remember_sha(&self.source, Some(sha.clone()));
                    Some(sha)
                }
                Err(err) => {
                    cx.io_error(err.to_string());
                    return;
                }
            },
        };
        let Some(computed) = computed else {
            return;
        };

        match (&self.sha256, cx.ctx.update_hashes) {
            (_, true) => self.sha256 = Some(computed),
            (None, false) => self.sha256 = Some(computed),
            (Some(declared), false) => {
                if declared != &computed {
                    cx.io_error(format!(
                        "Sha256 mismatch for {}: declared {declared}, computed {computed}",
                        self.source
                    ));
                }
            }
        }
    }
}

impl Display for FileDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Validate for FileDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let mut descr = match value {
            YamlValue::String(_) => FileDescr::new(FileReference::validate(value, cx)?),
            YamlValue::Mapping(map) => {
                cx.forbid_unknown(map, &["source", "sha256"]);
                let source: FileReference = cx.required(map, "source")?;
                let sha256: Option<Sha256> = cx.optional(map, "sha256");
                FileDescr { source, sha256 }
            }
            other => {
                cx.type_error("map", other);
                return None;
            }
        };
        descr.run_io_checks(cx);
        Some(descr)
    }
}

/// Checks existence of a bare file source; URL timeouts demote to warnings.
pub fn check_source_exists(cx: &mut Validator, source: &FileReference) {
    if let FileReference::AbsolutePath(path) = source {
        if !path.exists() {
            cx.io_error(format!("File not found: {}", path.to_string_lossy()));
        }
        return;
    }
    if !cx.ctx.perform_io_checks {
        return;
    }
    let Some(checker) = cx.ctx.source_checker.clone() else {
        return;
    };
    if let Err(err) = checker.exists(cx.ctx, source) {
        match source {
            FileReference::Url(_) => cx.warn(Severity::Warning, err.to_string()),
            _ => cx.io_error(err.to_string()),
        }
    }
}

/// Validates a `{source, sha256?}` object out of a mapping field that other
/// nodes embed inline (e.g. weights entries carry their own extra fields).
pub fn file_descr_from_fields(map: &Mapping, cx: &mut Validator) -> Option<FileDescr> {
    let source: FileReference = cx.required(map, "source")?;
    let sha256: Option<Sha256> = cx.optional(map, "sha256");
    let mut descr = FileDescr { source, sha256 };
    descr.run_io_checks(cx);
    Some(descr)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sha256_shape() {
        let ok = "a".repeat(64);
        assert!(Sha256::try_from(ok).is_ok());
        assert!(Sha256::try_from("a".repeat(63)).is_err());
        assert!(Sha256::try_from("A".repeat(64)).is_err());
        assert!(Sha256::try_from("g".repeat(64)).is_err());
    }
}
