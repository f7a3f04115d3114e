use std::fmt::Display;
use std::path::PathBuf;

use crate::validation::{Validate, Validator};
use crate::yaml::YamlValue;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpUrlParsingError {
    #[error("Could not parse url: {0}")]
    BadUrl(String),
    #[error("Expected http or https scheme, found '{scheme}'")]
    BadScheme { scheme: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct HttpUrl(url::Url);

impl HttpUrl {
    pub fn as_url(&self) -> &url::Url {
        &self.0
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.path_segments()?.filter(|segment| !segment.is_empty()).last()
    }

    /// Append path segments, e.g. to resolve a relative path against a URL root.
    pub fn joined(&self, relative: &str) -> Result<HttpUrl, HttpUrlParsingError> {
        let mut base = self.0.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let joined = url::Url::parse(&base)
            .and_then(|b| b.join(relative))
            .map_err(|e| HttpUrlParsingError::BadUrl(e.to_string()))?;
        Ok(HttpUrl(joined))
    }
}

impl TryFrom<String> for HttpUrl {
    type Error = HttpUrlParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let parsed = url::Url::parse(&value).map_err(|e| HttpUrlParsingError::BadUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self(parsed)),
            scheme => Err(HttpUrlParsingError::BadScheme { scheme: scheme.into() }),
        }
    }
}

impl TryFrom<&str> for HttpUrl {
    type Error = HttpUrlParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<HttpUrl> for String {
    fn from(value: HttpUrl) -> Self {
        value.0.to_string()
    }
}

impl Display for HttpUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FsPathParsingError {
    #[error("Path may not be empty")]
    Empty,
    #[error("Expected a relative path, found '{found}'")]
    NotRelative { found: String },
    #[error("Path may not contain '..': '{found}'")]
    ParentComponent { found: String },
}

/// A purely relative POSIX path, resolved against the context root.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct FsPath(String);

impl FsPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty() && *c != ".")
    }

    pub fn file_name(&self) -> &str {
        self.components().last().unwrap_or(&self.0)
    }
}

impl TryFrom<String> for FsPath {
    type Error = FsPathParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(FsPathParsingError::Empty);
        }
        if value.starts_with('/') {
            return Err(FsPathParsingError::NotRelative { found: value });
        }
        if value.split('/').any(|c| c == "..") {
            return Err(FsPathParsingError::ParentComponent { found: value });
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for FsPath {
    type Error = FsPathParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<FsPath> for String {
    fn from(value: FsPath) -> Self {
        value.0
    }
}

impl Display for FsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a referenced file lives: a URL, an absolute local path, or a path
/// relative to the context root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FileReference {
    Url(HttpUrl),
    AbsolutePath(PathBuf),
    Path(FsPath),
}

impl FileReference {
    pub fn file_name(&self) -> String {
        match self {
            Self::Url(url) => url.file_name().unwrap_or("file").to_owned(),
            Self::AbsolutePath(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_owned()),
            Self::Path(path) => path.file_name().to_owned(),
        }
    }

    pub fn has_suffix(&self, suffix: &str, case_sensitive: bool) -> bool {
        let name = self.file_name();
        if case_sensitive {
            name.ends_with(suffix)
        } else {
            name.to_lowercase().ends_with(&suffix.to_lowercase())
        }
    }
}

impl From<FsPath> for FileReference {
    fn from(value: FsPath) -> Self {
        Self::Path(value)
    }
}

impl From<HttpUrl> for FileReference {
    fn from(value: HttpUrl) -> Self {
        Self::Url(value)
    }
}

impl Display for FileReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => url.fmt(f),
            Self::AbsolutePath(path) => write!(f, "{}", path.to_string_lossy()),
            Self::Path(path) => path.fmt(f),
        }
    }
}

impl Validate for FileReference {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = String::validate(value, cx)?;
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return match HttpUrl::try_from(raw) {
                Ok(url) => Some(Self::Url(url)),
                Err(err) => {
                    cx.error("value_error.url", err.to_string());
                    None
                }
            };
        }
        if raw.starts_with('/') {
            return Some(Self::AbsolutePath(PathBuf::from(raw)));
        }
        match FsPath::try_from(raw) {
            Ok(path) => Some(Self::Path(path)),
            Err(err) => {
                cx.error("value_error.path", err.to_string());
                None
            }
        }
    }
}

impl_validate_from_string!(HttpUrl, "value_error.url");

/// Records a suffix violation as an error (or as a warning for lenient call
/// sites). Matching is case-sensitive unless stated otherwise.
pub fn check_suffix(cx: &mut Validator, reference: &FileReference, suffixes: &[&str], case_sensitive: bool) {
    if suffixes.iter().any(|s| reference.has_suffix(s, case_sensitive)) {
        return;
    }
    cx.error(
        "value_error.suffix",
        format!("Expected a file with suffix {} but got '{}'", suffixes.join(" or "), reference),
    );
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fs_path_rules() {
        assert!(FsPath::try_from("weights/model.pt").is_ok());
        assert!(FsPath::try_from("/absolute").is_err());
        assert!(FsPath::try_from("../escape").is_err());
        assert_eq!(FsPath::try_from("a/b/c.npy").unwrap().file_name(), "c.npy");
    }

    #[test]
    fn test_url_file_name() {
        let url = HttpUrl::try_from("https://example.com/files/data.npy?download=1").unwrap();
        assert_eq!(url.file_name(), Some("data.npy"));
    }

    #[test]
    fn test_suffix_check() {
        let md = FileReference::Path(FsPath::try_from("docs/README.md").unwrap());
        assert!(md.has_suffix(".md", true));
        assert!(!md.has_suffix(".MD", true));
        assert!(md.has_suffix(".MD", false));
    }
}
