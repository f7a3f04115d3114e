use std::fmt::Display;
use std::sync::OnceLock;

use regex::Regex;

use crate::validation::{Validate, Validator};
use crate::yaml::YamlValue;

use super::bounded_string::BoundedString;
use super::file_reference::HttpUrl;

// lax DOI check covering the first characters only
fn doi_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^10\.[0-9]{4}.+$").expect("DOI pattern is a valid regex"))
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DoiParsingError {
    #[error("'{found}' is not a DOI (a DOI url prefix is not allowed here)")]
    NoMatch { found: String },
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Doi(String);

impl Doi {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Doi {
    type Error = DoiParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if doi_regex().is_match(&value) {
            Ok(Self(value))
        } else {
            Err(DoiParsingError::NoMatch { found: value })
        }
    }
}

impl From<Doi> for String {
    fn from(value: Doi) -> Self {
        value.0
    }
}

impl Display for Doi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validate_from_string!(Doi, "value_error.doi");

/// A citation with at least one of `doi` and `url`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CiteEntry {
    pub text: BoundedString<1, 1024>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub doi: Option<Doi>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub url: Option<HttpUrl>,
}

impl Display for CiteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Validate for CiteEntry {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["text", "doi", "url"]);
        let text = cx.required(map, "text");
        let doi: Option<Doi> = cx.optional(map, "doi");
        let url: Option<HttpUrl> = cx.optional(map, "url");
        if doi.is_none() && url.is_none() {
            cx.error("value_error.cite", "Either 'doi' or 'url' is required");
        }
        Some(CiteEntry { text: text?, doi, url })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::ValidationContext;

    #[test]
    fn test_doi() {
        assert!(Doi::try_from("10.1000/xyz123".to_owned()).is_ok());
        assert!(Doi::try_from("https://doi.org/10.1000/xyz123".to_owned()).is_err());
    }

    #[test]
    fn test_cite_needs_doi_or_url() {
        let ctx = ValidationContext::default();
        let mut cx = Validator::new(&ctx);
        let raw: YamlValue = serde_yaml::from_str("{text: Some paper}").unwrap();
        let entry = CiteEntry::validate(&raw, &mut cx);
        assert!(entry.is_some());
        let (errors, _) = cx.into_diagnostics();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, "value_error.cite");
    }
}
