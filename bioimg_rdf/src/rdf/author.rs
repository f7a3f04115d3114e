use std::fmt::Display;

use crate::validation::{Validate, Validator};
use crate::yaml::YamlValue;

use super::bounded_string::BoundedString;
use super::orcid::Orcid;
use super::slashless_string::SlashlessString;

pub type PersonName = SlashlessString<BoundedString<1, 1024>>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailParsingError {
    #[error("'{found}' does not look like an email address")]
    NoAtSign { found: String },
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct Email(String);

impl TryFrom<String> for Email {
    type Error = EmailParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut parts = value.splitn(2, '@');
        let local = parts.next().unwrap_or("");
        let domain = parts.next().unwrap_or("");
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(EmailParsingError::NoAtSign { found: value });
        }
        Ok(Self(value))
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validate_from_string!(Email, "value_error.email");

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GithubUserParsingError {
    #[error("Github user name may not be empty")]
    Empty,
    #[error("Expected a github user name, not a url: '{found}'")]
    IsUrl { found: String },
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct GithubUser(String);

impl GithubUser {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GithubUser {
    type Error = GithubUserParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(GithubUserParsingError::Empty);
        }
        if value.starts_with("http://") || value.starts_with("https://") {
            return Err(GithubUserParsingError::IsUrl { found: value });
        }
        Ok(Self(value))
    }
}

impl From<GithubUser> for String {
    fn from(value: GithubUser) -> Self {
        value.0
    }
}

impl Display for GithubUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl_validate_from_string!(GithubUser, "value_error.github_user");

/// A creator of the resource description and primary point of contact.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Author {
    pub name: PersonName,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub affiliation: Option<BoundedString<1, 1024>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub orcid: Option<Orcid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub github_user: Option<GithubUser>,
}

impl Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Validate for Author {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["name", "affiliation", "email", "orcid", "github_user"]);
        let name = cx.required(map, "name");
        let affiliation = cx.optional(map, "affiliation");
        let email = cx.optional(map, "email");
        let orcid = cx.optional(map, "orcid");
        let github_user = cx.optional(map, "github_user");
        Some(Author {
            name: name?,
            affiliation,
            email,
            orcid,
            github_user,
        })
    }
}

impl Validate for PersonName {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = String::validate(value, cx)?;
        match Self::try_from(raw) {
            Ok(name) => Some(name),
            Err(err) => {
                cx.error("value_error.name", err.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::context::ValidationContext;

    #[test]
    fn test_author_validation() {
        let ctx = ValidationContext::default();
        let mut cx = Validator::new(&ctx);
        let raw: YamlValue =
            serde_yaml::from_str("{name: Jane Doe, orcid: 0000-0002-1825-0097, email: jane@example.com}").unwrap();
        let author = Author::validate(&raw, &mut cx).unwrap();
        assert_eq!(author.name.to_string(), "Jane Doe");
        let (errors, _) = cx.into_diagnostics();
        assert!(errors.is_empty());
    }

    #[test]
    fn test_author_bad_orcid_and_unknown_field() {
        let ctx = ValidationContext::default();
        let mut cx = Validator::new(&ctx);
        let raw: YamlValue = serde_yaml::from_str("{name: Jane, orcid: 0000-0002-1825-0098, nickname: jd}").unwrap();
        let author = Author::validate(&raw, &mut cx);
        assert!(author.is_some());
        let (errors, _) = cx.into_diagnostics();
        let kinds: Vec<&str> = errors.iter().map(|e| e.kind.as_str()).collect();
        assert!(kinds.contains(&"value_error.extra"));
        assert!(kinds.contains(&"value_error.orcid"));
    }
}
