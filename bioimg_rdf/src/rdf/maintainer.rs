use std::fmt::Display;

use crate::validation::{Validate, Validator};
use crate::yaml::YamlValue;

use super::author::{Email, GithubUser, PersonName};
use super::bounded_string::BoundedString;
use super::orcid::Orcid;

/// Like an author, but the `github_user` is required.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Maintainer {
    pub github_user: GithubUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub name: Option<PersonName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub affiliation: Option<BoundedString<1, 1024>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub orcid: Option<Orcid>,
}

impl Display for Maintainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.github_user),
        }
    }
}

impl Validate for Maintainer {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["name", "affiliation", "email", "orcid", "github_user"]);
        let github_user = cx.required(map, "github_user");
        let name = cx.optional(map, "name");
        let affiliation = cx.optional(map, "affiliation");
        let email = cx.optional(map, "email");
        let orcid = cx.optional(map, "orcid");
        Some(Maintainer {
            github_user: github_user?,
            name,
            affiliation,
            email,
            orcid,
        })
    }
}
