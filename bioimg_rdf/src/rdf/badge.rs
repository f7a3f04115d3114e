use std::fmt::Display;

use crate::validation::{Validate, Validator};
use crate::yaml::YamlValue;

use super::bounded_string::BoundedString;
use super::file_reference::{FileReference, HttpUrl};

/// A custom badge, e.g. "Open in Colab".
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Badge {
    pub label: BoundedString<1, 1024>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub icon: Option<FileReference>,
    pub url: HttpUrl,
}

impl Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.label, self.url)
    }
}

impl Validate for Badge {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["label", "icon", "url"]);
        let label = cx.required(map, "label");
        let icon = cx.optional(map, "icon");
        let url = cx.required(map, "url");
        Some(Badge {
            label: label?,
            icon,
            url: url?,
        })
    }
}
