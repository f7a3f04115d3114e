use std::fmt::Display;

use crate::validation::{Validate, Validator};
use crate::yaml::{Mapping, YamlValue};

/// Custom run mode for prediction procedures the specification cannot
/// express. No standard run modes are defined yet.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct RunMode {
    pub name: String,
    #[serde(skip_serializing_if = "Mapping::is_empty")]
    #[serde(default)]
    pub kwargs: Mapping,
}

impl Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Validate for RunMode {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["name", "kwargs"]);
        let name = cx.required(map, "name");
        let kwargs = cx.optional_or_else(map, "kwargs", Mapping::new);
        Some(Self { name: name?, kwargs })
    }
}
