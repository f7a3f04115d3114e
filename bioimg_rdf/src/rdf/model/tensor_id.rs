use std::fmt::Display;

use crate::validation::{Severity, Validate, Validator};
use crate::yaml::YamlValue;

use crate::rdf::identifier::LowerCaseIdentifier;

/// Identifies a tensor across all inputs and outputs of a model.
pub type TensorId = LowerCaseIdentifier<32>;

/// Identifies one axis within a tensor.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AxisId(LowerCaseIdentifier<16>);

impl AxisId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_batch(&self) -> bool {
        self.as_str() == "batch"
    }
}

impl TryFrom<String> for AxisId {
    type Error = crate::rdf::identifier::IdentifierParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self(LowerCaseIdentifier::try_from(value)?))
    }
}

impl TryFrom<&str> for AxisId {
    type Error = crate::rdf::identifier::IdentifierParsingError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_owned())
    }
}

impl From<AxisId> for String {
    fn from(value: AxisId) -> Self {
        value.0.into()
    }
}

impl Display for AxisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single-letter axis names of the 0.4 format are normalized with a warning.
fn normalize_axis_id(raw: &str) -> &str {
    match raw {
        "b" => "batch",
        "t" => "time",
        "i" => "index",
        "c" => "channel",
        other => other,
    }
}

impl Validate for AxisId {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = String::validate(value, cx)?;
        let normalized = normalize_axis_id(&raw);
        if normalized != raw {
            cx.warn(Severity::Info, format!("Normalized axis id from '{raw}' to '{normalized}'."));
        }
        match Self::try_from(normalized.to_owned()) {
            Ok(id) => Some(id),
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
    fn test_axis_id_bounds() {
        assert!(AxisId::try_from("x").is_ok());
        assert!(AxisId::try_from("channel").is_ok());
        assert!(AxisId::try_from("way_too_long_axis_id").is_err());
        assert!(AxisId::try_from("UPPER").is_err());
    }
}
