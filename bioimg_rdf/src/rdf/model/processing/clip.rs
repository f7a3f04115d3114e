use std::fmt::Display;

use crate::validation::Validator;
use crate::yaml::Mapping;

/// Set tensor values below min to min and above max to max.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ClipDescr {
    pub min: f32,
    pub max: f32,
}

impl ClipDescr {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(kwargs, &["min", "max"]);
        let min: Option<f32> = cx.required(kwargs, "min");
        let max: Option<f32> = cx.required(kwargs, "max");
        let (min, max) = (min?, max?);
        if min.is_nan() || max.is_nan() {
            cx.error("value_error.clip", format!("Undefined float values not allowed: min: '{min}', max: '{max}'"));
            return None;
        }
        if min >= max {
            cx.error("value_error.clip", format!("Max '{max}' not greater than min '{min}'"));
            return None;
        }
        Some(Self { min, max })
    }
}

impl Display for ClipDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Clip [{}, {}]", self.min, self.max)
    }
}
