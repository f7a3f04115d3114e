use std::fmt::Display;

use crate::rdf::model::tensor_id::AxisId;
use crate::rdf::non_empty_list::NonEmptyList;
use crate::validation::{Validate, Validator};
use crate::yaml::{self, Mapping, YamlValue};

/// Fixed linear scaling `out = tensor * gain + offset` with scalar terms.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct SimpleScaleLinearDescr {
    pub gain: f32,
    pub offset: f32,
}

impl Display for SimpleScaleLinearDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScaleLinear (gain: {}, offset: {})", self.gain, self.offset)
    }
}

/// Scalar or per-entry gains/offsets along one axis.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SingleOrPerEntry {
    Single(f32),
    PerEntry(NonEmptyList<f32>),
}

impl SingleOrPerEntry {
    pub fn all_equal(&self, target: f32) -> bool {
        match self {
            Self::Single(value) => *value == target,
            Self::PerEntry(values) => values.iter().all(|v| *v == target),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::PerEntry(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Validate for SingleOrPerEntry {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Sequence(_) => NonEmptyList::validate(value, cx).map(Self::PerEntry),
            _ => f32::validate(value, cx).map(Self::Single),
        }
    }
}

/// Linear scaling with per-entry gains/offsets along `axis`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ScaleLinearAlongAxisDescr {
    pub axis: AxisId,
    pub gain: SingleOrPerEntry,
    pub offset: SingleOrPerEntry,
}

impl Display for ScaleLinearAlongAxisDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScaleLinear along {}", self.axis)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ScaleLinearDescr {
    Simple(SimpleScaleLinearDescr),
    AlongAxis(ScaleLinearAlongAxisDescr),
}

impl ScaleLinearDescr {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        let descr = if yaml::get(kwargs, "axis").is_some() {
            cx.forbid_unknown(kwargs, &["axis", "gain", "offset"]);
            let axis = cx.required(kwargs, "axis");
            let gain = cx.optional_or(kwargs, "gain", SingleOrPerEntry::Single(1.0));
            let offset = cx.optional_or(kwargs, "offset", SingleOrPerEntry::Single(0.0));
            let redundant = gain.all_equal(1.0) && offset.all_equal(0.0);
            if redundant {
                cx.error(
                    "value_error.scale_linear",
                    "Redundant linear scaling not allowed. Set `gain` != 1.0 and/or `offset` != 0.0.",
                );
            }
            Self::AlongAxis(ScaleLinearAlongAxisDescr {
                axis: axis?,
                gain,
                offset,
            })
        } else {
            cx.forbid_unknown(kwargs, &["gain", "offset"]);
            let gain: f32 = cx.optional_or(kwargs, "gain", 1.0);
            let offset: f32 = cx.optional_or(kwargs, "offset", 0.0);
            if gain == 1.0 && offset == 0.0 {
                cx.error(
                    "value_error.scale_linear",
                    "Redundant linear scaling not allowed. Set `gain` != 1.0 and/or `offset` != 0.0.",
                );
            }
            Self::Simple(SimpleScaleLinearDescr { gain, offset })
        };
        Some(descr)
    }
}

impl Display for ScaleLinearDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple(step) => step.fmt(f),
            Self::AlongAxis(step) => step.fmt(f),
        }
    }
}
