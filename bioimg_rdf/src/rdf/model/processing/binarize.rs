use std::fmt::Display;

use crate::rdf::model::tensor_id::AxisId;
use crate::rdf::non_empty_list::NonEmptyList;
use crate::validation::Validator;
use crate::yaml::{self, Mapping, YamlValue};

/// Binarize the tensor with a fixed threshold.
/// Values above the threshold will be set to one, values below to zero.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct SimpleBinarizeDescr {
    pub threshold: f32,
}

impl Display for SimpleBinarizeDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Binarize (threshold: {})", self.threshold)
    }
}

/// Binarize with per-entry thresholds along `axis`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct BinarizeAlongAxisDescr {
    pub threshold: NonEmptyList<f32>,
    pub axis: AxisId,
}

impl Display for BinarizeAlongAxisDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Binarize along {} ({} thresholds)", self.axis, self.threshold.len())
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum BinarizeDescr {
    Simple(SimpleBinarizeDescr),
    AlongAxis(BinarizeAlongAxisDescr),
}

impl BinarizeDescr {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        match yaml::get(kwargs, "threshold") {
            Some(YamlValue::Sequence(_)) => {
                cx.forbid_unknown(kwargs, &["threshold", "axis"]);
                let threshold = cx.required(kwargs, "threshold");
                let axis = cx.required(kwargs, "axis");
                Some(Self::AlongAxis(BinarizeAlongAxisDescr {
                    threshold: threshold?,
                    axis: axis?,
                }))
            }
            _ => {
                cx.forbid_unknown(kwargs, &["threshold"]);
                let threshold = cx.required(kwargs, "threshold");
                Some(Self::Simple(SimpleBinarizeDescr { threshold: threshold? }))
            }
        }
    }
}

impl Display for BinarizeDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple(step) => step.fmt(f),
            Self::AlongAxis(step) => step.fmt(f),
        }
    }
}
