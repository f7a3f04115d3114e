use std::fmt::Display;

use crate::rdf::model::tensor_id::AxisId;
use crate::rdf::non_empty_list::NonEmptyList;
use crate::validation::Validator;
use crate::yaml::{self, Mapping, YamlValue};

use super::ProcessingEpsilon;

/// Subtract mean and divide by variance, with statistics computed at runtime.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct Zmuv {
    /// The subset of axes to normalize jointly. Leave out the 'batch' axis to
    /// normalize samples independently.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub axes: Option<NonEmptyList<AxisId>>,
    #[serde(default)]
    pub eps: ProcessingEpsilon,
}

impl Zmuv {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(kwargs, &["axes", "eps"]);
        let axes = cx.optional(kwargs, "axes");
        let eps = cx.optional_or(kwargs, "eps", ProcessingEpsilon::default());
        Some(Self { axes, eps })
    }
}

impl Display for Zmuv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ZeroMeanUnitVariance(ε={})", self.eps)?;
        if let Some(axes) = &self.axes {
            write!(f, " along {axes}")?;
        }
        Ok(())
    }
}

/// Normalize with fixed, precomputed mean and variance.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct SimpleFixedZmuv {
    pub mean: f32,
    pub std: f32,
}

impl Display for SimpleFixedZmuv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FixedZmuv(mean: {}, std: {})", self.mean, self.std)
    }
}

/// Normalize with per-entry precomputed means and variances along `axis`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct FixedZmuvAlongAxis {
    pub axis: AxisId,
    pub mean: NonEmptyList<f32>,
    pub std: NonEmptyList<f32>,
}

impl Display for FixedZmuvAlongAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FixedZmuv along {}", self.axis)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum FixedZmuv {
    Simple(SimpleFixedZmuv),
    AlongAxis(FixedZmuvAlongAxis),
}

const MIN_STD: f32 = 1e-6;

impl FixedZmuv {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        match yaml::get(kwargs, "mean") {
            Some(YamlValue::Sequence(_)) => {
                cx.forbid_unknown(kwargs, &["axis", "mean", "std"]);
                let axis = cx.required(kwargs, "axis");
                let mean: Option<NonEmptyList<f32>> = cx.required(kwargs, "mean");
                let std: Option<NonEmptyList<f32>> = cx.required(kwargs, "std");
                let (mean, std) = (mean?, std?);
                if mean.len() != std.len() {
                    cx.error(
                        "value_error.zmuv",
                        format!("size of `mean` ({}) and `std` ({}) must match", mean.len(), std.len()),
                    );
                }
                if std.iter().any(|s| *s < MIN_STD) {
                    cx.with("std", |cx| {
                        cx.error("value_error.zmuv", format!("`std` entries must be >= {MIN_STD}"))
                    });
                }
                Some(Self::AlongAxis(FixedZmuvAlongAxis { axis: axis?, mean, std }))
            }
            _ => {
                cx.forbid_unknown(kwargs, &["mean", "std"]);
                let mean: Option<f32> = cx.required(kwargs, "mean");
                let std: Option<f32> = cx.required(kwargs, "std");
                let (mean, std) = (mean?, std?);
                if std < MIN_STD {
                    cx.with("std", |cx| {
                        cx.error("value_error.zmuv", format!("`std` must be >= {MIN_STD}"))
                    });
                }
                Some(Self::Simple(SimpleFixedZmuv { mean, std }))
            }
        }
    }
}

impl Display for FixedZmuv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple(step) => step.fmt(f),
            Self::AlongAxis(step) => step.fmt(f),
        }
    }
}
