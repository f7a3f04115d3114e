use std::fmt::Display;

use crate::rdf::model::tensor_id::{AxisId, TensorId};
use crate::rdf::non_empty_list::NonEmptyList;
use crate::validation::Validator;
use crate::yaml::Mapping;

use super::{ProcessingEpsilon, StatisticsMode};

/// Scale with percentiles:
/// `out = (tensor - v_lower) / (v_upper - v_lower + eps)`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ScaleRangeDescr {
    #[serde(default)]
    pub mode: StatisticsMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub axes: Option<NonEmptyList<AxisId>>,
    #[serde(default)]
    pub min_percentile: f32,
    #[serde(default = "default_max_percentile")]
    pub max_percentile: f32,
    #[serde(default)]
    pub eps: ProcessingEpsilon,
    /// Tensor ID to compute the percentiles from. Default: the tensor itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub reference_tensor: Option<TensorId>,
}

fn default_max_percentile() -> f32 {
    100.0
}

impl ScaleRangeDescr {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(
            kwargs,
            &["mode", "axes", "min_percentile", "max_percentile", "eps", "reference_tensor"],
        );
        let mode = cx.optional_or(kwargs, "mode", StatisticsMode::default());
        let axes = cx.optional(kwargs, "axes");
        let min_percentile: f32 = cx.optional_or(kwargs, "min_percentile", 0.0);
        let max_percentile: f32 = cx.optional_or(kwargs, "max_percentile", 100.0);
        let eps = cx.optional_or(kwargs, "eps", ProcessingEpsilon::default());
        let reference_tensor = cx.optional(kwargs, "reference_tensor");

        if !(0.0..100.0).contains(&min_percentile) {
            cx.with("min_percentile", |cx| {
                cx.error("value_error.percentile", format!("min_percentile must be in [0, 100), found {min_percentile}"))
            });
        }
        // the lower bound of 1 avoids percentiles mistakenly given in 0.0..1.0
        if !(max_percentile > 1.0 && max_percentile <= 100.0) {
            cx.with("max_percentile", |cx| {
                cx.error("value_error.percentile", format!("max_percentile must be in (1, 100], found {max_percentile}"))
            });
        }
        if min_percentile >= max_percentile {
            cx.error(
                "value_error.percentile",
                format!("min_percentile {min_percentile} >= max_percentile {max_percentile}"),
            );
        }

        Some(Self {
            mode,
            axes,
            min_percentile,
            max_percentile,
            eps,
            reference_tensor,
        })
    }
}

impl Display for ScaleRangeDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScaleRange [{}%, {}%]", self.min_percentile, self.max_percentile)?;
        if let Some(reference) = &self.reference_tensor {
            write!(f, " (ref: {reference})")?;
        }
        Ok(())
    }
}
