use std::fmt::Display;

use crate::rdf::model::tensor_id::{AxisId, TensorId};
use crate::rdf::non_empty_list::NonEmptyList;
use crate::validation::Validator;
use crate::yaml::Mapping;

use super::{ProcessingEpsilon, StatisticsMode};

/// Scale a tensor's data distribution to match another tensor's mean/std:
/// `out = (tensor - mean) / (std + eps) * (ref_std + eps) + ref_mean`.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ScaleMeanVarianceDescr {
    #[serde(default)]
    pub mode: StatisticsMode,
    /// Name of tensor to match.
    pub reference_tensor: TensorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub axes: Option<NonEmptyList<AxisId>>,
    #[serde(default)]
    pub eps: ProcessingEpsilon,
}

impl ScaleMeanVarianceDescr {
    pub(crate) fn validate_kwargs(kwargs: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(kwargs, &["mode", "reference_tensor", "axes", "eps"]);
        let mode = cx.optional_or(kwargs, "mode", StatisticsMode::default());
        let reference_tensor = cx.required(kwargs, "reference_tensor");
        let axes = cx.optional(kwargs, "axes");
        let eps = cx.optional_or(kwargs, "eps", ProcessingEpsilon::default());
        Some(Self {
            mode,
            reference_tensor: reference_tensor?,
            axes,
            eps,
        })
    }
}

impl Display for ScaleMeanVarianceDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScaleMeanVariance(ε={}, ref='{}')", self.eps, self.reference_tensor)
    }
}
