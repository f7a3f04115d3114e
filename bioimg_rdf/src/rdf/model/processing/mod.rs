pub mod binarize;
pub mod clip;
pub mod ensure_dtype;
pub mod scale_linear;
pub mod scale_mean_variance;
pub mod scale_range;
pub mod sigmoid;
pub mod softmax;
pub mod zero_mean_unit_variance;

pub use binarize::{BinarizeAlongAxisDescr, BinarizeDescr, SimpleBinarizeDescr};
pub use clip::ClipDescr;
pub use ensure_dtype::EnsureDtype;
pub use scale_linear::ScaleLinearDescr;
pub use scale_mean_variance::ScaleMeanVarianceDescr;
pub use scale_range::ScaleRangeDescr;
pub use sigmoid::Sigmoid;
pub use softmax::Softmax;
pub use zero_mean_unit_variance::{FixedZmuv, Zmuv};

use std::fmt::Display;

use crate::rdf::model::data_type::DataType;
use crate::rdf::model::tensor_id::{AxisId, TensorId};
use crate::validation::{Validate, Validator};
use crate::yaml::{self, Mapping, YamlValue};

/// Epsilon for numeric stability, in the open-closed interval `]0, 0.1]`.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(try_from = "f32")]
pub struct ProcessingEpsilon(f32);

impl ProcessingEpsilon {
    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for ProcessingEpsilon {
    fn default() -> Self {
        Self(1e-6)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Epsilon must be in the interval ]0, 0.1], found {found}")]
pub struct EpsilonParsingError {
    found: f32,
}

impl TryFrom<f32> for ProcessingEpsilon {
    type Error = EpsilonParsingError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if value > 0.0 && value <= 0.1 {
            Ok(Self(value))
        } else {
            Err(EpsilonParsingError { found: value })
        }
    }
}

impl Display for ProcessingEpsilon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Validate for ProcessingEpsilon {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = f32::validate(value, cx)?;
        match Self::try_from(raw) {
            Ok(eps) => Some(eps),
            Err(err) => {
                cx.error("value_error.eps", err.to_string());
                None
            }
        }
    }
}

/// Percentile computation scope of the statistics-based steps.
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatisticsMode {
    #[serde(rename = "per_dataset")]
    #[default]
    PerDataset,
    #[serde(rename = "per_sample")]
    PerSample,
}

impl Validate for StatisticsMode {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = String::validate(value, cx)?;
        match raw.as_str() {
            "per_dataset" => Some(Self::PerDataset),
            "per_sample" => Some(Self::PerSample),
            other => {
                cx.error(
                    "value_error.mode",
                    format!("Expected 'per_dataset' or 'per_sample', found '{other}'"),
                );
                None
            }
        }
    }
}

#[derive(serde::Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "id", content = "kwargs")]
pub enum PreprocessingDescr {
    #[serde(rename = "binarize")]
    Binarize(BinarizeDescr),
    #[serde(rename = "clip")]
    Clip(ClipDescr),
    #[serde(rename = "ensure_dtype")]
    EnsureDtype(EnsureDtype),
    #[serde(rename = "fixed_zero_mean_unit_variance")]
    FixedZeroMeanUnitVariance(FixedZmuv),
    #[serde(rename = "scale_linear")]
    ScaleLinear(ScaleLinearDescr),
    #[serde(rename = "scale_range")]
    ScaleRange(ScaleRangeDescr),
    #[serde(rename = "sigmoid")]
    Sigmoid(Sigmoid),
    #[serde(rename = "softmax")]
    Softmax(Softmax),
    #[serde(rename = "zero_mean_unit_variance")]
    ZeroMeanUnitVariance(Zmuv),
}

#[derive(serde::Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "id", content = "kwargs")]
pub enum PostprocessingDescr {
    #[serde(rename = "binarize")]
    Binarize(BinarizeDescr),
    #[serde(rename = "clip")]
    Clip(ClipDescr),
    #[serde(rename = "ensure_dtype")]
    EnsureDtype(EnsureDtype),
    #[serde(rename = "fixed_zero_mean_unit_variance")]
    FixedZeroMeanUnitVariance(FixedZmuv),
    #[serde(rename = "scale_linear")]
    ScaleLinear(ScaleLinearDescr),
    #[serde(rename = "scale_mean_variance")]
    ScaleMeanVariance(ScaleMeanVarianceDescr),
    #[serde(rename = "scale_range")]
    ScaleRange(ScaleRangeDescr),
    #[serde(rename = "sigmoid")]
    Sigmoid(Sigmoid),
    #[serde(rename = "softmax")]
    Softmax(Softmax),
    #[serde(rename = "zero_mean_unit_variance")]
    ZeroMeanUnitVariance(Zmuv),
}

fn kwargs_of(map: &Mapping, cx: &mut Validator) -> Mapping {
    match yaml::get(map, "kwargs") {
        None | Some(YamlValue::Null) => Mapping::new(),
        Some(YamlValue::Mapping(kwargs)) => kwargs.clone(),
        Some(other) => {
            cx.with("kwargs", |cx| cx.type_error("map", other));
            Mapping::new()
        }
    }
}

macro_rules! validate_step {
    ($map:expr, $cx:expr, $id:expr, input) => {
        validate_step!(@impl $map, $cx, $id, PreprocessingDescr, {
            "binarize" => Binarize: BinarizeDescr,
            "clip" => Clip: ClipDescr,
            "ensure_dtype" => EnsureDtype: EnsureDtype,
            "fixed_zero_mean_unit_variance" => FixedZeroMeanUnitVariance: FixedZmuv,
            "scale_linear" => ScaleLinear: ScaleLinearDescr,
            "scale_range" => ScaleRange: ScaleRangeDescr,
            "sigmoid" => Sigmoid: Sigmoid,
            "softmax" => Softmax: Softmax,
            "zero_mean_unit_variance" => ZeroMeanUnitVariance: Zmuv,
        })
    };
    ($map:expr, $cx:expr, $id:expr, output) => {
        validate_step!(@impl $map, $cx, $id, PostprocessingDescr, {
            "binarize" => Binarize: BinarizeDescr,
            "clip" => Clip: ClipDescr,
            "ensure_dtype" => EnsureDtype: EnsureDtype,
            "fixed_zero_mean_unit_variance" => FixedZeroMeanUnitVariance: FixedZmuv,
            "scale_linear" => ScaleLinear: ScaleLinearDescr,
            "scale_mean_variance" => ScaleMeanVariance: ScaleMeanVarianceDescr,
            "scale_range" => ScaleRange: ScaleRangeDescr,
            "sigmoid" => Sigmoid: Sigmoid,
            "softmax" => Softmax: Softmax,
            "zero_mean_unit_variance" => ZeroMeanUnitVariance: Zmuv,
        })
    };
    (@impl $map:expr, $cx:expr, $id:expr, $out:ident, { $($name:literal => $variant:ident: $ty:ty,)* }) => {{
        let kwargs = kwargs_of($map, $cx);
        match $id {
            $($name => $cx.with("kwargs", |cx| <$ty>::validate_kwargs(&kwargs, cx)).map($out::$variant),)*
            other => {
                $cx.with("id", |cx| {
                    cx.error("value_error.processing", format!("Unknown processing step '{other}'"))
                });
                None
            }
        }
    }};
}

impl Validate for PreprocessingDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        let Some(id) = yaml::get_str(map, "id") else {
            cx.with("id", |cx| cx.error("missing", "Processing step 'id' is required"));
            return None;
        };
        validate_step!(map, cx, id, input)
    }
}

impl Validate for PostprocessingDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        let Some(id) = yaml::get_str(map, "id") else {
            cx.with("id", |cx| cx.error("missing", "Processing step 'id' is required"));
            return None;
        };
        validate_step!(map, cx, id, output)
    }
}

impl PreprocessingDescr {
    /// Axis ids the step's kwargs refer to; they must exist on the tensor.
    pub fn referenced_axes(&self) -> Vec<&AxisId> {
        match self {
            Self::Binarize(BinarizeDescr::AlongAxis(descr)) => vec![&descr.axis],
            Self::FixedZeroMeanUnitVariance(FixedZmuv::AlongAxis(descr)) => vec![&descr.axis],
            Self::ScaleLinear(ScaleLinearDescr::AlongAxis(descr)) => vec![&descr.axis],
            Self::ScaleRange(descr) => descr.axes.iter().flatten().collect(),
            Self::Softmax(descr) => vec![&descr.axis],
            Self::ZeroMeanUnitVariance(descr) => descr.axes.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }

    pub fn reference_tensor(&self) -> Option<&TensorId> {
        match self {
            Self::ScaleRange(descr) => descr.reference_tensor.as_ref(),
            _ => None,
        }
    }

    pub fn ensure_dtype(dtype: DataType) -> Self {
        Self::EnsureDtype(EnsureDtype { dtype })
    }
}

impl PostprocessingDescr {
    pub fn referenced_axes(&self) -> Vec<&AxisId> {
        match self {
            Self::Binarize(BinarizeDescr::AlongAxis(descr)) => vec![&descr.axis],
            Self::FixedZeroMeanUnitVariance(FixedZmuv::AlongAxis(descr)) => vec![&descr.axis],
            Self::ScaleLinear(ScaleLinearDescr::AlongAxis(descr)) => vec![&descr.axis],
            Self::ScaleMeanVariance(descr) => descr.axes.iter().flatten().collect(),
            Self::ScaleRange(descr) => descr.axes.iter().flatten().collect(),
            Self::Softmax(descr) => vec![&descr.axis],
            Self::ZeroMeanUnitVariance(descr) => descr.axes.iter().flatten().collect(),
            _ => Vec::new(),
        }
    }

    pub fn reference_tensor(&self) -> Option<&TensorId> {
        match self {
            Self::ScaleMeanVariance(descr) => Some(&descr.reference_tensor),
            Self::ScaleRange(descr) => descr.reference_tensor.as_ref(),
            _ => None,
        }
    }

    pub fn ensure_dtype(dtype: DataType) -> Self {
        Self::EnsureDtype(EnsureDtype { dtype })
    }
}

impl Display for PreprocessingDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binarize(step) => step.fmt(f),
            Self::Clip(step) => step.fmt(f),
            Self::EnsureDtype(step) => step.fmt(f),
            Self::FixedZeroMeanUnitVariance(step) => step.fmt(f),
            Self::ScaleLinear(step) => step.fmt(f),
            Self::ScaleRange(step) => step.fmt(f),
            Self::Sigmoid(step) => step.fmt(f),
            Self::Softmax(step) => step.fmt(f),
            Self::ZeroMeanUnitVariance(step) => step.fmt(f),
        }
    }
}

impl Display for PostprocessingDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binarize(step) => step.fmt(f),
            Self::Clip(step) => step.fmt(f),
            Self::EnsureDtype(step) => step.fmt(f),
            Self::FixedZeroMeanUnitVariance(step) => step.fmt(f),
            Self::ScaleLinear(step) => step.fmt(f),
            Self::ScaleMeanVariance(step) => step.fmt(f),
            Self::ScaleRange(step) => step.fmt(f),
            Self::Sigmoid(step) => step.fmt(f),
            Self::Softmax(step) => step.fmt(f),
            Self::ZeroMeanUnitVariance(step) => step.fmt(f),
        }
    }
}
