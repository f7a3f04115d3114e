use std::fmt::Display;

use crate::validation::{Validate, Validator};
use crate::yaml::{self, YamlValue};

use super::tensor_id::{AxisId, TensorId};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Axis sizes must be greater than 0")]
pub struct ZeroAxisSizeError;

/// A fixed axis extent, always greater than zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "usize")]
pub struct FixedAxisSize(usize);

impl FixedAxisSize {
    pub fn get(self) -> usize {
        self.0
    }
}

impl TryFrom<usize> for FixedAxisSize {
    type Error = ZeroAxisSizeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(ZeroAxisSizeError)
        } else {
            Ok(Self(value))
        }
    }
}

impl From<FixedAxisSize> for usize {
    fn from(value: FixedAxisSize) -> Self {
        value.0
    }
}

impl Display for FixedAxisSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Validate for FixedAxisSize {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = usize::validate(value, cx)?;
        match Self::try_from(raw) {
            Ok(size) => Some(size),
            Err(err) => {
                cx.error("value_error.axis_size", err.to_string());
                None
            }
        }
    }
}

/// A range of valid axis extents: `size = min + n*step` for any `n >= 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ParameterizedSize {
    pub min: usize,
    pub step: usize,
}

impl ParameterizedSize {
    pub fn get_size(&self, n: usize) -> usize {
        self.min + n * self.step
    }

    /// Smallest `n` such that `get_size(n) >= s`.
    pub fn get_n(&self, s: usize) -> usize {
        if s <= self.min {
            0
        } else {
            (s - self.min).div_ceil(self.step)
        }
    }

    pub fn validate_size(&self, size: usize) -> Result<usize, String> {
        if size < self.min {
            return Err(format!("size {size} < {}", self.min));
        }
        if (size - self.min) % self.step != 0 {
            return Err(format!(
                "axis of size {size} is not parameterized by `min + n*step` = `{} + n*{}`",
                self.min, self.step
            ));
        }
        Ok(size)
    }
}

impl Display for ParameterizedSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} + n*{}", self.min, self.step)
    }
}

impl Validate for ParameterizedSize {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["min", "step"]);
        let min: Option<usize> = cx.required(map, "min");
        let step: Option<usize> = cx.required(map, "step");
        let (min, step) = (min?, step?);
        if min == 0 {
            cx.with("min", |cx| cx.error("value_error.axis_size", "min must be greater than 0"));
            return None;
        }
        if step == 0 {
            cx.with("step", |cx| cx.error("value_error.axis_size", "step must be greater than 0"));
            return None;
        }
        Some(Self { min, step })
    }
}

/// An output axis extent only known at inference time (outputs only).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DataDependentSize {
    pub min: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub max: Option<usize>,
}

impl DataDependentSize {
    pub fn validate_size(&self, size: usize) -> Result<usize, String> {
        if size < self.min {
            return Err(format!("size {size} < {}", self.min));
        }
        if let Some(max) = self.max {
            if size > max {
                return Err(format!("size {size} > {max}"));
            }
        }
        Ok(size)
    }
}

impl Display for DataDependentSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) => write!(f, "data dependent ({}..={max})", self.min),
            None => write!(f, "data dependent (>={})", self.min),
        }
    }
}

impl Validate for DataDependentSize {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["min", "max"]);
        let min: usize = cx.optional_or(map, "min", 1);
        let max: Option<usize> = cx.optional(map, "max");
        if min == 0 {
            cx.with("min", |cx| cx.error("value_error.axis_size", "min must be greater than 0"));
        }
        if let Some(max) = max {
            if min >= max {
                cx.error("value_error.axis_size", format!("expected `min` < `max`, but got {min}, {max}"));
            }
        }
        Some(Self { min, max })
    }
}

/// An axis size defined in terms of another tensor's axis:
/// `size = reference.size * reference.scale / axis.scale + offset`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SizeReference {
    pub tensor_id: TensorId,
    pub axis_id: AxisId,
    #[serde(default)]
    pub offset: i64,
}

impl SizeReference {
    pub fn qualified_axis_id(&self) -> QualifiedAxisId {
        QualifiedAxisId {
            tensor_id: self.tensor_id.clone(),
            axis_id: self.axis_id.clone(),
        }
    }

    /// Concrete size for `axis_scale` given the referenced axis' extent and
    /// scale. Fractions are rounded down.
    pub fn resolve(&self, ref_size: usize, ref_scale: f32, axis_scale: f32) -> i64 {
        (ref_size as f64 * ref_scale as f64 / axis_scale as f64) as i64 + self.offset
    }
}

impl Display for SizeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.offset == 0 {
            write!(f, "{}.{}", self.tensor_id, self.axis_id)
        } else {
            write!(f, "{}.{} {:+}", self.tensor_id, self.axis_id, self.offset)
        }
    }
}

impl Validate for SizeReference {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["tensor_id", "axis_id", "offset"]);
        let tensor_id: Option<TensorId> = cx.required(map, "tensor_id");
        let axis_id: Option<AxisId> = cx.required(map, "axis_id");
        let offset: i64 = cx.optional_or(map, "offset", 0);
        Some(Self {
            tensor_id: tensor_id?,
            axis_id: axis_id?,
            offset,
        })
    }
}

/// Any size expression valid for an input axis.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum AnyAxisSize {
    Fixed(FixedAxisSize),
    Parameterized(ParameterizedSize),
    Reference(SizeReference),
}

impl Display for AnyAxisSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(size) => size.fmt(f),
            Self::Parameterized(size) => size.fmt(f),
            Self::Reference(size) => size.fmt(f),
        }
    }
}

impl Validate for AnyAxisSize {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Number(_) => FixedAxisSize::validate(value, cx).map(Self::Fixed),
            YamlValue::Mapping(map) => {
                if yaml::get(map, "tensor_id").is_some() || yaml::get(map, "axis_id").is_some() {
                    SizeReference::validate(value, cx).map(Self::Reference)
                } else {
                    ParameterizedSize::validate(value, cx).map(Self::Parameterized)
                }
            }
            other => {
                cx.type_error("axis_size", other);
                None
            }
        }
    }
}

/// Size expression valid for time/space output axes without halo.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum OutputAxisSize {
    Fixed(FixedAxisSize),
    Reference(SizeReference),
}

impl Display for OutputAxisSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(size) => size.fmt(f),
            Self::Reference(size) => size.fmt(f),
        }
    }
}

impl Validate for OutputAxisSize {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Number(_) => FixedAxisSize::validate(value, cx).map(Self::Fixed),
            YamlValue::Mapping(_) => SizeReference::validate(value, cx).map(Self::Reference),
            other => {
                cx.type_error("axis_size", other);
                None
            }
        }
    }
}

/// Size expression valid for index output axes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum IndexOutputAxisSize {
    Fixed(FixedAxisSize),
    Reference(SizeReference),
    DataDependent(DataDependentSize),
}

impl Validate for IndexOutputAxisSize {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Number(_) => FixedAxisSize::validate(value, cx).map(Self::Fixed),
            YamlValue::Mapping(map) => {
                if yaml::get(map, "tensor_id").is_some() || yaml::get(map, "axis_id").is_some() {
                    SizeReference::validate(value, cx).map(Self::Reference)
                } else {
                    DataDependentSize::validate(value, cx).map(Self::DataDependent)
                }
            }
            other => {
                cx.type_error("axis_size", other);
                None
            }
        }
    }
}

/// A size that resolved to something concrete: either one extent or a
/// parameterized family of extents.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedAxisSize {
    Fixed(FixedAxisSize),
    Parameterized(ParameterizedSize),
}

impl ResolvedAxisSize {
    pub fn min_size(&self) -> usize {
        match self {
            Self::Fixed(size) => size.get(),
            Self::Parameterized(size) => size.min,
        }
    }

    pub fn is_compatible_with_extent(&self, extent: usize) -> bool {
        match self {
            Self::Fixed(fixed) => fixed.get() == extent,
            Self::Parameterized(size) => size.validate_size(extent).is_ok(),
        }
    }
}

impl From<FixedAxisSize> for ResolvedAxisSize {
    fn from(value: FixedAxisSize) -> Self {
        Self::Fixed(value)
    }
}

impl From<ParameterizedSize> for ResolvedAxisSize {
    fn from(value: ParameterizedSize) -> Self {
        Self::Parameterized(value)
    }
}

/// `(tensor_id, axis_id)`, the key of the axis constraint system.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct QualifiedAxisId {
    pub tensor_id: TensorId,
    pub axis_id: AxisId,
}

impl Display for QualifiedAxisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.tensor_id, self.axis_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parameterized_size_roundtrip() {
        let size = ParameterizedSize { min: 16, step: 8 };
        for n in 0..5 {
            let s = size.get_size(n);
            assert_eq!(s, 16 + n * 8);
            assert_eq!(size.get_n(s), n);
            assert!(size.validate_size(s).is_ok());
        }
        // get_n returns the smallest n with get_size(n) >= s
        assert_eq!(size.get_n(17), 1);
        assert_eq!(size.get_n(3), 0);
        assert!(size.validate_size(17).is_err());
        assert!(size.validate_size(8).is_err());
    }

    #[test]
    fn test_size_reference_resolution() {
        let reference = SizeReference {
            tensor_id: TensorId::try_from("input").unwrap(),
            axis_id: AxisId::try_from("w").unwrap(),
            offset: -1,
        };
        // h = w * w.scale / h.scale + offset = 100 * 2 / 4 - 1 = 49
        assert_eq!(reference.resolve(100, 2.0, 4.0), 49);
    }

    #[test]
    fn test_data_dependent_size() {
        let size = DataDependentSize { min: 2, max: Some(10) };
        assert!(size.validate_size(1).is_err());
        assert!(size.validate_size(2).is_ok());
        assert!(size.validate_size(11).is_err());
    }
}
