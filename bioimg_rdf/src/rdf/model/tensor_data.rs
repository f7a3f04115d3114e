use std::fmt::Display;

use crate::rdf::non_empty_list::NonEmptyList;
use crate::rdf::si_units::SiUnit;
use crate::validation::{Validate, Validator};
use crate::yaml::{self, YamlValue};

use super::data_type::DataType;

/// A data unit: either a proper SI term or the explicit "arbitrary unit".
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub enum DataUnit {
    ArbitraryUnit,
    Si(SiUnit),
}

impl TryFrom<String> for DataUnit {
    type Error = crate::rdf::si_units::SiUnitParsingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "arbitrary unit" {
            return Ok(Self::ArbitraryUnit);
        }
        Ok(Self::Si(SiUnit::try_from(value)?))
    }
}

impl From<DataUnit> for String {
    fn from(value: DataUnit) -> Self {
        match value {
            DataUnit::ArbitraryUnit => "arbitrary unit".into(),
            DataUnit::Si(unit) => unit.to_string(),
        }
    }
}

impl Display for DataUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArbitraryUnit => write!(f, "arbitrary unit"),
            Self::Si(unit) => unit.fmt(f),
        }
    }
}

impl_validate_from_string!(DataUnit, "value_error.si_unit");

/// The fixed set of nominal or ascending ordinal values of a tensor.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum TensorValues {
    Ints(NonEmptyList<i64>),
    Floats(NonEmptyList<f64>),
    Bools(NonEmptyList<bool>),
    Strings(NonEmptyList<String>),
}

impl TensorValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Ints(values) => values.len(),
            Self::Floats(values) => values.len(),
            Self::Bools(values) => values.len(),
            Self::Strings(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Validate for TensorValues {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Sequence(items) = value else {
            cx.type_error("list", value);
            return None;
        };
        let Some(first) = items.first() else {
            cx.error("value_error.min_length", "At least one value is required");
            return None;
        };
        match first {
            YamlValue::Bool(_) => NonEmptyList::validate(value, cx).map(Self::Bools),
            YamlValue::String(_) => NonEmptyList::validate(value, cx).map(Self::Strings),
            YamlValue::Number(n) if n.is_f64() => NonEmptyList::validate(value, cx).map(Self::Floats),
            YamlValue::Number(_) => {
                // an integer head may still be a float list further down
                if items.iter().any(|v| matches!(v, YamlValue::Number(n) if n.is_f64())) {
                    NonEmptyList::validate(value, cx).map(Self::Floats)
                } else {
                    NonEmptyList::validate(value, cx).map(Self::Ints)
                }
            }
            other => {
                cx.with(0usize, |cx| cx.type_error("scalar", other));
                None
            }
        }
    }
}

/// Data description by explicit values, e.g. class labels.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct NominalOrOrdinalDataDescr {
    pub values: TensorValues,
    #[serde(rename = "type")]
    pub data_type: DataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<DataUnit>,
}

impl NominalOrOrdinalDataDescr {
    fn validate_values_match_type(&self, cx: &mut Validator) {
        let (min, max) = self.data_type.limits();
        let incompatible = match &self.values {
            TensorValues::Bools(_) => self.data_type != DataType::Bool,
            TensorValues::Strings(_) => !self.data_type.is_uint(),
            TensorValues::Ints(values) => values.iter().any(|v| (*v as f64) < min || (*v as f64) > max),
            TensorValues::Floats(values) => {
                !self.data_type.is_float() || values.iter().any(|v| *v < min || *v > max)
            }
        };
        if incompatible {
            cx.with("values", |cx| {
                cx.error(
                    "value_error.data",
                    format!("data type '{}' incompatible with the given values", self.data_type),
                )
            });
        }
    }
}

/// Data description by dtype and allowed range.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct IntervalOrRatioDataDescr {
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub range: (Option<f64>, Option<f64>),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<DataUnit>,
    pub scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
}

impl Default for IntervalOrRatioDataDescr {
    fn default() -> Self {
        Self {
            data_type: DataType::Float32,
            range: (None, None),
            unit: Some(DataUnit::ArbitraryUnit),
            scale: 1.0,
            offset: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum TensorDataDescr {
    NominalOrOrdinal(NominalOrOrdinalDataDescr),
    IntervalOrRatio(IntervalOrRatioDataDescr),
}

impl TensorDataDescr {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::NominalOrOrdinal(descr) => descr.data_type,
            Self::IntervalOrRatio(descr) => descr.data_type,
        }
    }
}

impl Default for TensorDataDescr {
    fn default() -> Self {
        Self::IntervalOrRatio(IntervalOrRatioDataDescr::default())
    }
}

impl Validate for TensorDataDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        if yaml::get(map, "values").is_some() {
            cx.forbid_unknown(map, &["values", "type", "unit"]);
            let values: Option<TensorValues> = cx.required(map, "values");
            let data_type = cx.optional_or(map, "type", DataType::Uint8);
            let unit = cx.optional(map, "unit");
            let descr = NominalOrOrdinalDataDescr {
                values: values?,
                data_type,
                unit,
            };
            descr.validate_values_match_type(cx);
            return Some(Self::NominalOrOrdinal(descr));
        }

        cx.forbid_unknown(map, &["type", "range", "unit", "scale", "offset"]);
        let data_type = cx.optional_or(map, "type", DataType::Float32);
        let range = match yaml::get(map, "range") {
            None | Some(YamlValue::Null) => (None, None),
            Some(YamlValue::Sequence(bounds)) if bounds.len() == 2 => cx.with("range", |cx| {
                let low = match &bounds[0] {
                    YamlValue::Null => None,
                    v => cx.with(0usize, |cx| f64::validate(v, cx)),
                };
                let high = match &bounds[1] {
                    YamlValue::Null => None,
                    v => cx.with(1usize, |cx| f64::validate(v, cx)),
                };
                (low, high)
            }),
            Some(other) => {
                cx.with("range", |cx| {
                    cx.error("value_error.data", format!("Expected a [min, max] pair, found {}", yaml::kind_of(other)))
                });
                (None, None)
            }
        };
        if let (Some(low), Some(high)) = range {
            if low >= high {
                cx.with("range", |cx| {
                    cx.error("value_error.data", format!("Expected range minimum < maximum, got [{low}, {high}]"))
                });
            }
        }
        let unit = cx
            .optional(map, "unit")
            .or(Some(DataUnit::ArbitraryUnit));
        let scale = cx.optional_or(map, "scale", 1.0);
        let offset = cx.optional(map, "offset");
        Some(Self::IntervalOrRatio(IntervalOrRatioDataDescr {
            data_type,
            range,
            unit,
            scale,
            offset,
        }))
    }
}

/// A tensor's data description: one for the whole tensor or one per channel
/// (sharing a single data `type`).
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum SingleOrPerChannelData {
    Single(TensorDataDescr),
    PerChannel(NonEmptyList<TensorDataDescr>),
}

impl SingleOrPerChannelData {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Single(descr) => descr.data_type(),
            Self::PerChannel(descrs) => descrs.first().data_type(),
        }
    }

    pub fn channel_count(&self) -> Option<usize> {
        match self {
            Self::Single(_) => None,
            Self::PerChannel(descrs) => Some(descrs.len()),
        }
    }
}

impl Default for SingleOrPerChannelData {
    fn default() -> Self {
        Self::Single(TensorDataDescr::default())
    }
}

impl Validate for SingleOrPerChannelData {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        match value {
            YamlValue::Sequence(_) => {
                let descrs: NonEmptyList<TensorDataDescr> = NonEmptyList::validate(value, cx)?;
                let first_type = descrs.first().data_type();
                if descrs.iter().any(|d| d.data_type() != first_type) {
                    cx.error(
                        "value_error.data",
                        "Tensor data descriptions per channel need to agree in their data `type`",
                    );
                }
                Some(Self::PerChannel(descrs))
            }
            _ => TensorDataDescr::validate(value, cx).map(Self::Single),
        }
    }
}
