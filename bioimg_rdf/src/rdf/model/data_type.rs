use serde::{Deserialize, Serialize};

#[derive(Default, Serialize, Deserialize, Eq, PartialEq, Debug, Copy, Clone)]
#[derive(strum::EnumString, strum::VariantArray, strum::VariantNames, strum::Display)]
pub enum DataType {
    #[serde(rename = "bool")]
    #[strum(serialize = "bool")]
    Bool,
    #[serde(rename = "float32")]
    #[strum(serialize = "float32")]
    #[default]
    Float32,
    #[serde(rename = "float64")]
    #[strum(serialize = "float64")]
    Float64,
    #[serde(rename = "uint8")]
    #[strum(serialize = "uint8")]
    Uint8,
    #[serde(rename = "uint16")]
    #[strum(serialize = "uint16")]
    Uint16,
    #[serde(rename = "uint32")]
    #[strum(serialize = "uint32")]
    Uint32,
    #[serde(rename = "uint64")]
    #[strum(serialize = "uint64")]
    Uint64,
    #[serde(rename = "int8")]
    #[strum(serialize = "int8")]
    Int8,
    #[serde(rename = "int16")]
    #[strum(serialize = "int16")]
    Int16,
    #[serde(rename = "int32")]
    #[strum(serialize = "int32")]
    Int32,
    #[serde(rename = "int64")]
    #[strum(serialize = "int64")]
    Int64,
}

impl DataType {
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_int(self) -> bool {
        !matches!(self, Self::Bool | Self::Float32 | Self::Float64)
    }

    pub fn is_uint(self) -> bool {
        matches!(self, Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64)
    }

    /// Value range representable by this dtype, for checking declared data values.
    pub fn limits(self) -> (f64, f64) {
        match self {
            Self::Bool => (0.0, 1.0),
            Self::Float32 => (f32::MIN as f64, f32::MAX as f64),
            Self::Float64 => (f64::MIN, f64::MAX),
            Self::Uint8 => (0.0, u8::MAX as f64),
            Self::Uint16 => (0.0, u16::MAX as f64),
            Self::Uint32 => (0.0, u32::MAX as f64),
            Self::Uint64 => (0.0, u64::MAX as f64),
            Self::Int8 => (i8::MIN as f64, i8::MAX as f64),
            Self::Int16 => (i16::MIN as f64, i16::MAX as f64),
            Self::Int32 => (i32::MIN as f64, i32::MAX as f64),
            Self::Int64 => (i64::MIN as f64, i64::MAX as f64),
        }
    }
}

impl crate::validation::Validate for DataType {
    fn validate(value: &crate::yaml::YamlValue, cx: &mut crate::validation::Validator) -> Option<Self> {
        use std::str::FromStr;
        let raw = <String as crate::validation::Validate>::validate(value, cx)?;
        match Self::from_str(&raw) {
            Ok(dtype) => Some(dtype),
            Err(_) => {
                cx.error("value_error.dtype", format!("'{raw}' is not a valid data type"));
                None
            }
        }
    }
}
