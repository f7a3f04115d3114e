pub mod input;
pub mod output;

pub use input::{IndexInputAxis, InputAxis, SpaceInputAxis, TimeInputAxis};
pub use output::{
    IndexOutputAxis, OutputAxis, SpaceOutputAxis, SpaceOutputAxisVariant, SpaceOutputAxisWithHalo, TimeOutputAxis,
    TimeOutputAxisVariant, TimeOutputAxisWithHalo,
};

use std::fmt::Display;

use crate::rdf::bounded_string::BoundedString;
use crate::rdf::identifier::Identifier;
use crate::rdf::non_empty_list::NonEmptyList;
use crate::validation::{Validate, Validator};
use crate::yaml::{Mapping, YamlValue};

use super::axis_size::{DataDependentSize, ParameterizedSize, SizeReference};
use super::space_unit::SpaceUnit;
use super::tensor_id::AxisId;
use super::time_unit::TimeUnit;

pub type AxisDescription = BoundedString<0, 128>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum AxisType {
    #[strum(serialize = "batch")]
    Batch,
    #[strum(serialize = "channel")]
    Channel,
    #[strum(serialize = "index")]
    Index,
    #[strum(serialize = "time")]
    Time,
    #[strum(serialize = "space")]
    Space,
}

/// Physical scale of one pixel/frame along an axis; strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f32")]
pub struct AxisScale(f32);

impl AxisScale {
    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for AxisScale {
    fn default() -> Self {
        Self(1.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("Axis scale must be a positive number, found {found}")]
pub struct AxisScaleParsingError {
    found: f32,
}

impl TryFrom<f32> for AxisScale {
    type Error = AxisScaleParsingError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(AxisScaleParsingError { found: value })
        }
    }
}

impl Display for AxisScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Validate for AxisScale {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = f32::validate(value, cx)?;
        match Self::try_from(raw) {
            Ok(scale) => Some(scale),
            Err(err) => {
                cx.error("value_error.scale", err.to_string());
                None
            }
        }
    }
}

/// The unit carried by time and space axes; referenced axes must agree on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum AnyUnit {
    Space(SpaceUnit),
    Time(TimeUnit),
}

impl Display for AnyUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Space(unit) => unit.fmt(f),
            Self::Time(unit) => unit.fmt(f),
        }
    }
}

/// Halo cropped from both sides of an output axis; at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "usize")]
pub struct HaloSize(usize);

impl HaloSize {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Halo must be at least 1")]
pub struct ZeroHaloError;

impl TryFrom<usize> for HaloSize {
    type Error = ZeroHaloError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(ZeroHaloError)
        } else {
            Ok(Self(value))
        }
    }
}

impl Validate for HaloSize {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = usize::validate(value, cx)?;
        match Self::try_from(raw) {
            Ok(halo) => Some(halo),
            Err(err) => {
                cx.error("value_error.halo", err.to_string());
                None
            }
        }
    }
}

/// `size: 1` is the only legal literal on a batch axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct BatchSizeOne;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("A batch axis size may only be fixed to 1, found {found}")]
pub struct BatchSizeError {
    found: usize,
}

impl TryFrom<usize> for BatchSizeOne {
    type Error = BatchSizeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        if value == 1 {
            Ok(Self)
        } else {
            Err(BatchSizeError { found: value })
        }
    }
}

impl From<BatchSizeOne> for usize {
    fn from(_: BatchSizeOne) -> Self {
        1
    }
}

impl Validate for BatchSizeOne {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = usize::validate(value, cx)?;
        match Self::try_from(raw) {
            Ok(one) => Some(one),
            Err(err) => {
                cx.error("value_error.axis_size", err.to_string());
                None
            }
        }
    }
}

/// A view of any axis' size expression, used by the constraint checks and the
/// shape computation.
#[derive(Clone, Copy, Debug)]
pub enum AxisSizeView<'a> {
    Batch { fixed_to_one: bool },
    Fixed(usize),
    Parameterized(&'a ParameterizedSize),
    Reference(&'a SizeReference),
    DataDependent(&'a DataDependentSize),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BatchAxis {
    #[serde(default = "default_batch_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub size: Option<BatchSizeOne>,
}

pub(crate) fn default_batch_axis_id() -> AxisId {
    AxisId::try_from("batch").expect("'batch' is a valid axis id")
}

pub(crate) fn default_channel_axis_id() -> AxisId {
    AxisId::try_from("channel").expect("'channel' is a valid axis id")
}

pub(crate) fn default_index_axis_id() -> AxisId {
    AxisId::try_from("index").expect("'index' is a valid axis id")
}

pub(crate) fn default_time_axis_id() -> AxisId {
    AxisId::try_from("time").expect("'time' is a valid axis id")
}

pub(crate) fn default_space_axis_id() -> AxisId {
    AxisId::try_from("x").expect("'x' is a valid axis id")
}

pub(crate) fn default_axis_description() -> AxisDescription {
    AxisDescription::try_from("").expect("the empty axis description is valid")
}

impl BatchAxis {
    pub(crate) fn validate_fields(map: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(map, &["type", "id", "description", "size"]);
        let id = cx.optional_or_else(map, "id", default_batch_axis_id);
        if !id.is_batch() {
            cx.with("id", |cx| {
                cx.error("value_error.identifier", "A batch axis must have the id 'batch'")
            });
        }
        let description = cx.optional_or_else(map, "description", default_axis_description);
        let size = cx.optional(map, "size");
        Some(Self { id, description, size })
    }
}

impl Display for BatchAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Batch: {}", self.id)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelAxis {
    #[serde(default = "default_channel_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    pub channel_names: NonEmptyList<Identifier>,
}

impl ChannelAxis {
    pub fn size(&self) -> usize {
        self.channel_names.len()
    }

    pub(crate) fn validate_fields(map: &Mapping, cx: &mut Validator) -> Option<Self> {
        cx.forbid_unknown(map, &["type", "id", "description", "channel_names"]);
        let id = cx.optional_or_else(map, "id", default_channel_axis_id);
        check_non_batch_id(&id, cx);
        let description = cx.optional_or_else(map, "description", default_axis_description);
        let channel_names = cx.required(map, "channel_names");
        Some(Self {
            id,
            description,
            channel_names: channel_names?,
        })
    }
}

impl Display for ChannelAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Channel: {} ({} channels)", self.id, self.size())
    }
}

pub(crate) fn check_non_batch_id(id: &AxisId, cx: &mut Validator) {
    if id.is_batch() {
        cx.with("id", |cx| {
            cx.error("value_error.identifier", "Only batch axes may use the id 'batch'")
        });
    }
}
