use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::validation::{Validate, Validator};
use crate::yaml::{self, YamlValue};

use crate::rdf::model::axis_size::AnyAxisSize;
use crate::rdf::model::space_unit::SpaceUnit;
use crate::rdf::model::tensor_id::AxisId;
use crate::rdf::model::time_unit::TimeUnit;

use super::{
    check_non_batch_id, default_axis_description, default_index_axis_id, default_space_axis_id,
    default_time_axis_id, AnyUnit, AxisDescription, AxisScale, AxisSizeView, AxisType, BatchAxis, ChannelAxis,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexInputAxis {
    #[serde(default = "default_index_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    pub size: AnyAxisSize,
    /// If true, a longer sample axis may be split into blocks matching this
    /// axis' size description.
    #[serde(default)]
    pub concatenable: bool,
}

impl Display for IndexInputAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Index: {}", self.id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeInputAxis {
    #[serde(default = "default_time_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub unit: Option<TimeUnit>,
    #[serde(default)]
    pub scale: AxisScale,
    pub size: AnyAxisSize,
    #[serde(default)]
    pub concatenable: bool,
}

impl Display for TimeInputAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Time: {}", self.id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpaceInputAxis {
    #[serde(default = "default_space_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub unit: Option<SpaceUnit>,
    #[serde(default)]
    pub scale: AxisScale,
    pub size: AnyAxisSize,
    #[serde(default)]
    pub concatenable: bool,
}

impl Display for SpaceInputAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Space: {}", self.id)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum InputAxis {
    #[serde(rename = "batch")]
    Batch(BatchAxis),
    #[serde(rename = "channel")]
    Channel(ChannelAxis),
    #[serde(rename = "index")]
    Index(IndexInputAxis),
    #[serde(rename = "time")]
    Time(TimeInputAxis),
    #[serde(rename = "space")]
    Space(SpaceInputAxis),
}

impl Display for InputAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch(axis) => axis.fmt(f),
            Self::Channel(axis) => axis.fmt(f),
            Self::Index(axis) => axis.fmt(f),
            Self::Time(axis) => axis.fmt(f),
            Self::Space(axis) => axis.fmt(f),
        }
    }
}

impl InputAxis {
    pub fn axis_type(&self) -> AxisType {
        match self {
            Self::Batch(_) => AxisType::Batch,
            Self::Channel(_) => AxisType::Channel,
            Self::Index(_) => AxisType::Index,
            Self::Time(_) => AxisType::Time,
            Self::Space(_) => AxisType::Space,
        }
    }

    pub fn id(&self) -> &AxisId {
        match self {
            Self::Batch(axis) => &axis.id,
            Self::Channel(axis) => &axis.id,
            Self::Index(axis) => &axis.id,
            Self::Time(axis) => &axis.id,
            Self::Space(axis) => &axis.id,
        }
    }

    pub fn unit(&self) -> Option<AnyUnit> {
        match self {
            Self::Time(axis) => axis.unit.map(AnyUnit::Time),
            Self::Space(axis) => axis.unit.map(AnyUnit::Space),
            _ => None,
        }
    }

    pub fn scale(&self) -> f32 {
        match self {
            Self::Time(axis) => axis.scale.get(),
            Self::Space(axis) => axis.scale.get(),
            _ => 1.0,
        }
    }

    pub fn size_view(&self) -> AxisSizeView<'_> {
        match self {
            Self::Batch(axis) => AxisSizeView::Batch {
                fixed_to_one: axis.size.is_some(),
            },
            Self::Channel(axis) => AxisSizeView::Fixed(axis.size()),
            Self::Index(axis) => input_size_view(&axis.size),
            Self::Time(axis) => input_size_view(&axis.size),
            Self::Space(axis) => input_size_view(&axis.size),
        }
    }
}

fn input_size_view(size: &AnyAxisSize) -> AxisSizeView<'_> {
    match size {
        AnyAxisSize::Fixed(fixed) => AxisSizeView::Fixed(fixed.get()),
        AnyAxisSize::Parameterized(parameterized) => AxisSizeView::Parameterized(parameterized),
        AnyAxisSize::Reference(reference) => AxisSizeView::Reference(reference),
    }
}

impl Validate for InputAxis {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        let Some(axis_type) = yaml::get_str(map, "type") else {
            cx.with("type", |cx| cx.error("missing", "Axis 'type' is required"));
            return None;
        };
        match axis_type {
            "batch" => BatchAxis::validate_fields(map, cx).map(Self::Batch),
            "channel" => ChannelAxis::validate_fields(map, cx).map(Self::Channel),
            "index" => {
                cx.forbid_unknown(map, &["type", "id", "description", "size", "concatenable"]);
                let id = cx.optional_or_else(map, "id", default_index_axis_id);
                check_non_batch_id(&id, cx);
                let description = cx.optional_or_else(map, "description", default_axis_description);
                let size = cx.required(map, "size");
                let concatenable = cx.optional_or(map, "concatenable", false);
                Some(Self::Index(IndexInputAxis {
                    id,
                    description,
                    size: size?,
                    concatenable,
                }))
            }
            "time" => {
                cx.forbid_unknown(map, &["type", "id", "description", "unit", "scale", "size", "concatenable"]);
                let id = cx.optional_or_else(map, "id", default_time_axis_id);
                check_non_batch_id(&id, cx);
                let description = cx.optional_or_else(map, "description", default_axis_description);
                let unit = cx.optional(map, "unit");
                let scale = cx.optional_or(map, "scale", AxisScale::default());
                let size = cx.required(map, "size");
                let concatenable = cx.optional_or(map, "concatenable", false);
                Some(Self::Time(TimeInputAxis {
                    id,
                    description,
                    unit,
                    scale,
                    size: size?,
                    concatenable,
                }))
            }
            "space" => {
                cx.forbid_unknown(map, &["type", "id", "description", "unit", "scale", "size", "concatenable"]);
                let id = cx.optional_or_else(map, "id", default_space_axis_id);
                check_non_batch_id(&id, cx);
                let description = cx.optional_or_else(map, "description", default_axis_description);
                let unit = cx.optional(map, "unit");
                let scale = cx.optional_or(map, "scale", AxisScale::default());
                let size = cx.required(map, "size");
                let concatenable = cx.optional_or(map, "concatenable", false);
                Some(Self::Space(SpaceInputAxis {
                    id,
                    description,
                    unit,
                    scale,
                    size: size?,
                    concatenable,
                }))
            }
            other => {
                cx.with("type", |cx| {
                    cx.error("value_error.axis_type", format!("Unknown axis type '{other}'"))
                });
                None
            }
        }
    }
}
