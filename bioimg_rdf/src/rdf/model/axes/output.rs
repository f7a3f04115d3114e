use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::validation::{Validate, Validator};
use crate::yaml::{self, Mapping, YamlValue};

use crate::rdf::model::axis_size::{IndexOutputAxisSize, OutputAxisSize, SizeReference};
use crate::rdf::model::space_unit::SpaceUnit;
use crate::rdf::model::tensor_id::AxisId;
use crate::rdf::model::time_unit::TimeUnit;

use super::{
    check_non_batch_id, default_axis_description, default_index_axis_id, default_space_axis_id,
    default_time_axis_id, AnyUnit, AxisDescription, AxisScale, AxisSizeView, AxisType, BatchAxis, ChannelAxis,
    HaloSize,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IndexOutputAxis {
    #[serde(default = "default_index_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    pub size: IndexOutputAxisSize,
}

impl Display for IndexOutputAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Index: {}", self.id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeOutputAxis {
    #[serde(default = "default_time_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub unit: Option<TimeUnit>,
    #[serde(default)]
    pub scale: AxisScale,
    pub size: OutputAxisSize,
}

/// A time output axis with a halo; its size must be a [`SizeReference`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeOutputAxisWithHalo {
    #[serde(default = "default_time_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub unit: Option<TimeUnit>,
    #[serde(default)]
    pub scale: AxisScale,
    pub halo: HaloSize,
    pub size: SizeReference,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpaceOutputAxis {
    #[serde(default = "default_space_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub unit: Option<SpaceUnit>,
    #[serde(default)]
    pub scale: AxisScale,
    pub size: OutputAxisSize,
}

/// A space output axis with a halo; its size must be a [`SizeReference`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SpaceOutputAxisWithHalo {
    #[serde(default = "default_space_axis_id")]
    pub id: AxisId,
    #[serde(default = "default_axis_description")]
    pub description: AxisDescription,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub unit: Option<SpaceUnit>,
    #[serde(default)]
    pub scale: AxisScale,
    pub halo: HaloSize,
    pub size: SizeReference,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum TimeOutputAxisVariant {
    Plain(TimeOutputAxis),
    WithHalo(TimeOutputAxisWithHalo),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SpaceOutputAxisVariant {
    Plain(SpaceOutputAxis),
    WithHalo(SpaceOutputAxisWithHalo),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum OutputAxis {
    #[serde(rename = "batch")]
    Batch(BatchAxis),
    #[serde(rename = "channel")]
    Channel(ChannelAxis),
    #[serde(rename = "index")]
    Index(IndexOutputAxis),
    #[serde(rename = "time")]
    Time(TimeOutputAxisVariant),
    #[serde(rename = "space")]
    Space(SpaceOutputAxisVariant),
}

impl Display for OutputAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch(axis) => axis.fmt(f),
            Self::Channel(axis) => axis.fmt(f),
            Self::Index(axis) => axis.fmt(f),
            Self::Time(TimeOutputAxisVariant::Plain(axis)) => write!(f, "Time: {}", axis.id),
            Self::Time(TimeOutputAxisVariant::WithHalo(axis)) => write!(f, "Time: {} (halo)", axis.id),
            Self::Space(SpaceOutputAxisVariant::Plain(axis)) => write!(f, "Space: {}", axis.id),
            Self::Space(SpaceOutputAxisVariant::WithHalo(axis)) => write!(f, "Space: {} (halo)", axis.id),
        }
    }
}

impl OutputAxis {
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
            Self::Time(TimeOutputAxisVariant::Plain(axis)) => &axis.id,
            Self::Time(TimeOutputAxisVariant::WithHalo(axis)) => &axis.id,
            Self::Space(SpaceOutputAxisVariant::Plain(axis)) => &axis.id,
            Self::Space(SpaceOutputAxisVariant::WithHalo(axis)) => &axis.id,
        }
    }

    pub fn unit(&self) -> Option<AnyUnit> {
        match self {
            Self::Time(TimeOutputAxisVariant::Plain(axis)) => axis.unit.map(AnyUnit::Time),
            Self::Time(TimeOutputAxisVariant::WithHalo(axis)) => axis.unit.map(AnyUnit::Time),
            Self::Space(SpaceOutputAxisVariant::Plain(axis)) => axis.unit.map(AnyUnit::Space),
            Self::Space(SpaceOutputAxisVariant::WithHalo(axis)) => axis.unit.map(AnyUnit::Space),
            _ => None,
        }
    }

    pub fn scale(&self) -> f32 {
        match self {
            Self::Time(TimeOutputAxisVariant::Plain(axis)) => axis.scale.get(),
            Self::Time(TimeOutputAxisVariant::WithHalo(axis)) => axis.scale.get(),
            Self::Space(SpaceOutputAxisVariant::Plain(axis)) => axis.scale.get(),
            Self::Space(SpaceOutputAxisVariant::WithHalo(axis)) => axis.scale.get(),
            _ => 1.0,
        }
    }

    pub fn halo(&self) -> Option<HaloSize> {
        match self {
            Self::Time(TimeOutputAxisVariant::WithHalo(axis)) => Some(axis.halo),
            Self::Space(SpaceOutputAxisVariant::WithHalo(axis)) => Some(axis.halo),
            _ => None,
        }
    }

    pub fn size_view(&self) -> AxisSizeView<'_> {
        match self {
            Self::Batch(axis) => AxisSizeView::Batch {
                fixed_to_one: axis.size.is_some(),
            },
            Self::Channel(axis) => AxisSizeView::Fixed(axis.size()),
            Self::Index(axis) => match &axis.size {
                IndexOutputAxisSize::Fixed(fixed) => AxisSizeView::Fixed(fixed.get()),
                IndexOutputAxisSize::Reference(reference) => AxisSizeView::Reference(reference),
                IndexOutputAxisSize::DataDependent(size) => AxisSizeView::DataDependent(size),
            },
            Self::Time(TimeOutputAxisVariant::Plain(axis)) => output_size_view(&axis.size),
            Self::Time(TimeOutputAxisVariant::WithHalo(axis)) => AxisSizeView::Reference(&axis.size),
            Self::Space(SpaceOutputAxisVariant::Plain(axis)) => output_size_view(&axis.size),
            Self::Space(SpaceOutputAxisVariant::WithHalo(axis)) => AxisSizeView::Reference(&axis.size),
        }
    }
}

fn output_size_view(size: &OutputAxisSize) -> AxisSizeView<'_> {
    match size {
        OutputAxisSize::Fixed(fixed) => AxisSizeView::Fixed(fixed.get()),
        OutputAxisSize::Reference(reference) => AxisSizeView::Reference(reference),
    }
}

struct CommonOutputFields {
    id: AxisId,
    description: AxisDescription,
    scale: AxisScale,
}

fn common_output_fields(map: &Mapping, cx: &mut Validator, default_id: fn() -> AxisId) -> CommonOutputFields {
    let id = cx.optional_or_else(map, "id", default_id);
    check_non_batch_id(&id, cx);
    let description = cx.optional_or_else(map, "description", default_axis_description);
    let scale = cx.optional_or(map, "scale", AxisScale::default());
    CommonOutputFields { id, description, scale }
}

impl Validate for OutputAxis {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        let Some(axis_type) = yaml::get_str(map, "type") else {
            cx.with("type", |cx| cx.error("missing", "Axis 'type' is required"));
            return None;
        };
        let with_halo = yaml::get(map, "halo").is_some();
        match axis_type {
            "batch" => BatchAxis::validate_fields(map, cx).map(Self::Batch),
            "channel" => ChannelAxis::validate_fields(map, cx).map(Self::Channel),
            "index" => {
                cx.forbid_unknown(map, &["type", "id", "description", "size"]);
                let id = cx.optional_or_else(map, "id", default_index_axis_id);
                check_non_batch_id(&id, cx);
                let description = cx.optional_or_else(map, "description", default_axis_description);
                let size = cx.required(map, "size");
                Some(Self::Index(IndexOutputAxis {
                    id,
                    description,
                    size: size?,
                }))
            }
            "time" if with_halo => {
                cx.forbid_unknown(map, &["type", "id", "description", "unit", "scale", "halo", "size"]);
                let common = common_output_fields(map, cx, default_time_axis_id);
                let unit = cx.optional(map, "unit");
                let halo = cx.required(map, "halo");
                let size = cx.required(map, "size");
                Some(Self::Time(TimeOutputAxisVariant::WithHalo(TimeOutputAxisWithHalo {
                    id: common.id,
                    description: common.description,
                    unit,
                    scale: common.scale,
                    halo: halo?,
                    size: size?,
                })))
            }
            "time" => {
                cx.forbid_unknown(map, &["type", "id", "description", "unit", "scale", "size"]);
                let common = common_output_fields(map, cx, default_time_axis_id);
                let unit = cx.optional(map, "unit");
                let size = cx.required(map, "size");
                Some(Self::Time(TimeOutputAxisVariant::Plain(TimeOutputAxis {
                    id: common.id,
                    description: common.description,
                    unit,
                    scale: common.scale,
                    size: size?,
                })))
            }
            "space" if with_halo => {
                cx.forbid_unknown(map, &["type", "id", "description", "unit", "scale", "halo", "size"]);
                let common = common_output_fields(map, cx, default_space_axis_id);
                let unit = cx.optional(map, "unit");
                let halo = cx.required(map, "halo");
                let size = cx.required(map, "size");
                Some(Self::Space(SpaceOutputAxisVariant::WithHalo(SpaceOutputAxisWithHalo {
                    id: common.id,
                    description: common.description,
                    unit,
                    scale: common.scale,
                    halo: halo?,
                    size: size?,
                })))
            }
            "space" => {
                cx.forbid_unknown(map, &["type", "id", "description", "unit", "scale", "size"]);
                let common = common_output_fields(map, cx, default_space_axis_id);
                let unit = cx.optional(map, "unit");
                let size = cx.required(map, "size");
                Some(Self::Space(SpaceOutputAxisVariant::Plain(SpaceOutputAxis {
                    id: common.id,
                    description: common.description,
                    unit,
                    scale: common.scale,
                    size: size?,
                })))
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
