use std::collections::HashSet;
use std::fmt::Display;

use crate::rdf::bounded_string::BoundedString;
use crate::rdf::file_description::FileDescr;
use crate::rdf::file_reference::check_suffix;
use crate::rdf::non_empty_list::NonEmptyList;
use crate::validation::{Validate, Validator};
use crate::yaml::YamlValue;

use super::axes::{AxisType, InputAxis};
use super::processing::PreprocessingDescr;
use super::tensor_data::SingleOrPerChannelData;
use super::tensor_id::TensorId;

pub type TensorTextDescription = BoundedString<0, 128>;

#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub struct InputTensorDescr {
    pub id: TensorId,
    #[serde(skip_serializing_if = "BoundedString::is_empty")]
    pub description: TensorTextDescription,
    pub axes: NonEmptyList<InputAxis>,
    /// indicates that this tensor may be omitted at inference time
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_tensor: Option<FileDescr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_tensor: Option<FileDescr>,
    pub data: SingleOrPerChannelData,
    pub preprocessing: Vec<PreprocessingDescr>,
}

impl InputTensorDescr {
    pub fn axis_ids(&self) -> Vec<&super::tensor_id::AxisId> {
        self.axes.iter().map(|a| a.id()).collect()
    }
}

impl Display for InputTensorDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}([", self.id)?;
        for (idx, axis) in self.axes.iter().enumerate() {
            if idx != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", axis.id())?;
        }
        write!(f, "])")
    }
}

/// Shared by input and output tensors: no duplicate axis ids, at most one
/// batch axis, per-channel data matching the channel axis extent.
pub(crate) fn check_tensor_axes<'a>(
    axes: impl Iterator<Item = (AxisType, &'a super::tensor_id::AxisId)> + Clone,
    data: &SingleOrPerChannelData,
    channel_size: Option<usize>,
    cx: &mut Validator,
) {
    let batch_count = axes.clone().filter(|(t, _)| matches!(t, AxisType::Batch)).count();
    if batch_count > 1 {
        cx.with("axes", |cx| {
            cx.error("value_error.axes", "Only one batch axis (per tensor) allowed")
        });
    }

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for (_, id) in axes {
        if !seen.insert(id.as_str()) {
            duplicates.push(id.as_str().to_owned());
        }
    }
    if !duplicates.is_empty() {
        cx.with("axes", |cx| {
            cx.error("value_error.axes", format!("Duplicate axis ids: {}", duplicates.join(", ")))
        });
    }

    if let (Some(per_channel), Some(channel_size)) = (data.channel_count(), channel_size) {
        if per_channel != channel_size {
            cx.with("data", |cx| {
                cx.error(
                    "value_error.data",
                    format!(
                        "Got tensor data descriptions for {per_channel} channels, but the channel axis has size {channel_size}"
                    ),
                )
            });
        }
    }
}

pub(crate) fn check_kwargs_axes<'a>(
    referenced: &[&super::tensor_id::AxisId],
    axis_ids: &[&'a super::tensor_id::AxisId],
    cx: &mut Validator,
) {
    for axis in referenced {
        if !axis_ids.iter().any(|known| known == axis) {
            cx.with("kwargs", |cx| {
                cx.with("axes", |cx| {
                    cx.error(
                        "value_error.axes",
                        format!("kwargs axis '{axis}' is not an axis of this tensor"),
                    )
                })
            });
        }
    }
}

impl Validate for InputTensorDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(
            map,
            &["id", "description", "axes", "optional", "test_tensor", "sample_tensor", "data", "preprocessing"],
        );
        let id: Option<TensorId> = cx.optional(map, "id").or_else(|| TensorId::try_from("input").ok());
        let description = cx.optional_or_else(map, "description", || {
            TensorTextDescription::try_from("").expect("the empty description is valid")
        });
        let axes: Option<NonEmptyList<InputAxis>> = cx.required(map, "axes");
        let optional = cx.optional_or(map, "optional", false);
        let test_tensor: Option<FileDescr> = cx.optional(map, "test_tensor");
        if let Some(test) = &test_tensor {
            cx.with("test_tensor", |cx| check_suffix(cx, &test.source, &[".npy"], true));
        }
        let sample_tensor: Option<FileDescr> = cx.optional(map, "sample_tensor");
        let data = cx.optional_or_else(map, "data", SingleOrPerChannelData::default);
        let mut preprocessing: Vec<PreprocessingDescr> = cx.optional_or(map, "preprocessing", Vec::new());

        let axes = axes?;
        let channel_size = axes.iter().find_map(|a| match a {
            InputAxis::Channel(channel) => Some(channel.size()),
            _ => None,
        });
        check_tensor_axes(
            axes.iter().map(|a| (a.axis_type(), a.id())),
            &data,
            channel_size,
            cx,
        );

        let axis_ids: Vec<_> = axes.iter().map(|a| a.id()).collect();
        cx.with("preprocessing", |cx| {
            for (idx, step) in preprocessing.iter().enumerate() {
                cx.with(idx, |cx| check_kwargs_axes(&step.referenced_axes(), &axis_ids, cx));
            }
        });

        // the tensor must enter and leave the chain in its declared dtype
        let dtype = data.data_type();
        if !matches!(preprocessing.first(), Some(PreprocessingDescr::EnsureDtype(_))) {
            preprocessing.insert(0, PreprocessingDescr::ensure_dtype(dtype));
        }
        if !matches!(
            preprocessing.last(),
            Some(PreprocessingDescr::EnsureDtype(_)) | Some(PreprocessingDescr::Binarize(_))
        ) {
            preprocessing.push(PreprocessingDescr::ensure_dtype(dtype));
        }

        Some(Self {
            id: id?,
            description,
            axes,
            optional,
            test_tensor,
            sample_tensor,
            data,
            preprocessing,
        })
    }
}
