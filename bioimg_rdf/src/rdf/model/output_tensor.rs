use std::fmt::Display;

use crate::rdf::file_description::FileDescr;
use crate::rdf::file_reference::check_suffix;
use crate::rdf::non_empty_list::NonEmptyList;
use crate::validation::{Validate, Validator};
use crate::yaml::YamlValue;

use super::axes::OutputAxis;
use super::input_tensor::{check_kwargs_axes, check_tensor_axes, TensorTextDescription};
use super::processing::PostprocessingDescr;
use super::tensor_data::SingleOrPerChannelData;
use super::tensor_id::TensorId;

#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub struct OutputTensorDescr {
    pub id: TensorId,
    #[serde(skip_serializing_if = "crate::rdf::BoundedString::is_empty")]
    pub description: TensorTextDescription,
    pub axes: NonEmptyList<OutputAxis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_tensor: Option<FileDescr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_tensor: Option<FileDescr>,
    pub data: SingleOrPerChannelData,
    pub postprocessing: Vec<PostprocessingDescr>,
}

impl OutputTensorDescr {
    pub fn axis_ids(&self) -> Vec<&super::tensor_id::AxisId> {
        self.axes.iter().map(|a| a.id()).collect()
    }
}

impl Display for OutputTensorDescr {
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

impl Validate for OutputTensorDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(
            map,
            &["id", "description", "axes", "test_tensor", "sample_tensor", "data", "postprocessing"],
        );
        let id: Option<TensorId> = cx.optional(map, "id").or_else(|| TensorId::try_from("output").ok());
        let description = cx.optional_or_else(map, "description", || {
            TensorTextDescription::try_from("").expect("the empty description is valid")
        });
        let axes: Option<NonEmptyList<OutputAxis>> = cx.required(map, "axes");
        let test_tensor: Option<FileDescr> = cx.optional(map, "test_tensor");
        if let Some(test) = &test_tensor {
            cx.with("test_tensor", |cx| check_suffix(cx, &test.source, &[".npy"], true));
        }
        let sample_tensor: Option<FileDescr> = cx.optional(map, "sample_tensor");
        let data = cx.optional_or_else(map, "data", SingleOrPerChannelData::default);
        let mut postprocessing: Vec<PostprocessingDescr> = cx.optional_or(map, "postprocessing", Vec::new());

        let axes = axes?;
        let channel_size = axes.iter().find_map(|a| match a {
            OutputAxis::Channel(channel) => Some(channel.size()),
            _ => None,
        });
        check_tensor_axes(
            axes.iter().map(|a| (a.axis_type(), a.id())),
            &data,
            channel_size,
            cx,
        );

        let axis_ids: Vec<_> = axes.iter().map(|a| a.id()).collect();
        cx.with("postprocessing", |cx| {
            for (idx, step) in postprocessing.iter().enumerate() {
                cx.with(idx, |cx| check_kwargs_axes(&step.referenced_axes(), &axis_ids, cx));
            }
        });

        // the tensor leaves the chain in its declared dtype
        let dtype = data.data_type();
        if !matches!(
            postprocessing.last(),
            Some(PostprocessingDescr::EnsureDtype(_)) | Some(PostprocessingDescr::Binarize(_))
        ) {
            postprocessing.push(PostprocessingDescr::ensure_dtype(dtype));
        }

        Some(Self {
            id: id?,
            description,
            axes,
            test_tensor,
            sample_tensor,
            data,
            postprocessing,
        })
    }
}
