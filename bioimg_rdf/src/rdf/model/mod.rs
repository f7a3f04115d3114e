pub mod axes;
pub mod axis_size;
pub mod axis_sizes;
pub mod data_type;
pub mod input_tensor;
pub mod output_tensor;
pub mod processing;
pub mod run_mode;
pub mod space_unit;
pub mod tensor_data;
pub mod tensor_id;
pub mod time_unit;
pub mod weights;

pub use axes::{
    AnyUnit, AxisScale, AxisSizeView, AxisType, BatchAxis, ChannelAxis, HaloSize, IndexInputAxis, IndexOutputAxis,
    InputAxis, OutputAxis, SpaceInputAxis, SpaceOutputAxis, TimeInputAxis, TimeOutputAxis,
};
pub use axis_size::{
    AnyAxisSize, DataDependentSize, FixedAxisSize, ParameterizedSize, QualifiedAxisId, ResolvedAxisSize,
    SizeReference,
};
pub use axis_sizes::{AxisSizes, OutputSize, ShapeError};
pub use data_type::DataType;
pub use input_tensor::InputTensorDescr;
pub use output_tensor::OutputTensorDescr;
pub use processing::{PostprocessingDescr, PreprocessingDescr};
pub use run_mode::RunMode;
pub use space_unit::SpaceUnit;
pub use tensor_id::{AxisId, TensorId};
pub use time_unit::TimeUnit;
pub use weights::{WeightsDescr, WeightsFormat};

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

use crate::context::ArraySummary;
use crate::rdf::author::Author;
use crate::rdf::file_description::FileDescr;
use crate::rdf::generic::{DatasetDescr, GenericBase, NamePolicy, ENVELOPE_FIELDS};
use crate::rdf::identifier::ResourceId;
use crate::validation::{Severity, Validate, Validator};
use crate::yaml::{self, Mapping, YamlValue};
use crate::declare_type_marker;

declare_type_marker!(ModelTypeMarker, "model");

/// Reference to another bioimage.io model, e.g. the model this one was
/// fine-tuned from.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LinkedModel {
    pub id: ResourceId,
}

impl Validate for LinkedModel {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(map, &["id"]);
        let id = cx.required(map, "id");
        Some(Self { id: id? })
    }
}

/// Reference to a bioimage.io dataset.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LinkedDataset {
    pub id: ResourceId,
}

/// The dataset used to train a model, linked or described in place.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum TrainingDataDescr {
    Linked(LinkedDataset),
    Dataset(Box<DatasetDescr>),
}

impl Validate for TrainingDataDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        if yaml::get(map, "type").is_none() {
            cx.forbid_unknown(map, &["id"]);
            let id = cx.required(map, "id");
            return Some(Self::Linked(LinkedDataset { id: id? }));
        }
        DatasetDescr::validate_content(map, cx).map(|d| Self::Dataset(Box::new(d)))
    }
}

/// Numerical differences tolerated when reproducing the model's test outputs.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ReproducibilityTolerance {
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
    pub mismatched_elements_per_million: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_ids: Vec<TensorId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weights_formats: Vec<WeightsFormat>,
}

impl Validate for ReproducibilityTolerance {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        // extra keys are tolerated here, like everywhere under `config`
        let relative_tolerance: f64 = cx.optional_or(map, "relative_tolerance", 1e-3);
        if !(0.0..=0.01).contains(&relative_tolerance) {
            cx.with("relative_tolerance", |cx| {
                cx.error(
                    "value_error.float",
                    format!("relative_tolerance must be in [0, 0.01], found {relative_tolerance}"),
                )
            });
        }
        let absolute_tolerance: f64 = cx.optional_or(map, "absolute_tolerance", 1e-4);
        let mismatched_elements_per_million: u32 = cx.optional_or(map, "mismatched_elements_per_million", 100);
        let output_ids: Vec<TensorId> = cx.optional_or(map, "output_ids", Vec::new());
        let weights_formats: Vec<WeightsFormat> = cx.optional_or(map, "weights_formats", Vec::new());
        Some(Self {
            relative_tolerance,
            absolute_tolerance,
            mismatched_elements_per_million,
            output_ids,
            weights_formats,
        })
    }
}

/// A model resource description: metadata of a trained AI model with
/// pretrained weights, including its full input/output tensor contract.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ModelDescr {
    #[serde(rename = "type")]
    pub marker: ModelTypeMarker,
    #[serde(flatten)]
    pub base: GenericBase,
    pub inputs: crate::rdf::NonEmptyList<InputTensorDescr>,
    pub outputs: crate::rdf::NonEmptyList<OutputTensorDescr>,
    pub weights: WeightsDescr,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packaged_by: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<LinkedModel>,
    pub timestamp: iso8601_timestamp::Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_data: Option<TrainingDataDescr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_mode: Option<RunMode>,
    /// Typed view of `config.bioimageio.reproducibility_tolerance`; the raw
    /// mapping in the envelope stays authoritative for serialization.
    #[serde(skip)]
    pub reproducibility_tolerance: Vec<ReproducibilityTolerance>,
}

impl Display for ModelDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "model '{}'", self.base.name)
    }
}

const MODEL_FIELDS: &[&str] = &[
    "inputs",
    "outputs",
    "weights",
    "packaged_by",
    "parent",
    "timestamp",
    "training_data",
    "run_mode",
];

impl ModelDescr {
    pub fn validate_content(map: &Mapping, cx: &mut Validator) -> Option<Self> {
        let known: Vec<&str> = ENVELOPE_FIELDS.iter().chain(MODEL_FIELDS.iter()).copied().collect();
        cx.forbid_unknown(map, &known);
        if yaml::get(map, "badges").is_some() {
            cx.with("badges", |cx| {
                cx.error("value_error.extra", "Badges are not allowed for model descriptions")
            });
        }

        let base = GenericBase::validate_fields(map, cx, NamePolicy::Model);

        let inputs: Option<crate::rdf::NonEmptyList<InputTensorDescr>> = cx.required(map, "inputs");
        let outputs: Option<crate::rdf::NonEmptyList<OutputTensorDescr>> = cx.required(map, "outputs");
        let weights: Option<WeightsDescr> = cx.required(map, "weights");
        let packaged_by: Vec<Author> = cx.optional_or(map, "packaged_by", Vec::new());
        let parent: Option<LinkedModel> = cx.optional(map, "parent");
        let timestamp = cx
            .optional::<Timestamp>(map, "timestamp")
            .map(|t| t.0)
            .unwrap_or_else(iso8601_timestamp::Timestamp::now_utc);
        let training_data: Option<TrainingDataDescr> = cx.optional(map, "training_data");
        let run_mode: Option<RunMode> = cx.optional(map, "run_mode");
        if let Some(mode) = &run_mode {
            cx.with("run_mode", |cx| {
                cx.warn(
                    Severity::Warning,
                    format!("Run mode '{mode}' has limited support across consumer softwares."),
                );
            });
        }

        let reproducibility_tolerance = base
            .as_ref()
            .map(|b| Self::tolerance_from_config(&b.config, cx))
            .unwrap_or_default();

        // cross-tensor checks run on whatever parsed, independent of the
        // envelope outcome
        if let (Some(inputs), Some(outputs)) = (&inputs, &outputs) {
            check_duplicate_tensor_ids(inputs, outputs, cx);
            check_input_axes(inputs, cx);
            check_output_axes(inputs, outputs, cx);
            check_processing_references(inputs, outputs, cx);
            check_test_tensors(inputs, outputs, &reproducibility_tolerance, cx);
        }

        if let (Some(base), Some(parent)) = (&base, &parent) {
            if base.id.as_ref() == Some(&parent.id) {
                cx.with("parent", |cx| {
                    cx.error("value_error.parent", "A model description may not reference itself as parent")
                });
            }
        }

        if let Some(base) = &base {
            check_documentation_section(base, cx);
        }

        Some(Self {
            marker: ModelTypeMarker,
            base: base?,
            inputs: inputs?,
            outputs: outputs?,
            weights: weights?,
            packaged_by,
            parent,
            timestamp,
            training_data,
            run_mode,
            reproducibility_tolerance,
        })
    }

    fn tolerance_from_config(config: &Mapping, cx: &mut Validator) -> Vec<ReproducibilityTolerance> {
        let Some(YamlValue::Mapping(bioimageio)) = yaml::get(config, "bioimageio") else {
            return Vec::new();
        };
        let Some(raw) = yaml::get(bioimageio, "reproducibility_tolerance") else {
            return Vec::new();
        };
        cx.with("config", |cx| {
            cx.with("bioimageio", |cx| {
                cx.with("reproducibility_tolerance", |cx| {
                    Vec::<ReproducibilityTolerance>::validate(raw, cx).unwrap_or_default()
                })
            })
        })
    }
}

/// `timestamp` wrapper so the ISO 8601 parse plugs into the field helpers.
struct Timestamp(iso8601_timestamp::Timestamp);

impl Validate for Timestamp {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let raw = String::validate(value, cx)?;
        match iso8601_timestamp::Timestamp::parse(&raw) {
            Some(timestamp) => Some(Self(timestamp)),
            None => {
                cx.error("value_error.timestamp", format!("'{raw}' is not an ISO 8601 timestamp"));
                None
            }
        }
    }
}

fn check_duplicate_tensor_ids(
    inputs: &crate::rdf::NonEmptyList<InputTensorDescr>,
    outputs: &crate::rdf::NonEmptyList<OutputTensorDescr>,
    cx: &mut Validator,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    for id in inputs
        .iter()
        .map(|t| t.id.as_str())
        .chain(outputs.iter().map(|t| t.id.as_str()))
    {
        if !seen.insert(id) {
            duplicates.push(id.to_owned());
        }
    }
    if !duplicates.is_empty() {
        cx.with("outputs", |cx| {
            cx.error("value_error.tensor_ids", format!("Duplicate tensor ids: {}", duplicates.join(", ")))
        });
    }
}

/// What a `SizeReference` may legally point at: a non-batch axis with an
/// independent (fixed or parameterized) size.
struct IndependentAxis {
    axis_type: AxisType,
    unit: Option<AnyUnit>,
    scale: f32,
    size: ResolvedAxisSize,
}

fn independent_input_axes(
    inputs: &crate::rdf::NonEmptyList<InputTensorDescr>,
) -> BTreeMap<QualifiedAxisId, IndependentAxis> {
    let mut refs = BTreeMap::new();
    for tensor in inputs.iter() {
        for axis in tensor.axes.iter() {
            let size = match axis.size_view() {
                AxisSizeView::Fixed(size) => {
                    ResolvedAxisSize::Fixed(FixedAxisSize::try_from(size).expect("validated sizes are positive"))
                }
                AxisSizeView::Parameterized(parameterized) => ResolvedAxisSize::Parameterized(*parameterized),
                _ => continue,
            };
            let _ = refs.insert(
                QualifiedAxisId {
                    tensor_id: tensor.id.clone(),
                    axis_id: axis.id().clone(),
                },
                IndependentAxis {
                    axis_type: axis.axis_type(),
                    unit: axis.unit(),
                    scale: axis.scale(),
                    size,
                },
            );
        }
    }
    refs
}

fn independent_output_axes(
    outputs: &crate::rdf::NonEmptyList<OutputTensorDescr>,
) -> BTreeMap<QualifiedAxisId, IndependentAxis> {
    let mut refs = BTreeMap::new();
    for tensor in outputs.iter() {
        for axis in tensor.axes.iter() {
            let size = match axis.size_view() {
                AxisSizeView::Fixed(size) => {
                    ResolvedAxisSize::Fixed(FixedAxisSize::try_from(size).expect("validated sizes are positive"))
                }
                AxisSizeView::Parameterized(parameterized) => ResolvedAxisSize::Parameterized(*parameterized),
                _ => continue,
            };
            let _ = refs.insert(
                QualifiedAxisId {
                    tensor_id: tensor.id.clone(),
                    axis_id: axis.id().clone(),
                },
                IndependentAxis {
                    axis_type: axis.axis_type(),
                    unit: axis.unit(),
                    scale: axis.scale(),
                    size,
                },
            );
        }
    }
    refs
}

struct ReferencingAxis<'a> {
    tensor_id: &'a TensorId,
    axis_id: &'a AxisId,
    axis_type: AxisType,
    unit: Option<AnyUnit>,
    scale: f32,
    reference: &'a SizeReference,
    halo: Option<HaloSize>,
}

fn check_size_reference(
    field: &'static str,
    tensor_idx: usize,
    axis_idx: usize,
    axis: ReferencingAxis<'_>,
    valid_refs: &BTreeMap<QualifiedAxisId, IndependentAxis>,
    cx: &mut Validator,
) {
    let at_size = |cx: &mut Validator, body: &mut dyn FnMut(&mut Validator)| {
        cx.with(field, |cx| {
            cx.with(tensor_idx, |cx| {
                cx.with("axes", |cx| cx.with(axis_idx, |cx| cx.with("size", |cx| body(cx))))
            })
        })
    };

    let ref_id = axis.reference.qualified_axis_id();
    if ref_id.tensor_id == *axis.tensor_id && ref_id.axis_id == *axis.axis_id {
        at_size(cx, &mut |cx| {
            cx.error(
                "value_error.size_reference",
                format!("Self-referencing not allowed for {ref_id}"),
            )
        });
        return;
    }
    let Some(referenced) = valid_refs.get(&ref_id) else {
        at_size(cx, &mut |cx| {
            cx.error(
                "value_error.size_reference",
                format!("Invalid tensor axis reference '{ref_id}'"),
            )
        });
        return;
    };

    if matches!(axis.axis_type, AxisType::Channel) && !matches!(referenced.axis_type, AxisType::Channel) {
        at_size(cx, &mut |cx| {
            cx.error(
                "value_error.size_reference",
                "A channel axis' size may only reference another fixed size channel axis",
            )
        });
    }

    if axis.unit != referenced.unit {
        at_size(cx, &mut |cx| {
            cx.error(
                "value_error.size_reference",
                format!(
                    "The units of an axis and its reference axis need to match, but '{}' != '{}'",
                    display_unit(axis.unit),
                    display_unit(referenced.unit)
                ),
            )
        });
    }

    if let Some(halo) = axis.halo {
        let min_ref_size = referenced.size.min_size();
        let min_size = axis.reference.resolve(min_ref_size, referenced.scale, axis.scale);
        if min_size - 2 * (halo.get() as i64) < 1 {
            at_size(cx, &mut |cx| {
                cx.error(
                    "value_error.halo",
                    format!(
                        "axis {} with minimum size {min_size} is too small for halo {}",
                        axis.axis_id,
                        halo.get()
                    ),
                )
            });
        }
        // the total crop implied on the input side must be a whole, even
        // number of pixels (no half-pixel halos)
        let input_halo = 2.0 * halo.get() as f64 * axis.scale as f64 / referenced.scale as f64;
        if input_halo.fract() != 0.0 || (input_halo as i64) % 2 == 1 {
            at_size(cx, &mut |cx| {
                cx.error(
                    "value_error.halo",
                    format!(
                        "input_halo {input_halo} (2 * output_halo {} * output_scale {} / input_scale {}) must be an even integer",
                        halo.get(),
                        axis.scale,
                        referenced.scale
                    ),
                )
            });
        }
    }
}

fn display_unit(unit: Option<AnyUnit>) -> String {
    match unit {
        Some(unit) => unit.to_string(),
        None => "none".into(),
    }
}

fn check_input_axes(inputs: &crate::rdf::NonEmptyList<InputTensorDescr>, cx: &mut Validator) {
    let valid_refs = independent_input_axes(inputs);
    for (tensor_idx, tensor) in inputs.iter().enumerate() {
        for (axis_idx, axis) in tensor.axes.iter().enumerate() {
            let AxisSizeView::Reference(reference) = axis.size_view() else {
                continue;
            };
            check_size_reference(
                "inputs",
                tensor_idx,
                axis_idx,
                ReferencingAxis {
                    tensor_id: &tensor.id,
                    axis_id: axis.id(),
                    axis_type: axis.axis_type(),
                    unit: axis.unit(),
                    scale: axis.scale(),
                    reference,
                    halo: None,
                },
                &valid_refs,
                cx,
            );
        }
    }
}

fn check_output_axes(
    inputs: &crate::rdf::NonEmptyList<InputTensorDescr>,
    outputs: &crate::rdf::NonEmptyList<OutputTensorDescr>,
    cx: &mut Validator,
) {
    let mut valid_refs = independent_input_axes(inputs);
    valid_refs.extend(independent_output_axes(outputs));
    for (tensor_idx, tensor) in outputs.iter().enumerate() {
        for (axis_idx, axis) in tensor.axes.iter().enumerate() {
            let AxisSizeView::Reference(reference) = axis.size_view() else {
                continue;
            };
            check_size_reference(
                "outputs",
                tensor_idx,
                axis_idx,
                ReferencingAxis {
                    tensor_id: &tensor.id,
                    axis_id: axis.id(),
                    axis_type: axis.axis_type(),
                    unit: axis.unit(),
                    scale: axis.scale(),
                    reference,
                    halo: axis.halo(),
                },
                &valid_refs,
                cx,
            );
        }
    }
}

fn check_processing_references(
    inputs: &crate::rdf::NonEmptyList<InputTensorDescr>,
    outputs: &crate::rdf::NonEmptyList<OutputTensorDescr>,
    cx: &mut Validator,
) {
    let input_ids: HashSet<&str> = inputs.iter().map(|t| t.id.as_str()).collect();
    let output_ids: HashSet<&str> = outputs.iter().map(|t| t.id.as_str()).collect();

    for (tensor_idx, tensor) in inputs.iter().enumerate() {
        for (step_idx, step) in tensor.preprocessing.iter().enumerate() {
            let Some(reference) = step.reference_tensor() else {
                continue;
            };
            if !input_ids.contains(reference.as_str()) {
                cx.with("inputs", |cx| {
                    cx.with(tensor_idx, |cx| {
                        cx.with("preprocessing", |cx| {
                            cx.with(step_idx, |cx| {
                                cx.error(
                                    "value_error.reference_tensor",
                                    format!("`reference_tensor` '{reference}' is not an input tensor"),
                                )
                            })
                        })
                    })
                });
            }
        }
    }
    for (tensor_idx, tensor) in outputs.iter().enumerate() {
        for (step_idx, step) in tensor.postprocessing.iter().enumerate() {
            let Some(reference) = step.reference_tensor() else {
                continue;
            };
            if !input_ids.contains(reference.as_str()) && !output_ids.contains(reference.as_str()) {
                cx.with("outputs", |cx| {
                    cx.with(tensor_idx, |cx| {
                        cx.with("postprocessing", |cx| {
                            cx.with(step_idx, |cx| {
                                cx.error(
                                    "value_error.reference_tensor",
                                    format!("`reference_tensor` '{reference}' not found"),
                                )
                            })
                        })
                    })
                });
            }
        }
    }
}

/// The test-tensor contract: decoded arrays must match dtype, rank and every
/// independent axis extent, and carry meaningful values.
fn check_test_tensors(
    inputs: &crate::rdf::NonEmptyList<InputTensorDescr>,
    outputs: &crate::rdf::NonEmptyList<OutputTensorDescr>,
    tolerance: &[ReproducibilityTolerance],
    cx: &mut Validator,
) {
    if !cx.ctx.perform_io_checks {
        return;
    }
    let Some(checker) = cx.ctx.source_checker.clone() else {
        return;
    };

    let mut arrays: BTreeMap<TensorId, ArraySummary> = BTreeMap::new();

    let mut load = |descr: &Option<FileDescr>, field: &'static str, idx: usize, cx: &mut Validator| {
        let Some(descr) = descr else { return None };
        match checker.read_array(cx.ctx, &descr.source) {
            Ok(summary) => Some(summary),
            Err(err) => {
                cx.with(field, |cx| {
                    cx.with(idx, |cx| cx.with("test_tensor", |cx| cx.io_error(err.to_string())))
                });
                None
            }
        }
    };

    for (idx, tensor) in inputs.iter().enumerate() {
        if let Some(summary) = load(&tensor.test_tensor, "inputs", idx, cx) {
            let _ = arrays.insert(tensor.id.clone(), summary);
        }
    }
    for (idx, tensor) in outputs.iter().enumerate() {
        if let Some(summary) = load(&tensor.test_tensor, "outputs", idx, cx) {
            let _ = arrays.insert(tensor.id.clone(), summary);
        }
    }

    // position and scale of every axis, to resolve reference expectations
    // against the actual extents of the referenced test tensor
    let mut axis_dims: BTreeMap<QualifiedAxisId, (f32, usize)> = BTreeMap::new();
    for tensor in inputs.iter() {
        for (pos, axis) in tensor.axes.iter().enumerate() {
            let _ = axis_dims.insert(
                QualifiedAxisId {
                    tensor_id: tensor.id.clone(),
                    axis_id: axis.id().clone(),
                },
                (axis.scale(), pos),
            );
        }
    }
    for tensor in outputs.iter() {
        for (pos, axis) in tensor.axes.iter().enumerate() {
            let _ = axis_dims.insert(
                QualifiedAxisId {
                    tensor_id: tensor.id.clone(),
                    axis_id: axis.id().clone(),
                },
                (axis.scale(), pos),
            );
        }
    }

    let mut check_one = |field: &'static str,
                         idx: usize,
                         tensor_id: &TensorId,
                         dtype: DataType,
                         axes: Vec<(&AxisId, AxisSizeView<'_>, f32)>,
                         cx: &mut Validator| {
        let Some(summary) = arrays.get(tensor_id) else {
            return;
        };
        let mut local = |cx: &mut Validator, kind: &str, msg: String| {
            cx.with(field, |cx| {
                cx.with(idx, |cx| cx.with("test_tensor", |cx| cx.error(kind.to_owned(), msg)))
            });
        };

        let dtype_ok = if dtype.is_float() {
            summary.dtype != "bool"
        } else {
            summary.dtype == dtype.to_string()
        };
        if !dtype_ok {
            local(
                cx,
                "value_error.test_tensor",
                format!("test tensor dtype '{}' does not match described dtype '{dtype}'", summary.dtype),
            );
        }

        if summary.min > -1e-4 && summary.max < 1e-4 {
            local(
                cx,
                "value_error.test_tensor",
                "Test tensor values are too small for reliable testing. Values <=-1e-4 or >=1e-4 must be present"
                    .to_owned(),
            );
        }

        if summary.shape.len() != axes.len() {
            local(
                cx,
                "value_error.test_tensor",
                format!(
                    "Dimension mismatch: array shape {:?} incompatible with {} axes",
                    summary.shape,
                    axes.len()
                ),
            );
            return;
        }

        for (dim, (axis_id, view, axis_scale)) in summary.shape.iter().zip(axes.into_iter()) {
            let problem = match view {
                AxisSizeView::Batch { fixed_to_one } => (fixed_to_one && *dim != 1)
                    .then(|| format!("axis '{axis_id}' is fixed to batch size 1, found {dim}")),
                AxisSizeView::Fixed(size) => {
                    (*dim != size).then(|| format!("axis '{axis_id}' has incompatible size {dim}, expected {size}"))
                }
                AxisSizeView::Parameterized(parameterized) => parameterized
                    .validate_size(*dim)
                    .err()
                    .map(|e| format!("axis '{axis_id}': {e}")),
                AxisSizeView::DataDependent(size) => {
                    size.validate_size(*dim).err().map(|e| format!("axis '{axis_id}': {e}"))
                }
                AxisSizeView::Reference(reference) => {
                    let ref_qual = reference.qualified_axis_id();
                    match (arrays.get(&ref_qual.tensor_id), axis_dims.get(&ref_qual)) {
                        (Some(ref_summary), Some((ref_scale, ref_pos))) if *ref_pos < ref_summary.shape.len() => {
                            let ref_size = ref_summary.shape[*ref_pos];
                            let expected = reference.resolve(ref_size, *ref_scale, axis_scale);
                            (*dim as i64 != expected).then(|| {
                                format!(
                                    "axis '{axis_id}' of size {dim} invalid for referenced size {ref_size}; expected {expected}"
                                )
                            })
                        }
                        _ => None,
                    }
                }
            };
            if let Some(msg) = problem {
                local(cx, "value_error.test_tensor", msg);
            }
        }
    };

    for (idx, tensor) in inputs.iter().enumerate() {
        let axes: Vec<_> = tensor.axes.iter().map(|a| (a.id(), a.size_view(), a.scale())).collect();
        check_one("inputs", idx, &tensor.id, tensor.data.data_type(), axes, cx);
    }
    for (idx, tensor) in outputs.iter().enumerate() {
        let axes: Vec<_> = tensor.axes.iter().map(|a| (a.id(), a.size_view(), a.scale())).collect();
        check_one("outputs", idx, &tensor.id, tensor.data.data_type(), axes, cx);
    }

    // reproducibility tolerances must stay below 1% of the maximum test value
    for tol in tolerance.iter() {
        if tol.absolute_tolerance == 0.0 {
            continue;
        }
        for (idx, tensor) in outputs.iter().enumerate() {
            if !tol.output_ids.is_empty() && !tol.output_ids.contains(&tensor.id) {
                continue;
            }
            let Some(summary) = arrays.get(&tensor.id) else {
                continue;
            };
            if tol.absolute_tolerance > summary.max * 0.01 {
                cx.with("outputs", |cx| {
                    cx.with(idx, |cx| {
                        cx.error(
                            "value_error.reproducibility_tolerance",
                            format!(
                                "absolute_tolerance={} > 0.01*{} (1% of the maximum value of the test tensor '{}')",
                                tol.absolute_tolerance, summary.max, tensor.id
                            ),
                        )
                    })
                });
            }
        }
    }
}

fn check_documentation_section(base: &GenericBase, cx: &mut Validator) {
    if !cx.ctx.perform_io_checks {
        return;
    }
    let Some(doc) = &base.documentation else {
        return;
    };
    let Some(checker) = cx.ctx.source_checker.clone() else {
        return;
    };
    match checker.read_text(cx.ctx, &doc.source) {
        Ok(content) => {
            let has_section = regex::Regex::new("#.*[vV]alidation")
                .map(|re| re.is_match(&content))
                .unwrap_or(false);
            if !has_section {
                cx.with("documentation", |cx| {
                    cx.warn(
                        Severity::Warning,
                        format!("No '# Validation' (sub)section found in {}", doc.source),
                    );
                });
            }
        }
        Err(err) => {
            cx.with("documentation", |cx| cx.io_error(err.to_string()));
        }
    }
}
