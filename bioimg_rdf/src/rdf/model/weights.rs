use std::fmt::Display;

use crate::rdf::author::Author;
use crate::rdf::file_description::{file_descr_from_fields, FileDescr};
use crate::rdf::file_reference::check_suffix;
use crate::rdf::identifier::Identifier;
use crate::rdf::version::Version;
use crate::validation::{Severity, Validate, Validator};
use crate::yaml::{self, Mapping, YamlValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[derive(strum::EnumString, strum::VariantArray, strum::Display)]
pub enum WeightsFormat {
    #[serde(rename = "keras_hdf5")]
    #[strum(serialize = "keras_hdf5")]
    KerasHdf5,
    #[serde(rename = "onnx")]
    #[strum(serialize = "onnx")]
    Onnx,
    #[serde(rename = "pytorch_state_dict")]
    #[strum(serialize = "pytorch_state_dict")]
    PytorchStateDict,
    #[serde(rename = "tensorflow_js")]
    #[strum(serialize = "tensorflow_js")]
    TensorflowJs,
    #[serde(rename = "tensorflow_saved_model_bundle")]
    #[strum(serialize = "tensorflow_saved_model_bundle")]
    TensorflowSavedModelBundle,
    #[serde(rename = "torchscript")]
    #[strum(serialize = "torchscript")]
    Torchscript,
}

impl Validate for WeightsFormat {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        use std::str::FromStr;
        let raw = String::validate(value, cx)?;
        match Self::from_str(&raw) {
            Ok(format) => Some(format),
            Err(_) => {
                cx.error("value_error.weights_format", format!("'{raw}' is not a known weights format"));
                None
            }
        }
    }
}

/// Callable defined in a packaged source file.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ArchitectureFromFileDescr {
    #[serde(flatten)]
    pub file: FileDescr,
    /// Identifier of the callable that returns a torch.nn.Module instance.
    pub callable: Identifier,
    #[serde(skip_serializing_if = "Mapping::is_empty")]
    pub kwargs: Mapping,
}

/// Callable importable from a dependency.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ArchitectureFromLibraryDescr {
    pub import_from: String,
    pub callable: Identifier,
    #[serde(skip_serializing_if = "Mapping::is_empty")]
    pub kwargs: Mapping,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ArchitectureDescr {
    FromFile(ArchitectureFromFileDescr),
    FromLibrary(ArchitectureFromLibraryDescr),
}

impl Display for ArchitectureDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FromFile(descr) => write!(f, "{}:{}", descr.file.source, descr.callable),
            Self::FromLibrary(descr) => write!(f, "{}.{}", descr.import_from, descr.callable),
        }
    }
}

impl Validate for ArchitectureDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        if yaml::get(map, "import_from").is_some() {
            cx.forbid_unknown(map, &["import_from", "callable", "kwargs"]);
            let import_from = cx.required(map, "import_from");
            let callable = cx.required(map, "callable");
            let kwargs = cx.optional_or_else(map, "kwargs", Mapping::new);
            return Some(Self::FromLibrary(ArchitectureFromLibraryDescr {
                import_from: import_from?,
                callable: callable?,
                kwargs,
            }));
        }
        cx.forbid_unknown(map, &["source", "sha256", "callable", "kwargs"]);
        let file = file_descr_from_fields(map, cx);
        let callable = cx.required(map, "callable");
        let kwargs = cx.optional_or_else(map, "kwargs", Mapping::new);
        Some(Self::FromFile(ArchitectureFromFileDescr {
            file: file?,
            callable: callable?,
            kwargs,
        }))
    }
}

/// Fields shared by every weights entry.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct WeightsEntryBase {
    #[serde(flatten)]
    pub file: FileDescr,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    /// The weights format these weights were converted from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<WeightsFormat>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

const WEIGHTS_BASE_FIELDS: &[&str] = &["source", "sha256", "authors", "parent", "comment"];

impl WeightsEntryBase {
    fn validate_fields(map: &Mapping, cx: &mut Validator, own_format: WeightsFormat) -> Option<Self> {
        let file = file_descr_from_fields(map, cx);
        let authors = cx.optional_or(map, "authors", Vec::new());
        let parent: Option<WeightsFormat> = cx.optional(map, "parent");
        if parent == Some(own_format) {
            cx.with("parent", |cx| {
                cx.error("value_error.weights", format!("Weights entry can't be it's own parent: {own_format}"))
            });
        }
        let comment = cx.optional_or(map, "comment", String::new());
        Some(Self {
            file: file?,
            authors,
            parent,
            comment,
        })
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct KerasHdf5WeightsDescr {
    #[serde(flatten)]
    pub base: WeightsEntryBase,
    /// TensorFlow version used to create these weights.
    pub tensorflow_version: Version,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct OnnxWeightsDescr {
    #[serde(flatten)]
    pub base: WeightsEntryBase,
    /// ONNX opset version
    pub opset_version: u32,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PytorchStateDictWeightsDescr {
    #[serde(flatten)]
    pub base: WeightsEntryBase,
    pub architecture: ArchitectureDescr,
    /// Version of the PyTorch library used.
    pub pytorch_version: Version,
    /// Custom depencies beyond pytorch as a conda environment file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<FileDescr>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TensorflowJsWeightsDescr {
    #[serde(flatten)]
    pub base: WeightsEntryBase,
    pub tensorflow_version: Version,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TensorflowSavedModelBundleWeightsDescr {
    #[serde(flatten)]
    pub base: WeightsEntryBase,
    pub tensorflow_version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<FileDescr>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TorchscriptWeightsDescr {
    #[serde(flatten)]
    pub base: WeightsEntryBase,
    pub pytorch_version: Version,
}

fn check_dependencies_suffix(descr: &Option<FileDescr>, cx: &mut Validator) {
    if let Some(deps) = descr {
        cx.with("dependencies", |cx| {
            check_suffix(cx, &deps.source, &[".yaml", ".yml"], true)
        });
    }
}

/// The weights for a model, keyed by format; at least one entry.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct WeightsDescr {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keras_hdf5: Option<KerasHdf5WeightsDescr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onnx: Option<OnnxWeightsDescr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pytorch_state_dict: Option<PytorchStateDictWeightsDescr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tensorflow_js: Option<TensorflowJsWeightsDescr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tensorflow_saved_model_bundle: Option<TensorflowSavedModelBundleWeightsDescr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torchscript: Option<TorchscriptWeightsDescr>,
}

impl WeightsDescr {
    pub fn available_formats(&self) -> Vec<WeightsFormat> {
        let mut formats = Vec::new();
        if self.keras_hdf5.is_some() {
            formats.push(WeightsFormat::KerasHdf5);
        }
        if self.onnx.is_some() {
            formats.push(WeightsFormat::Onnx);
        }
        if self.pytorch_state_dict.is_some() {
            formats.push(WeightsFormat::PytorchStateDict);
        }
        if self.tensorflow_js.is_some() {
            formats.push(WeightsFormat::TensorflowJs);
        }
        if self.tensorflow_saved_model_bundle.is_some() {
            formats.push(WeightsFormat::TensorflowSavedModelBundle);
        }
        if self.torchscript.is_some() {
            formats.push(WeightsFormat::Torchscript);
        }
        formats
    }

    pub fn parent_of(&self, format: WeightsFormat) -> Option<WeightsFormat> {
        match format {
            WeightsFormat::KerasHdf5 => self.keras_hdf5.as_ref().and_then(|e| e.base.parent),
            WeightsFormat::Onnx => self.onnx.as_ref().and_then(|e| e.base.parent),
            WeightsFormat::PytorchStateDict => self.pytorch_state_dict.as_ref().and_then(|e| e.base.parent),
            WeightsFormat::TensorflowJs => self.tensorflow_js.as_ref().and_then(|e| e.base.parent),
            WeightsFormat::TensorflowSavedModelBundle => {
                self.tensorflow_saved_model_bundle.as_ref().and_then(|e| e.base.parent)
            }
            WeightsFormat::Torchscript => self.torchscript.as_ref().and_then(|e| e.base.parent),
        }
    }

    /// Keep only `format`, dropping every other entry.
    pub fn retain_format(&self, format: WeightsFormat) -> WeightsDescr {
        let mut filtered = WeightsDescr::default();
        match format {
            WeightsFormat::KerasHdf5 => filtered.keras_hdf5 = self.keras_hdf5.clone(),
            WeightsFormat::Onnx => filtered.onnx = self.onnx.clone(),
            WeightsFormat::PytorchStateDict => filtered.pytorch_state_dict = self.pytorch_state_dict.clone(),
            WeightsFormat::TensorflowJs => filtered.tensorflow_js = self.tensorflow_js.clone(),
            WeightsFormat::TensorflowSavedModelBundle => {
                filtered.tensorflow_saved_model_bundle = self.tensorflow_saved_model_bundle.clone()
            }
            WeightsFormat::Torchscript => filtered.torchscript = self.torchscript.clone(),
        }
        filtered
    }
}

impl Validate for WeightsDescr {
    fn validate(value: &YamlValue, cx: &mut Validator) -> Option<Self> {
        let YamlValue::Mapping(map) = value else {
            cx.type_error("map", value);
            return None;
        };
        cx.forbid_unknown(
            map,
            &[
                "keras_hdf5",
                "onnx",
                "pytorch_state_dict",
                "tensorflow_js",
                "tensorflow_saved_model_bundle",
                "torchscript",
            ],
        );

        let keras_hdf5 = validate_entry(map, cx, "keras_hdf5", |map, cx| {
            cx.forbid_unknown(map, &with_base_fields(&["tensorflow_version"]));
            let base = WeightsEntryBase::validate_fields(map, cx, WeightsFormat::KerasHdf5);
            let tensorflow_version = cx.required(map, "tensorflow_version");
            Some(KerasHdf5WeightsDescr {
                base: base?,
                tensorflow_version: tensorflow_version?,
            })
        });
        let onnx = validate_entry(map, cx, "onnx", |map, cx| {
            cx.forbid_unknown(map, &with_base_fields(&["opset_version"]));
            let base = WeightsEntryBase::validate_fields(map, cx, WeightsFormat::Onnx);
            let opset_version: Option<u32> = cx.required(map, "opset_version");
            if let Some(opset) = opset_version {
                if opset < 7 {
                    cx.with("opset_version", |cx| {
                        cx.error("value_error.int", format!("Expected opset version >= 7, found {opset}"))
                    });
                }
            }
            Some(OnnxWeightsDescr {
                base: base?,
                opset_version: opset_version?,
            })
        });
        let pytorch_state_dict = validate_entry(map, cx, "pytorch_state_dict", |map, cx| {
            cx.forbid_unknown(map, &with_base_fields(&["architecture", "pytorch_version", "dependencies"]));
            let base = WeightsEntryBase::validate_fields(map, cx, WeightsFormat::PytorchStateDict);
            let architecture = cx.required(map, "architecture");
            let pytorch_version = cx.required(map, "pytorch_version");
            let dependencies = cx.optional(map, "dependencies");
            check_dependencies_suffix(&dependencies, cx);
            Some(PytorchStateDictWeightsDescr {
                base: base?,
                architecture: architecture?,
                pytorch_version: pytorch_version?,
                dependencies,
            })
        });
        let tensorflow_js = validate_entry(map, cx, "tensorflow_js", |map, cx| {
            cx.forbid_unknown(map, &with_base_fields(&["tensorflow_version"]));
            let base = WeightsEntryBase::validate_fields(map, cx, WeightsFormat::TensorflowJs);
            let tensorflow_version = cx.required(map, "tensorflow_version");
            Some(TensorflowJsWeightsDescr {
                base: base?,
                tensorflow_version: tensorflow_version?,
            })
        });
        let tensorflow_saved_model_bundle = validate_entry(map, cx, "tensorflow_saved_model_bundle", |map, cx| {
            cx.forbid_unknown(map, &with_base_fields(&["tensorflow_version", "dependencies"]));
            let base = WeightsEntryBase::validate_fields(map, cx, WeightsFormat::TensorflowSavedModelBundle);
            let tensorflow_version = cx.required(map, "tensorflow_version");
            let dependencies = cx.optional(map, "dependencies");
            check_dependencies_suffix(&dependencies, cx);
            Some(TensorflowSavedModelBundleWeightsDescr {
                base: base?,
                tensorflow_version: tensorflow_version?,
                dependencies,
            })
        });
        let torchscript = validate_entry(map, cx, "torchscript", |map, cx| {
            cx.forbid_unknown(map, &with_base_fields(&["pytorch_version"]));
            let base = WeightsEntryBase::validate_fields(map, cx, WeightsFormat::Torchscript);
            let pytorch_version = cx.required(map, "pytorch_version");
            Some(TorchscriptWeightsDescr {
                base: base?,
                pytorch_version: pytorch_version?,
            })
        });

        let descr = WeightsDescr {
            keras_hdf5,
            onnx,
            pytorch_state_dict,
            tensorflow_js,
            tensorflow_saved_model_bundle,
            torchscript,
        };

        let present = descr.available_formats();
        if present.is_empty() {
            cx.error("value_error.weights", "Missing weights entry");
            return None;
        }

        let without_parent: Vec<WeightsFormat> =
            present.iter().copied().filter(|f| descr.parent_of(*f).is_none()).collect();
        if without_parent.len() != 1 {
            cx.warn(
                Severity::Warning,
                format!(
                    "Exactly one weights entry may not specify the `parent` field (got {}). \
                     That entry is considered the original set of model weights.",
                    without_parent.len()
                ),
            );
        }

        for format in present.iter() {
            if let Some(parent) = descr.parent_of(*format) {
                if !present.contains(&parent) {
                    cx.with(format.to_string(), |cx| {
                        cx.with("parent", |cx| {
                            cx.error(
                                "value_error.weights",
                                format!("`weights.{format}.parent={parent}` not in specified weight formats"),
                            )
                        })
                    });
                }
            }
        }

        Some(descr)
    }
}

fn with_base_fields(extra: &[&'static str]) -> Vec<&'static str> {
    WEIGHTS_BASE_FIELDS.iter().chain(extra.iter()).copied().collect()
}

fn validate_entry<T>(
    map: &Mapping,
    cx: &mut Validator,
    field: &'static str,
    body: impl FnOnce(&Mapping, &mut Validator) -> Option<T>,
) -> Option<T> {
    match yaml::get(map, field) {
        None | Some(YamlValue::Null) => None,
        Some(YamlValue::Mapping(entry)) => cx.with(field, |cx| body(entry, cx)),
        Some(other) => {
            cx.with(field, |cx| cx.type_error("map", other));
            None
        }
    }
}
