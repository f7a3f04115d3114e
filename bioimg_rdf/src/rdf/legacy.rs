//! Shallow validation of older format versions in discover mode.
//!
//! Loading at an older declared format does not upgrade the data; the legacy
//! checks cover the envelope fields and, for models, the consistency of the
//! letter-axes/shape pairs. Converting to the typed latest tree is only done
//! by loading with the `latest` format version.

use crate::registry::Schema;
use crate::validation::{Severity, Validate, Validator};
use crate::yaml::{self, Mapping, YamlValue};

use super::cite_entry::Doi;
use super::file_reference::FileReference;
use super::license::{LicenseId, LicenseStatus};
use super::version::FormatVersion;

/// A description validated at an older format version; the raw content is
/// carried along instead of a typed tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LegacyDescr {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub format_version: FormatVersion,
    #[serde(flatten)]
    pub content: Mapping,
}

impl LegacyDescr {
    pub fn validate_content(map: &Mapping, schema: Schema, cx: &mut Validator) -> Option<Self> {
        check_envelope(map, cx);
        if schema.resource_type == crate::registry::ResourceType::Model {
            check_model_tensors(map, cx);
        }

        let resource_type = yaml::get_str(map, "type").unwrap_or("generic").to_owned();
        let format_version: Option<FormatVersion> = cx.required(map, "format_version");
        let mut content = map.clone();
        let _ = yaml::remove(&mut content, "type");
        let _ = yaml::remove(&mut content, "format_version");
        Some(Self {
            resource_type,
            format_version: format_version?,
            content,
        })
    }
}

fn check_envelope(map: &Mapping, cx: &mut Validator) {
    if yaml::get(map, "name").is_none() {
        cx.with("name", |cx| cx.error("missing", "Field 'name' is required"));
    } else if yaml::get_str(map, "name").is_none() {
        cx.with("name", |cx| cx.type_error("str", yaml::get(map, "name").unwrap_or(&YamlValue::Null)));
    }

    if let Some(value) = yaml::get(map, "authors") {
        match value {
            YamlValue::Sequence(authors) => cx.with("authors", |cx| {
                for (idx, author) in authors.iter().enumerate() {
                    cx.with(idx, |cx| match author {
                        // bare strings are legal in the 0.2 line
                        YamlValue::String(_) => {}
                        YamlValue::Mapping(person) => {
                            if yaml::get(person, "name").is_none() {
                                cx.with("name", |cx| cx.error("missing", "Author 'name' is required"));
                            }
                        }
                        other => cx.type_error("map", other),
                    });
                }
            }),
            other => cx.with("authors", |cx| cx.type_error("list", other)),
        }
    }

    if let Some(value) = yaml::get(map, "cite") {
        match value {
            YamlValue::Sequence(entries) => cx.with("cite", |cx| {
                for (idx, entry) in entries.iter().enumerate() {
                    cx.with(idx, |cx| {
                        let YamlValue::Mapping(entry) = entry else {
                            cx.type_error("map", entry);
                            return;
                        };
                        if yaml::get(entry, "text").is_none() {
                            cx.with("text", |cx| cx.error("missing", "Citation 'text' is required"));
                        }
                        if let Some(doi) = yaml::get(entry, "doi") {
                            let _ = cx.with("doi", |cx| Doi::validate(doi, cx));
                        }
                    });
                }
            }),
            other => cx.with("cite", |cx| cx.type_error("list", other)),
        }
    }

    if let Some(YamlValue::String(license)) = yaml::get(map, "license") {
        cx.with("license", |cx| match LicenseId::try_from(license.clone()) {
            Ok(id) => match id.status() {
                LicenseStatus::Known => {}
                LicenseStatus::Deprecated => cx.warn(
                    Severity::Warning,
                    format!("{id} is deprecated, see https://spdx.org/licenses/{id}.html"),
                ),
                LicenseStatus::Unknown => {
                    cx.warn(Severity::Warning, format!("'{id}' is not a known SPDX license id"))
                }
            },
            Err(err) => cx.error("value_error.license", err.to_string()),
        });
    }

    if let Some(documentation) = yaml::get(map, "documentation") {
        let _ = cx.with("documentation", |cx| FileReference::validate(documentation, cx));
    }
}

const VALID_AXIS_LETTERS: &[char] = &['b', 'i', 't', 'c', 'z', 'y', 'x'];

fn check_model_tensors(map: &Mapping, cx: &mut Validator) {
    for field in ["inputs", "outputs"] {
        let Some(value) = yaml::get(map, field) else {
            cx.with(field, |cx| cx.error("missing", format!("Field '{field}' is required")));
            continue;
        };
        let YamlValue::Sequence(tensors) = value else {
            cx.with(field, |cx| cx.type_error("list", value));
            continue;
        };
        cx.with(field, |cx| {
            if tensors.is_empty() {
                cx.error("value_error.min_length", "At least one tensor is required");
            }
            for (idx, tensor) in tensors.iter().enumerate() {
                cx.with(idx, |cx| check_legacy_tensor(tensor, cx));
            }
        });
    }

    match yaml::get(map, "weights") {
        None => cx.with("weights", |cx| cx.error("missing", "Field 'weights' is required")),
        Some(YamlValue::Mapping(weights)) => cx.with("weights", |cx| {
            if weights.is_empty() {
                cx.error("value_error.weights", "Missing weights entry");
            }
            for (key, entry) in weights.iter() {
                let Some(name) = key.as_str() else { continue };
                cx.with(name.to_owned(), |cx| {
                    let YamlValue::Mapping(entry) = entry else {
                        cx.type_error("map", entry);
                        return;
                    };
                    if yaml::get(entry, "source").is_none() {
                        cx.with("source", |cx| cx.error("missing", "Weights 'source' is required"));
                    }
                });
            }
        }),
        Some(other) => cx.with("weights", |cx| cx.type_error("map", other)),
    }
}

fn check_legacy_tensor(tensor: &YamlValue, cx: &mut Validator) {
    let YamlValue::Mapping(tensor) = tensor else {
        cx.type_error("map", tensor);
        return;
    };
    if yaml::get(tensor, "name").is_none() {
        cx.with("name", |cx| cx.error("missing", "Tensor 'name' is required"));
    }

    let axes_len = match yaml::get(tensor, "axes") {
        Some(YamlValue::String(letters)) => {
            cx.with("axes", |cx| {
                let mut seen = Vec::new();
                for letter in letters.chars() {
                    if !VALID_AXIS_LETTERS.contains(&letter) {
                        cx.error("value_error.axes", format!("Invalid axis letter '{letter}'"));
                    }
                    if seen.contains(&letter) {
                        cx.error("value_error.axes", format!("Duplicate axis letter '{letter}'"));
                    }
                    seen.push(letter);
                }
            });
            Some(letters.chars().count())
        }
        Some(other) => {
            cx.with("axes", |cx| cx.type_error("str", other));
            None
        }
        None => None,
    };

    let Some(axes_len) = axes_len else { return };

    let check_len = |cx: &mut Validator, name: &'static str, found: usize| {
        if found != axes_len {
            cx.error(
                "value_error.shape",
                format!("'{name}' has {found} entries, but the tensor has {axes_len} axes"),
            );
        }
    };

    match yaml::get(tensor, "shape") {
        Some(YamlValue::Sequence(dims)) => {
            cx.with("shape", |cx| check_len(cx, "shape", dims.len()));
        }
        Some(YamlValue::Mapping(shape)) => cx.with("shape", |cx| {
            if yaml::get(shape, "reference_tensor").is_some() {
                for field in ["scale", "offset"] {
                    if let Some(YamlValue::Sequence(values)) = yaml::get(shape, field) {
                        cx.with(field, |cx| check_len(cx, field, values.len()));
                    }
                }
            } else {
                for field in ["min", "step"] {
                    match yaml::get(shape, field) {
                        Some(YamlValue::Sequence(values)) => {
                            cx.with(field, |cx| check_len(cx, field, values.len()));
                        }
                        _ => cx.with(field, |cx| {
                            cx.error("missing", format!("Parameterized shapes require '{field}'"))
                        }),
                    }
                }
            }
        }),
        Some(other) => cx.with("shape", |cx| cx.type_error("shape", other)),
        None => {}
    }

    if let Some(YamlValue::Sequence(halo)) = yaml::get(tensor, "halo") {
        cx.with("halo", |cx| check_len(cx, "halo", halo.len()));
    }
}
