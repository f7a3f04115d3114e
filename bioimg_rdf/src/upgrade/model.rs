use crate::yaml::{self, Mapping, Number, YamlValue};

use super::format_version_tuple;
use super::generic::{
    convert_attachments, remove_doi_prefix, remove_github_prefix, remove_slashes_from_names,
};

/// Model 0.3.x/0.4.x -> 0.5 conversion, including the legacy axis-letter
/// translation. Already-0.5 data only gets its patch version bumped.
pub fn upgrade_model_to_0_5(data: &mut Mapping) {
    let Some((major, minor, patch)) = format_version_tuple(data) else {
        return;
    };
    if (major, minor) > (0, 5) {
        return;
    }
    if (major, minor) == (0, 5) {
        if patch < 3 {
            yaml::insert(data, "format_version", YamlValue::String("0.5.3".into()));
        }
        return;
    }

    promote_author_strings_in_model(data);
    remove_slashes_from_names(data);
    remove_doi_prefix(data);
    remove_github_prefix(data);

    convert_axes_string_to_axis_descriptions(data);
    convert_architecture(data);
    convert_attachments(data);
    convert_weights_defaults(data);
    let _ = yaml::remove(data, "download_url");

    // a 0.4 `parent: {uri, sha256}` has no 0.5 equivalent
    if matches!(yaml::get(data, "parent"), Some(YamlValue::Mapping(m)) if yaml::get(m, "id").is_none()) {
        let _ = yaml::remove(data, "parent");
    }

    yaml::insert(data, "format_version", YamlValue::String("0.5.3".into()));
}

fn promote_author_strings_in_model(data: &mut Mapping) {
    for field in ["authors", "packaged_by"] {
        let Some(YamlValue::Sequence(authors)) = yaml::get(data, field).cloned() else {
            continue;
        };
        let promoted: Vec<YamlValue> = authors
            .into_iter()
            .map(|author| match author {
                YamlValue::String(name) => {
                    let mut person = Mapping::new();
                    yaml::insert(&mut person, "name", YamlValue::String(name));
                    YamlValue::Mapping(person)
                }
                other => other,
            })
            .collect();
        yaml::insert(data, field, YamlValue::Sequence(promoted));
    }
}

fn axis_type_for_letter(letter: char) -> &'static str {
    match letter {
        'b' => "batch",
        't' => "time",
        'i' => "index",
        'c' => "channel",
        _ => "space",
    }
}

fn axis_id_for_letter(letter: char) -> String {
    match letter {
        'b' => "batch".into(),
        't' => "time".into(),
        'i' => "index".into(),
        'c' => "channel".into(),
        other => other.to_string(),
    }
}

/// The 0.4 shape of one tensor dimension, extracted from the legacy `shape`
/// field.
#[derive(Clone, Debug)]
enum LegacyDimension {
    Fixed(i64),
    Parameterized { min: i64, step: i64 },
    Implicit { reference: String, scale: f64, doubled_offset: f64 },
}

fn analyze_tensor_shape(shape: Option<&YamlValue>) -> Vec<Option<LegacyDimension>> {
    match shape {
        Some(YamlValue::Sequence(dims)) => dims
            .iter()
            .map(|dim| dim.as_i64().map(LegacyDimension::Fixed))
            .collect(),
        Some(YamlValue::Mapping(map)) => {
            if let Some(YamlValue::String(reference)) = yaml::get(map, "reference_tensor") {
                let offsets = sequence_of_f64(yaml::get(map, "offset"));
                let scales = sequence_of_f64(yaml::get(map, "scale"));
                let len = offsets.len().max(scales.len());
                (0..len)
                    .map(|i| {
                        Some(LegacyDimension::Implicit {
                            reference: reference.clone(),
                            scale: scales.get(i).copied().unwrap_or(1.0),
                            doubled_offset: 2.0 * offsets.get(i).copied().unwrap_or(0.0),
                        })
                    })
                    .collect()
            } else {
                let mins = sequence_of_i64(yaml::get(map, "min"));
                let steps = sequence_of_i64(yaml::get(map, "step"));
                mins.iter()
                    .zip(steps.iter())
                    .map(|(min, step)| Some(LegacyDimension::Parameterized { min: *min, step: *step }))
                    .collect()
            }
        }
        _ => Vec::new(),
    }
}

fn sequence_of_f64(value: Option<&YamlValue>) -> Vec<f64> {
    match value {
        Some(YamlValue::Sequence(items)) => items.iter().filter_map(|v| v.as_f64()).collect(),
        _ => Vec::new(),
    }
}

fn sequence_of_i64(value: Option<&YamlValue>) -> Vec<i64> {
    match value {
        Some(YamlValue::Sequence(items)) => items.iter().filter_map(|v| v.as_i64()).collect(),
        _ => Vec::new(),
    }
}

/// Fixed per-letter extents of every tensor with an explicit shape list,
/// used to resolve implicit channel extents during conversion.
fn collect_size_refs(data: &Mapping) -> std::collections::BTreeMap<String, std::collections::BTreeMap<char, i64>> {
    let mut refs = std::collections::BTreeMap::new();
    for field in ["inputs", "outputs"] {
        let Some(YamlValue::Sequence(tensors)) = yaml::get(data, field) else {
            continue;
        };
        for tensor in tensors.iter() {
            let YamlValue::Mapping(tensor) = tensor else { continue };
            let Some(name) = yaml::get_str(tensor, "name") else { continue };
            let Some(YamlValue::String(letters)) = yaml::get(tensor, "axes") else {
                continue;
            };
            let Some(YamlValue::Sequence(dims)) = yaml::get(tensor, "shape") else {
                continue;
            };
            let per_letter: std::collections::BTreeMap<char, i64> = letters
                .chars()
                .zip(dims.iter())
                .filter_map(|(letter, dim)| dim.as_i64().map(|d| (letter, d)))
                .collect();
            let _ = refs.insert(name.to_owned(), per_letter);
        }
    }
    refs
}

fn convert_axes_string_to_axis_descriptions(data: &mut Mapping) {
    let test_inputs = yaml::remove(data, "test_inputs");
    let test_outputs = yaml::remove(data, "test_outputs");
    let sample_inputs = yaml::remove(data, "sample_inputs");
    let sample_outputs = yaml::remove(data, "sample_outputs");

    let size_refs = collect_size_refs(data);

    if let Some(YamlValue::Sequence(inputs)) = yaml::get(data, "inputs").cloned() {
        let converted = update_tensor_specs(inputs, test_inputs.as_ref(), sample_inputs.as_ref(), &size_refs);
        yaml::insert(data, "inputs", YamlValue::Sequence(converted));
    }
    if let Some(YamlValue::Sequence(outputs)) = yaml::get(data, "outputs").cloned() {
        let converted = update_tensor_specs(outputs, test_outputs.as_ref(), sample_outputs.as_ref(), &size_refs);
        yaml::insert(data, "outputs", YamlValue::Sequence(converted));
    }
}

fn sequence_item(value: Option<&YamlValue>, idx: usize) -> Option<YamlValue> {
    match value {
        Some(YamlValue::Sequence(items)) => items.get(idx).cloned(),
        _ => None,
    }
}

fn update_tensor_specs(
    tensors: Vec<YamlValue>,
    test_tensors: Option<&YamlValue>,
    sample_tensors: Option<&YamlValue>,
    size_refs: &std::collections::BTreeMap<String, std::collections::BTreeMap<char, i64>>,
) -> Vec<YamlValue> {
    tensors
        .into_iter()
        .enumerate()
        .map(|(idx, tensor)| {
            let old = match tensor {
                YamlValue::Mapping(map) => map,
                other => return other,
            };
            let mut new_d = Mapping::new();
            if let Some(name) = yaml::get(&old, "name").cloned() {
                yaml::insert(&mut new_d, "id", name);
            }
            if let Some(description) = yaml::get(&old, "description").cloned() {
                yaml::insert(&mut new_d, "description", description);
            }
            if let Some(test_tensor) = sequence_item(test_tensors, idx) {
                let mut descr = Mapping::new();
                yaml::insert(&mut descr, "source", test_tensor);
                yaml::insert(&mut new_d, "test_tensor", YamlValue::Mapping(descr));
            }
            if let Some(sample_tensor) = sequence_item(sample_tensors, idx) {
                let mut descr = Mapping::new();
                yaml::insert(&mut descr, "source", sample_tensor);
                yaml::insert(&mut new_d, "sample_tensor", YamlValue::Mapping(descr));
            }

            let mut data_descr = Mapping::new();
            let data_type = yaml::get(&old, "data_type")
                .cloned()
                .unwrap_or_else(|| YamlValue::String("float32".into()));
            yaml::insert(&mut data_descr, "type", data_type);
            yaml::insert(&mut new_d, "data", YamlValue::Mapping(data_descr));

            let halos = sequence_of_i64(yaml::get(&old, "halo"));
            let dims = analyze_tensor_shape(yaml::get(&old, "shape"));

            if let Some(YamlValue::String(letters)) = yaml::get(&old, "axes") {
                let axes: Vec<YamlValue> = letters
                    .chars()
                    .enumerate()
                    .map(|(i, letter)| {
                        axis_description_from_letter(
                            letter,
                            dims.get(i).and_then(|d| d.clone()),
                            halos.get(i).copied(),
                            size_refs,
                        )
                    })
                    .collect();
                yaml::insert(&mut new_d, "axes", YamlValue::Sequence(axes));
            }

            for proc in ["preprocessing", "postprocessing"] {
                if let Some(YamlValue::Sequence(steps)) = yaml::get(&old, proc).cloned() {
                    let converted: Vec<YamlValue> = steps.into_iter().map(convert_processing_step).collect();
                    yaml::insert(&mut new_d, proc, YamlValue::Sequence(converted));
                }
            }

            YamlValue::Mapping(new_d)
        })
        .collect()
}

fn axis_description_from_letter(
    letter: char,
    dim: Option<LegacyDimension>,
    halo: Option<i64>,
    size_refs: &std::collections::BTreeMap<String, std::collections::BTreeMap<char, i64>>,
) -> YamlValue {
    let mut axis = Mapping::new();
    let axis_type = axis_type_for_letter(letter);
    yaml::insert(&mut axis, "type", YamlValue::String(axis_type.into()));
    if axis_type == "space" {
        yaml::insert(&mut axis, "id", YamlValue::String(letter.to_string()));
    }
    if axis_type == "batch" {
        return YamlValue::Mapping(axis);
    }

    match dim {
        None => {}
        Some(LegacyDimension::Fixed(size)) => {
            if axis_type == "channel" {
                let names: Vec<YamlValue> = (0..size.max(0))
                    .map(|i| YamlValue::String(format!("channel{i}")))
                    .collect();
                yaml::insert(&mut axis, "channel_names", YamlValue::Sequence(names));
            } else {
                yaml::insert(&mut axis, "size", YamlValue::Number(Number::from(size)));
            }
        }
        Some(LegacyDimension::Parameterized { min, step }) => {
            if step == 0 {
                yaml::insert(&mut axis, "size", YamlValue::Number(Number::from(min)));
            } else {
                let mut size = Mapping::new();
                yaml::insert(&mut size, "min", YamlValue::Number(Number::from(min)));
                yaml::insert(&mut size, "step", YamlValue::Number(Number::from(step)));
                yaml::insert(&mut axis, "size", YamlValue::Mapping(size));
            }
        }
        Some(LegacyDimension::Implicit {
            reference,
            scale,
            doubled_offset,
        }) => {
            if scale == 0.0 {
                // the old way of inserting a new axis dimension
                yaml::insert(
                    &mut axis,
                    "size",
                    YamlValue::Number(Number::from(doubled_offset as i64)),
                );
            } else if axis_type == "channel" {
                // a channel axis needs explicit channel names; resolve the
                // referenced extent where the reference tensor's shape is known
                let ref_tensor = reference.split_once('.').map(|(t, _)| t).unwrap_or(reference.as_str());
                let count = size_refs
                    .get(ref_tensor)
                    .and_then(|dims| dims.get(&'c'))
                    .map(|ref_size| (*ref_size as f64 * scale + doubled_offset) as i64)
                    .unwrap_or(0);
                let names: Vec<YamlValue> = (0..count.max(0))
                    .map(|i| YamlValue::String(format!("channel{i}")))
                    .collect();
                yaml::insert(&mut axis, "channel_names", YamlValue::Sequence(names));
            } else {
                // `reference_tensor` may carry an explicit axis as `t.a`
                let (ref_tensor, ref_axis) = match reference.split_once('.') {
                    Some((tensor, axis_id)) => (tensor.to_owned(), axis_id.to_owned()),
                    None => (reference, axis_id_for_letter(letter)),
                };
                let mut size = Mapping::new();
                yaml::insert(&mut size, "tensor_id", YamlValue::String(ref_tensor));
                yaml::insert(&mut size, "axis_id", YamlValue::String(ref_axis));
                if doubled_offset != 0.0 {
                    yaml::insert(
                        &mut size,
                        "offset",
                        YamlValue::Number(Number::from(doubled_offset as i64)),
                    );
                }
                yaml::insert(&mut axis, "size", YamlValue::Mapping(size));
                if scale != 1.0 && axis_type != "channel" && axis_type != "index" {
                    yaml::insert(&mut axis, "scale", YamlValue::Number(Number::from(1.0 / scale)));
                }
            }
        }
    }

    if let Some(halo) = halo {
        if halo >= 1 && (axis_type == "time" || axis_type == "space") {
            yaml::insert(&mut axis, "halo", YamlValue::Number(Number::from(halo)));
        }
    }

    YamlValue::Mapping(axis)
}

/// 0.4 processing steps carry `name` instead of `id` and axes as a letter
/// string.
fn convert_processing_step(step: YamlValue) -> YamlValue {
    let mut step = match step {
        YamlValue::Mapping(map) => map,
        other => return other,
    };
    if let Some(name) = yaml::remove(&mut step, "name") {
        yaml::insert(&mut step, "id", name);
    }

    let Some(YamlValue::Mapping(mut kwargs)) = yaml::get(&mut step, "kwargs").cloned() else {
        return YamlValue::Mapping(step);
    };

    let mode = yaml::get_str(&kwargs, "mode").map(str::to_owned);
    let mut axes_ids: Option<Vec<String>> = match yaml::get(&kwargs, "axes") {
        Some(YamlValue::String(letters)) => Some(letters.chars().map(axis_id_for_letter).collect()),
        Some(YamlValue::Sequence(ids)) => Some(
            ids.iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
        ),
        _ => None,
    };

    let step_id = yaml::get_str(&step, "id").map(str::to_owned);
    match step_id.as_deref() {
        Some("zero_mean_unit_variance") if mode.as_deref() == Some("fixed") => {
            yaml::insert(&mut step, "id", YamlValue::String("fixed_zero_mean_unit_variance".into()));
            let _ = yaml::remove(&mut kwargs, "axes");
            let _ = yaml::remove(&mut kwargs, "mode");
        }
        Some("zero_mean_unit_variance") => {
            if mode.as_deref() == Some("per_dataset") {
                if let Some(ids) = &mut axes_ids {
                    ids.insert(0, "batch".into());
                } else {
                    axes_ids = Some(vec!["batch".into()]);
                }
            }
            let _ = yaml::remove(&mut kwargs, "mode");
            if let Some(ids) = &axes_ids {
                yaml::insert(
                    &mut kwargs,
                    "axes",
                    YamlValue::Sequence(ids.iter().map(|id| YamlValue::String(id.clone())).collect()),
                );
            }
        }
        _ => {
            if let Some(ids) = &axes_ids {
                yaml::insert(
                    &mut kwargs,
                    "axes",
                    YamlValue::Sequence(ids.iter().map(|id| YamlValue::String(id.clone())).collect()),
                );
            }
        }
    }

    yaml::insert(&mut step, "kwargs", YamlValue::Mapping(kwargs));
    YamlValue::Mapping(step)
}

/// The 0.4 `architecture` string (or object) of the pytorch state dict entry
/// becomes an architecture sub-object.
fn convert_architecture(data: &mut Mapping) {
    let Some(YamlValue::Mapping(mut weights)) = yaml::get(data, "weights").cloned() else {
        return;
    };
    let Some(YamlValue::Mapping(mut entry)) = yaml::get(&weights, "pytorch_state_dict").cloned() else {
        return;
    };

    let callable = yaml::remove(&mut entry, "architecture");
    let mut architecture = Mapping::new();
    match callable {
        Some(YamlValue::String(spec)) => {
            // "<file>:<callable>" or "<pkg.mod.callable>"
            if let Some((file, callable_name)) = spec.rsplit_once(':') {
                yaml::insert(&mut architecture, "source", YamlValue::String(file.to_owned()));
                yaml::insert(&mut architecture, "callable", YamlValue::String(callable_name.to_owned()));
            } else if let Some((module, callable_name)) = spec.rsplit_once('.') {
                yaml::insert(&mut architecture, "import_from", YamlValue::String(module.to_owned()));
                yaml::insert(&mut architecture, "callable", YamlValue::String(callable_name.to_owned()));
            } else {
                yaml::insert(&mut architecture, "callable", YamlValue::String(spec));
            }
        }
        Some(YamlValue::Mapping(mut object)) => {
            if let Some(source_file) = yaml::remove(&mut object, "source_file") {
                yaml::insert(&mut object, "source", source_file);
            }
            architecture = object;
        }
        _ => return,
    }

    if let Some(sha) = yaml::remove(&mut entry, "architecture_sha256") {
        yaml::insert(&mut architecture, "sha256", sha);
    }
    if let Some(kwargs) = yaml::remove(&mut entry, "kwargs") {
        yaml::insert(&mut architecture, "kwargs", kwargs);
    }

    yaml::insert(&mut entry, "architecture", YamlValue::Mapping(architecture));
    yaml::insert(&mut weights, "pytorch_state_dict", YamlValue::Mapping(entry));
    yaml::insert(data, "weights", YamlValue::Mapping(weights));
}

/// Weight entries of old descriptions often omit the library versions; the
/// 0.5 format requires them.
fn convert_weights_defaults(data: &mut Mapping) {
    let Some(YamlValue::Mapping(mut weights)) = yaml::get(data, "weights").cloned() else {
        return;
    };

    for name in ["pytorch_state_dict", "torchscript"] {
        if let Some(YamlValue::Mapping(mut entry)) = yaml::get(&weights, name).cloned() {
            if yaml::get(&entry, "pytorch_version").is_none() {
                yaml::insert(&mut entry, "pytorch_version", YamlValue::String("1.10".into()));
            }
            yaml::insert(&mut weights, name, YamlValue::Mapping(entry));
        }
    }
    for name in ["keras_hdf5", "tensorflow_saved_model_bundle", "tensorflow_js"] {
        if let Some(YamlValue::Mapping(mut entry)) = yaml::get(&weights, name).cloned() {
            if yaml::get(&entry, "tensorflow_version").is_none() {
                yaml::insert(&mut entry, "tensorflow_version", YamlValue::String("1.15".into()));
            }
            yaml::insert(&mut weights, name, YamlValue::Mapping(entry));
        }
    }
    if let Some(YamlValue::Mapping(mut entry)) = yaml::get(&weights, "onnx").cloned() {
        if yaml::get(&entry, "opset_version").is_none() {
            yaml::insert(&mut entry, "opset_version", YamlValue::Number(Number::from(15)));
        }
        yaml::insert(&mut weights, "onnx", YamlValue::Mapping(entry));
    }

    yaml::insert(data, "weights", YamlValue::Mapping(weights));
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_axes_letters_to_axis_objects() {
        let mut data: Mapping = serde_yaml::from_str(indoc! {"
            format_version: 0.4.9
            type: model
            inputs:
              - name: raw
                axes: bcyx
                data_type: float32
                shape:
                  min: [1, 1, 16, 16]
                  step: [0, 0, 8, 8]
            test_inputs: [raw_test.npy]
        "})
        .unwrap();
        upgrade_model_to_0_5(&mut data);

        assert_eq!(yaml::get_str(&data, "format_version"), Some("0.5.3"));
        assert!(yaml::get(&data, "test_inputs").is_none());

        let YamlValue::Sequence(inputs) = yaml::get(&data, "inputs").unwrap() else {
            panic!("inputs must stay a list");
        };
        let YamlValue::Mapping(raw) = &inputs[0] else {
            panic!("tensors are mappings");
        };
        assert_eq!(yaml::get_str(raw, "id"), Some("raw"));
        let YamlValue::Mapping(test_tensor) = yaml::get(raw, "test_tensor").unwrap() else {
            panic!("test tensor became a file descriptor");
        };
        assert_eq!(yaml::get_str(test_tensor, "source"), Some("raw_test.npy"));

        let YamlValue::Sequence(axes) = yaml::get(raw, "axes").unwrap() else {
            panic!("axes must become a list");
        };
        assert_eq!(axes.len(), 4);
        let YamlValue::Mapping(batch) = &axes[0] else { panic!() };
        assert_eq!(yaml::get_str(batch, "type"), Some("batch"));
        let YamlValue::Mapping(channel) = &axes[1] else { panic!() };
        assert_eq!(yaml::get_str(channel, "type"), Some("channel"));
        assert!(yaml::get(channel, "channel_names").is_some());
        let YamlValue::Mapping(space_y) = &axes[2] else { panic!() };
        assert_eq!(yaml::get_str(space_y, "type"), Some("space"));
        assert_eq!(yaml::get_str(space_y, "id"), Some("y"));
        let YamlValue::Mapping(size) = yaml::get(space_y, "size").unwrap() else {
            panic!("parameterized size expected");
        };
        assert_eq!(yaml::get(size, "min").and_then(|v| v.as_i64()), Some(16));
        assert_eq!(yaml::get(size, "step").and_then(|v| v.as_i64()), Some(8));
    }

    #[test]
    fn test_architecture_string_conversion() {
        let mut data: Mapping = serde_yaml::from_str(indoc! {"
            format_version: 0.4.9
            type: model
            weights:
              pytorch_state_dict:
                source: weights.pt
                architecture: my_net.py:UNet
                architecture_sha256: 0123456789012345678901234567890123456789012345678901234567890123
                kwargs: {depth: 4}
        "})
        .unwrap();
        upgrade_model_to_0_5(&mut data);

        let YamlValue::Mapping(weights) = yaml::get(&data, "weights").unwrap() else { panic!() };
        let YamlValue::Mapping(entry) = yaml::get(weights, "pytorch_state_dict").unwrap() else { panic!() };
        let YamlValue::Mapping(architecture) = yaml::get(entry, "architecture").unwrap() else {
            panic!("architecture must become an object");
        };
        assert_eq!(yaml::get_str(architecture, "source"), Some("my_net.py"));
        assert_eq!(yaml::get_str(architecture, "callable"), Some("UNet"));
        assert!(yaml::get(architecture, "sha256").is_some());
        assert!(yaml::get(architecture, "kwargs").is_some());
        // the pytorch version default is filled in
        assert_eq!(yaml::get_str(entry, "pytorch_version"), Some("1.10"));
    }
}
