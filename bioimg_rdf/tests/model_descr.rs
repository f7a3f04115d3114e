use std::collections::BTreeMap;

use indoc::indoc;

use bioimg_rdf::build::{build_description, AnyDescription, FormatSelector};
use bioimg_rdf::rdf::model::{AxisId, OutputSize, ShapeError, TensorId};
use bioimg_rdf::yaml::YamlValue;
use bioimg_rdf::{Status, ValidationContext};

fn build_model(yaml: &str) -> (Option<AnyDescription>, bioimg_rdf::ValidationSummary) {
    let content: YamlValue = serde_yaml::from_str(yaml).unwrap();
    let ctx = ValidationContext::default();
    let loaded = build_description(&content, &ctx, FormatSelector::Discover);
    (loaded.description, loaded.summary)
}

fn two_tensor_model() -> &'static str {
    indoc! {"
        format_version: 0.5.3
        type: model
        name: parameterized unet
        description: a model with one parameterized spatial axis
        authors:
          - {name: Jane Doe}
        cite:
          - {text: the paper, doi: 10.1234/5678}
        license: MIT
        timestamp: '2024-03-01T12:00:00+00:00'
        inputs:
          - id: x
            axes:
              - {type: batch}
              - {type: channel, channel_names: [raw]}
              - {type: space, id: w, size: {min: 16, step: 8}}
            test_tensor: {source: x_test.npy}
        outputs:
          - id: y
            axes:
              - {type: batch}
              - {type: channel, channel_names: [prediction]}
              - {type: space, id: w, size: {tensor_id: x, axis_id: w, offset: -2}}
            test_tensor: {source: y_test.npy}
        weights:
          pytorch_state_dict:
            source: weights.pt
            architecture: {import_from: mynet.models, callable: Net}
            pytorch_version: '1.13'
    "}
}

fn input_sizes(entries: &[(&str, &[(&str, usize)])]) -> BTreeMap<TensorId, BTreeMap<AxisId, usize>> {
    entries
        .iter()
        .map(|(tensor, axes)| {
            (
                TensorId::try_from(*tensor).unwrap(),
                axes.iter()
                    .map(|(axis, size)| (AxisId::try_from(*axis).unwrap(), *size))
                    .collect(),
            )
        })
        .collect()
}

#[test]
fn test_valid_model_passes() {
    let (descr, summary) = build_model(two_tensor_model());
    assert_eq!(summary.status, Status::Passed, "{summary}");
    assert!(matches!(descr, Some(AnyDescription::Model(_))));
}

#[test]
fn test_parameterized_input_to_output_via_size_reference() {
    let (descr, _) = build_model(two_tensor_model());
    let Some(AnyDescription::Model(model)) = descr else {
        panic!("expected a model description");
    };

    // x.w = 32 = 16 + 2*8, so y.w = 32 * 1/1 - 2 = 30
    let sizes = model
        .get_output_tensor_sizes(&input_sizes(&[("x", &[("batch", 4), ("channel", 1), ("w", 32)])]))
        .unwrap();
    let y = &sizes[&TensorId::try_from("y").unwrap()];
    assert_eq!(y[&AxisId::try_from("w").unwrap()], OutputSize::Fixed(30));
    assert_eq!(y[&AxisId::try_from("batch").unwrap()], OutputSize::Fixed(4));
    assert_eq!(y[&AxisId::try_from("channel").unwrap()], OutputSize::Fixed(1));
}

#[test]
fn test_batch_size_inference_and_mismatch() {
    let yaml = indoc! {"
        format_version: 0.5.3
        type: model
        name: two input model
        description: batch sizes must agree across all tensors
        authors:
          - {name: Jane Doe}
        cite:
          - {text: the paper, url: 'https://example.com/paper'}
        license: MIT
        timestamp: '2024-03-01T12:00:00+00:00'
        inputs:
          - id: a
            axes:
              - {type: batch}
              - {type: space, id: x, size: 8}
          - id: b
            axes:
              - {type: batch}
              - {type: space, id: x, size: 8}
        outputs:
          - id: out
            axes:
              - {type: batch}
              - {type: space, id: x, size: {tensor_id: a, axis_id: x}}
        weights:
          onnx: {source: weights.onnx, opset_version: 15}
    "};
    let (descr, summary) = build_model(yaml);
    assert_eq!(summary.status, Status::Passed, "{summary}");
    let Some(AnyDescription::Model(model)) = descr else {
        panic!("expected a model description");
    };

    let sizes = model
        .get_output_tensor_sizes(&input_sizes(&[
            ("a", &[("batch", 4), ("x", 8)]),
            ("b", &[("batch", 4), ("x", 8)]),
        ]))
        .unwrap();
    let out = &sizes[&TensorId::try_from("out").unwrap()];
    assert_eq!(out[&AxisId::try_from("batch").unwrap()], OutputSize::Fixed(4));

    let mismatch = model.get_output_tensor_sizes(&input_sizes(&[
        ("a", &[("batch", 4), ("x", 8)]),
        ("b", &[("batch", 2), ("x", 8)]),
    ]));
    assert!(matches!(mismatch, Err(ShapeError::InconsistentBatchSize { .. })));
}

#[test]
fn test_halo_too_large_for_minimum_size() {
    let yaml = indoc! {"
        format_version: 0.5.3
        type: model
        name: halo check model
        description: a halo of 3 needs a minimum size of at least 7
        authors:
          - {name: Jane Doe}
        cite:
          - {text: the paper, url: 'https://example.com/paper'}
        license: MIT
        timestamp: '2024-03-01T12:00:00+00:00'
        inputs:
          - id: x
            axes:
              - {type: space, id: w, size: 4}
        outputs:
          - id: y
            axes:
              - {type: space, id: w, halo: 3, size: {tensor_id: x, axis_id: w}}
        weights:
          onnx: {source: weights.onnx, opset_version: 15}
    "};
    let (_, summary) = build_model(yaml);
    assert_eq!(summary.status, Status::Failed);
    assert!(summary.errors().any(|e| e.kind == "value_error.halo"), "{summary}");

    // with a large enough minimum resolved size the same halo passes
    let passing = yaml.replace("size: 4", "size: 10");
    let (_, summary) = build_model(&passing);
    assert_eq!(summary.status, Status::Passed, "{summary}");
}

#[test]
fn test_size_reference_must_point_at_independent_axis() {
    let yaml = indoc! {"
        format_version: 0.5.3
        type: model
        name: broken reference model
        description: a reference to a missing axis fails
        authors:
          - {name: Jane Doe}
        cite:
          - {text: the paper, url: 'https://example.com/paper'}
        license: MIT
        timestamp: '2024-03-01T12:00:00+00:00'
        inputs:
          - id: x
            axes:
              - {type: space, id: w, size: 8}
        outputs:
          - id: y
            axes:
              - {type: space, id: w, size: {tensor_id: x, axis_id: h}}
        weights:
          onnx: {source: weights.onnx, opset_version: 15}
    "};
    let (_, summary) = build_model(yaml);
    assert_eq!(summary.status, Status::Failed);
    let reference_errors: Vec<_> = summary.errors().filter(|e| e.kind == "value_error.size_reference").collect();
    assert_eq!(reference_errors.len(), 1);
    assert_eq!(
        bioimg_rdf::summary::format_loc(&reference_errors[0].loc),
        "outputs.0.axes.0.size"
    );
}

#[test]
fn test_duplicate_tensor_ids_rejected() {
    let yaml = indoc! {"
        format_version: 0.5.3
        type: model
        name: duplicate ids model
        description: input and output may not share an id
        authors:
          - {name: Jane Doe}
        cite:
          - {text: the paper, url: 'https://example.com/paper'}
        license: MIT
        timestamp: '2024-03-01T12:00:00+00:00'
        inputs:
          - id: data
            axes:
              - {type: space, id: w, size: 8}
        outputs:
          - id: data
            axes:
              - {type: space, id: w, size: {tensor_id: data, axis_id: w}}
        weights:
          onnx: {source: weights.onnx, opset_version: 15}
    "};
    let (_, summary) = build_model(yaml);
    assert_eq!(summary.status, Status::Failed);
    assert!(summary.errors().any(|e| e.kind == "value_error.tensor_ids"));
}

#[test]
fn test_preprocessing_axes_must_be_tensor_axes() {
    let yaml = indoc! {"
        format_version: 0.5.3
        type: model
        name: preprocessing check
        description: kwargs axes must be a subset of the tensor axes
        authors:
          - {name: Jane Doe}
        cite:
          - {text: the paper, url: 'https://example.com/paper'}
        license: MIT
        timestamp: '2024-03-01T12:00:00+00:00'
        inputs:
          - id: x
            axes:
              - {type: space, id: w, size: 8}
            preprocessing:
              - id: zero_mean_unit_variance
                kwargs: {axes: [h]}
        outputs:
          - id: y
            axes:
              - {type: space, id: w, size: {tensor_id: x, axis_id: w}}
        weights:
          onnx: {source: weights.onnx, opset_version: 15}
    "};
    let (_, summary) = build_model(yaml);
    assert_eq!(summary.status, Status::Failed);
    assert!(summary.errors().any(|e| e.kind == "value_error.axes"));
}

#[test]
fn test_ensure_dtype_is_auto_inserted() {
    let (descr, _) = build_model(two_tensor_model());
    let Some(AnyDescription::Model(model)) = descr else {
        panic!("expected a model description");
    };
    let input = model.inputs.first();
    assert!(!input.preprocessing.is_empty());
    use bioimg_rdf::rdf::model::PreprocessingDescr;
    assert!(matches!(input.preprocessing.first(), Some(PreprocessingDescr::EnsureDtype(_))));
    assert!(matches!(input.preprocessing.last(), Some(PreprocessingDescr::EnsureDtype(_))));
    let output = model.outputs.first();
    use bioimg_rdf::rdf::model::PostprocessingDescr;
    assert!(matches!(output.postprocessing.last(), Some(PostprocessingDescr::EnsureDtype(_))));
}

#[test]
fn test_model_0_4_is_upgraded_when_loading_latest() {
    let yaml = indoc! {"
        format_version: 0.4.9
        type: model
        name: legacy model
        description: still in the 0.4 format
        authors: [Jane Doe]
        cite:
          - {text: the paper, doi: 10.1234/5678}
        license: MIT
        timestamp: '2024-03-01T12:00:00+00:00'
        inputs:
          - name: raw
            axes: bcyx
            data_type: float32
            shape: [1, 1, 64, 64]
        outputs:
          - name: mask
            axes: bcyx
            data_type: float32
            shape:
              reference_tensor: raw
              scale: [1, 1, 1, 1]
              offset: [0, 0, 0, 0]
        test_inputs: [raw_test.npy]
        test_outputs: [mask_test.npy]
        weights:
          torchscript: {source: weights.pt}
    "};
    let content: YamlValue = serde_yaml::from_str(yaml).unwrap();
    let ctx = ValidationContext::default();
    let loaded = build_description(&content, &ctx, FormatSelector::Latest);
    assert_eq!(loaded.summary.status, Status::Passed, "{}", loaded.summary);
    let Some(AnyDescription::Model(model)) = loaded.description else {
        panic!("expected an upgraded model, got {:?}", loaded.summary.status);
    };
    assert_eq!(model.base.format_version.to_string(), "0.5.3");
    assert_eq!(model.inputs.first().id.as_str(), "raw");
    // the torchscript entry got its default pytorch version
    assert!(model.weights.torchscript.is_some());
}
