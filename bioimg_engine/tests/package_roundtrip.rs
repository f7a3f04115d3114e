use std::path::Path;

use indoc::indoc;
use ndarray_npy::WriteNpyExt;

use bioimg_engine::{
    load_description, save_bioimageio_package, save_bioimageio_package_as_folder, LoadOptions, PackageOptions,
};
use bioimg_rdf::yaml;
use bioimg_rdf::Status;

fn write_npy(path: &Path, shape: (usize, usize, usize)) {
    let array = ndarray::Array3::<f32>::from_shape_fn(shape, |(_, _, x)| x as f32 + 1.0);
    let file = std::fs::File::create(path).unwrap();
    array.write_npy(file).unwrap();
}

fn model_rdf() -> &'static str {
    indoc! {"
        format_version: 0.5.3
        type: model
        name: packaged model
        description: a small but complete model for packaging tests
        authors:
          - {name: Jane Doe}
        cite:
          - {text: the paper, doi: 10.1234/5678}
        license: MIT
        timestamp: '2024-03-01T12:00:00+00:00'
        attachments:
          - {source: sub/data.npy}
          - {source: other/data.npy}
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
          onnx:
            source: weights.onnx
            opset_version: 15
    "}
}

fn setup_model_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::write(root.join("rdf.yaml"), model_rdf()).unwrap();
    std::fs::write(root.join("weights.onnx"), b"not really onnx but enough for hashing").unwrap();
    write_npy(&root.join("x_test.npy"), (1, 1, 16));
    write_npy(&root.join("y_test.npy"), (1, 1, 14));

    // two attachments sharing a base name but not their content
    std::fs::create_dir_all(root.join("sub")).unwrap();
    std::fs::create_dir_all(root.join("other")).unwrap();
    write_npy(&root.join("sub/data.npy"), (1, 1, 4));
    write_npy(&root.join("other/data.npy"), (1, 1, 5));

    dir
}

#[test]
fn test_load_description_from_folder() {
    let dir = setup_model_dir();
    let loaded = load_description(&dir.path().to_string_lossy(), &LoadOptions::default()).unwrap();
    assert_eq!(loaded.summary.status, Status::Passed, "{}", loaded.summary);
    let descr = loaded.description.unwrap();
    assert_eq!(descr.resource_type(), "model");
    // the hashes of all referenced files were computed and stored
    let model = descr.as_model().unwrap();
    assert!(model.weights.onnx.as_ref().unwrap().base.file.sha256.is_some());
    assert!(model.inputs.first().test_tensor.as_ref().unwrap().sha256.is_some());
}

#[test]
fn test_package_as_folder_resolves_name_clash() {
    let dir = setup_model_dir();
    let out = tempfile::tempdir().unwrap();
    let output = save_bioimageio_package_as_folder(
        &dir.path().to_string_lossy(),
        Some(&out.path().join("pkg")),
        &PackageOptions::default(),
    )
    .unwrap();

    for expected in ["weights.onnx", "x_test.npy", "y_test.npy", "data.npy", "data_2.npy"] {
        assert!(output.join(expected).is_file(), "missing {expected}");
    }
    let rdf_path = output.join("packaged_model.model.bioimageio.yaml");
    assert!(rdf_path.is_file());

    // the serialized sources point at the local names now
    let rdf: yaml::Mapping = serde_yaml::from_slice(&std::fs::read(&rdf_path).unwrap()).unwrap();
    let yaml::YamlValue::Sequence(attachments) = yaml::get(&rdf, "attachments").unwrap() else {
        panic!("attachments must be a list");
    };
    let sources: Vec<&str> = attachments
        .iter()
        .filter_map(|a| a.as_mapping())
        .filter_map(|a| yaml::get_str(a, "source"))
        .collect();
    assert_eq!(sources, vec!["data.npy", "data_2.npy"]);

    // the packaged folder is itself a loadable description
    let reloaded = load_description(&output.to_string_lossy(), &LoadOptions::default()).unwrap();
    assert_eq!(reloaded.summary.status, Status::Passed, "{}", reloaded.summary);
}

#[test]
fn test_package_as_zip_revalidates() {
    let dir = setup_model_dir();
    let out = tempfile::tempdir().unwrap();
    let zip_path = out.path().join("model.zip");
    let written = save_bioimageio_package(
        &dir.path().to_string_lossy(),
        Some(&zip_path),
        &PackageOptions::default(),
    )
    .unwrap();
    assert_eq!(written, zip_path);

    let loaded = load_description(&zip_path.to_string_lossy(), &LoadOptions::default()).unwrap();
    assert_eq!(loaded.summary.status, Status::Passed, "{}", loaded.summary);
    assert_eq!(loaded.description.unwrap().resource_type(), "model");
}

#[test]
fn test_packaging_is_deterministic() {
    let dir = setup_model_dir();
    let out = tempfile::tempdir().unwrap();

    let first = save_bioimageio_package_as_folder(
        &dir.path().to_string_lossy(),
        Some(&out.path().join("a")),
        &PackageOptions::default(),
    )
    .unwrap();
    let second = save_bioimageio_package_as_folder(
        &dir.path().to_string_lossy(),
        Some(&out.path().join("b")),
        &PackageOptions::default(),
    )
    .unwrap();

    let list = |path: &Path| -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(path)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    };
    assert_eq!(list(&first), list(&second));
}

fn legacy_model_rdf() -> &'static str {
    indoc! {"
        format_version: 0.4.9
        type: model
        name: legacy packaged model
        description: still in the 0.4 format
        authors:
          - {name: Jane Doe}
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
    "}
}

fn setup_legacy_model_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::write(root.join("rdf.yaml"), legacy_model_rdf()).unwrap();
    std::fs::write(root.join("weights.pt"), b"torchscript bytes").unwrap();
    for name in ["raw_test.npy", "mask_test.npy"] {
        let array = ndarray::Array4::<f32>::from_shape_fn((1, 1, 64, 64), |(_, _, y, x)| (y + x) as f32);
        let file = std::fs::File::create(root.join(name)).unwrap();
        array.write_npy(file).unwrap();
    }
    dir
}

#[test]
fn test_packaging_legacy_format_requires_update() {
    let dir = setup_legacy_model_dir();
    let out = tempfile::tempdir().unwrap();

    // packaging at the declared 0.4 format is refused
    let declared = save_bioimageio_package_as_folder(
        &dir.path().to_string_lossy(),
        Some(&out.path().join("declared")),
        &PackageOptions::default(),
    );
    assert!(declared.is_err());

    // upgrading while packaging works
    let upgraded = save_bioimageio_package_as_folder(
        &dir.path().to_string_lossy(),
        Some(&out.path().join("upgraded")),
        &PackageOptions {
            format_selector: bioimg_rdf::build::FormatSelector::Latest,
            ..PackageOptions::default()
        },
    )
    .unwrap();
    for expected in ["weights.pt", "raw_test.npy", "mask_test.npy"] {
        assert!(upgraded.join(expected).is_file(), "missing {expected}");
    }
    let rdf: yaml::Mapping =
        serde_yaml::from_slice(&std::fs::read(upgraded.join("legacy_packaged_model.model.bioimageio.yaml")).unwrap())
            .unwrap();
    assert_eq!(yaml::get_str(&rdf, "format_version"), Some("0.5.3"));
}

#[test]
fn test_weights_priority_order_must_match() {
    let dir = setup_model_dir();
    let out = tempfile::tempdir().unwrap();
    let result = save_bioimageio_package(
        &dir.path().to_string_lossy(),
        Some(&out.path().join("filtered.zip")),
        &PackageOptions {
            weights_priority_order: vec![bioimg_rdf::rdf::model::WeightsFormat::Torchscript],
            ..PackageOptions::default()
        },
    );
    assert!(result.is_err(), "torchscript weights are not present");
}
