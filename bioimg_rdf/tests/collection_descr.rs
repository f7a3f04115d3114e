use indoc::indoc;

use bioimg_rdf::build::{build_description, AnyDescription, FormatSelector};
use bioimg_rdf::yaml::YamlValue;
use bioimg_rdf::{Status, ValidationContext};

fn build(yaml: &str) -> (Option<AnyDescription>, bioimg_rdf::ValidationSummary) {
    let content: YamlValue = serde_yaml::from_str(yaml).unwrap();
    let ctx = ValidationContext::default();
    let loaded = build_description(&content, &ctx, FormatSelector::Discover);
    (loaded.description, loaded.summary)
}

fn collection_yaml() -> &'static str {
    indoc! {"
        format_version: 0.3.0
        type: collection
        name: my resources
        description: a collection of related datasets
        id: my-lab
        authors:
          - {name: Jane Doe}
        cite:
          - {text: the paper, doi: 10.1234/5678}
        license: MIT
        collection:
          - id: cells
            type: dataset
            name: cells dataset
            description: cells
          - id: nuclei
            type: dataset
            name: nuclei dataset
            description: nuclei
    "}
}

#[test]
fn test_entries_inherit_collection_fields() {
    let (descr, summary) = build(collection_yaml());
    assert_eq!(summary.status, Status::Passed, "{summary}");
    let Some(AnyDescription::Collection(collection)) = descr else {
        panic!("expected a collection description");
    };
    assert_eq!(collection.collection.len(), 2);

    let first = collection.collection.first();
    assert_eq!(first.final_id.as_deref(), Some("my-lab/cells"));
    let entry = first.descr.as_ref().expect("entry description was built");
    // authors/cite/license were inherited from the collection root
    let AnyDescription::Dataset(dataset) = entry.as_ref() else {
        panic!("expected a dataset entry");
    };
    assert_eq!(dataset.base.name.to_string(), "cells dataset");
    assert_eq!(dataset.base.license.as_str(), "MIT");
    assert_eq!(dataset.base.authors.first().name.to_string(), "Jane Doe");
}

#[test]
fn test_duplicate_entry_ids_rejected() {
    let yaml = collection_yaml().replace("id: nuclei", "id: cells");
    let (_, summary) = build(&yaml);
    assert_eq!(summary.status, Status::Failed);
    assert!(summary.errors().any(|e| e.kind == "value_error.collection"), "{summary}");
}

#[test]
fn test_nested_collections_rejected() {
    let yaml = collection_yaml().replace("type: dataset", "type: collection");
    let (_, summary) = build(&yaml);
    assert_eq!(summary.status, Status::Failed);
    assert!(summary
        .errors()
        .any(|e| e.msg.contains("Collections may not be nested")));
}

#[test]
fn test_entry_without_id_rejected() {
    let yaml = collection_yaml().replace("id: cells", "note: cells");
    let (_, summary) = build(&yaml);
    assert_eq!(summary.status, Status::Failed);
    assert!(summary
        .errors()
        .any(|e| e.kind == "missing" && e.msg.contains("collection entry")), "{summary}");
}
