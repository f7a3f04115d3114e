use std::collections::BTreeMap;
use std::fmt::Display;

use crate::build::AnyDescription;
use crate::validation::{Severity, Validator};
use crate::yaml::{self, Mapping, YamlValue};
use crate::declare_type_marker;

use super::file_reference::FileReference;
use super::generic::{GenericBase, NamePolicy, ENVELOPE_FIELDS};
use super::identifier::ResourceId;
use super::non_empty_list::NonEmptyList;

declare_type_marker!(CollectionTypeMarker, "collection");

/// One entry of a collection.
///
/// An entry description starts from the collection's own fields, is
/// overwritten by the content of `entry_source` (if set) and finally by any
/// fields given in place. Fields are overwritten entirely, not merged. The
/// final entry id is `<collection_id>/<entry_id>`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CollectionEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_source: Option<FileReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    /// in-place field overrides, kept as-is for serialization
    #[serde(flatten)]
    pub update: Mapping,
    /// the fully merged and validated entry description
    #[serde(skip)]
    pub descr: Option<Box<AnyDescription>>,
    /// `<collection_id>/<entry_id>`
    #[serde(skip)]
    pub final_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct CollectionDescr {
    #[serde(rename = "type")]
    pub marker: CollectionTypeMarker,
    #[serde(flatten)]
    pub base: GenericBase,
    pub collection: NonEmptyList<CollectionEntry>,
}

impl Display for CollectionDescr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "collection '{}' ({} entries)", self.base.name, self.collection.len())
    }
}

impl CollectionDescr {
    pub fn validate_content(map: &Mapping, cx: &mut Validator) -> Option<Self> {
        let mut known: Vec<&str> = ENVELOPE_FIELDS.to_vec();
        known.push("collection");
        cx.forbid_unknown(map, &known);

        let base = GenericBase::validate_fields(map, cx, NamePolicy::Generic);

        let Some(raw_entries) = yaml::get(map, "collection") else {
            cx.with("collection", |cx| cx.error("missing", "Field 'collection' is required"));
            return None;
        };
        let YamlValue::Sequence(raw_entries) = raw_entries else {
            cx.with("collection", |cx| cx.type_error("list", raw_entries));
            return None;
        };
        if raw_entries.is_empty() {
            cx.with("collection", |cx| {
                cx.error("value_error.min_length", "At least one entry is required")
            });
            return None;
        }

        // the fields every entry inherits (everything but id and the entries)
        let mut common: Mapping = map.clone();
        let _ = yaml::remove(&mut common, "id");
        let _ = yaml::remove(&mut common, "collection");
        let _ = yaml::remove(&mut common, "badges");
        let collection_id = yaml::get_str(map, "id").map(str::to_owned);

        let mut entries: Vec<CollectionEntry> = Vec::with_capacity(raw_entries.len());
        let mut seen_entry_ids: BTreeMap<String, usize> = BTreeMap::new();

        cx.with("collection", |cx| {
            for (idx, raw_entry) in raw_entries.iter().enumerate() {
                cx.with(idx, |cx| {
                    let YamlValue::Mapping(entry_map) = raw_entry else {
                        cx.type_error("map", raw_entry);
                        return;
                    };
                    let entry_source: Option<FileReference> = cx.optional(entry_map, "entry_source");
                    let entry_id: Option<ResourceId> = cx.optional(entry_map, "id");

                    let mut update = entry_map.clone();
                    let _ = yaml::remove(&mut update, "entry_source");

                    let mut entry_data = common.clone();
                    if let Some(source) = &entry_source {
                        if !cx.ctx.perform_io_checks {
                            cx.warn(
                                Severity::Warning,
                                format!("Skipping IO relying validation of entry source {source}"),
                            );
                            entries.push(CollectionEntry {
                                entry_source,
                                id: entry_id,
                                update,
                                descr: None,
                                final_id: None,
                            });
                            return;
                        }
                        let Some(checker) = cx.ctx.source_checker.clone() else {
                            return;
                        };
                        match checker.read_yaml(cx.ctx, source) {
                            Ok(YamlValue::Mapping(external)) => {
                                for (key, value) in external.into_iter() {
                                    let _ = entry_data.insert(key, value);
                                }
                            }
                            Ok(other) => {
                                cx.with("entry_source", |cx| cx.type_error("map", &other));
                                return;
                            }
                            Err(err) => {
                                cx.with("entry_source", |cx| cx.io_error(err.to_string()));
                                return;
                            }
                        }
                    }

                    for (key, value) in update.iter() {
                        let _ = entry_data.insert(key.clone(), value.clone());
                    }
                    if let Some(id) = &entry_id {
                        yaml::insert(&mut entry_data, "id", YamlValue::String(id.as_str().to_owned()));
                    }

                    let Some(sub_id) = yaml::get_str(&entry_data, "id").map(str::to_owned) else {
                        cx.error("missing", "Missing `id` for collection entry");
                        return;
                    };
                    if let Some(previous) = seen_entry_ids.insert(sub_id.clone(), idx) {
                        cx.error(
                            "value_error.collection",
                            format!("Duplicate entry id '{sub_id}' (also used by entry {previous})"),
                        );
                        return;
                    }

                    let final_id = match &collection_id {
                        Some(base_id) => format!("{base_id}/{sub_id}"),
                        None => sub_id.clone(),
                    };
                    yaml::insert(&mut entry_data, "id", YamlValue::String(final_id.clone()));

                    // collections cannot be nested
                    if yaml::get_str(&entry_data, "type") == Some("collection") {
                        cx.error("value_error.collection", "Collections may not be nested");
                        return;
                    }

                    let descr = crate::build::validate_entry_content(&entry_data, cx);
                    entries.push(CollectionEntry {
                        entry_source,
                        id: entry_id,
                        update,
                        descr: descr.map(Box::new),
                        final_id: Some(final_id),
                    });
                });
            }
        });

        let collection = NonEmptyList::try_from(entries).ok();
        Some(Self {
            marker: CollectionTypeMarker,
            base: base?,
            collection: collection?,
        })
    }
}
