//! The registry of known schema versions per resource type.
//!
//! Read-only after process start: lookups never mutate. The schema is
//! selected by `(type, MAJOR.MINOR)`; patch versions never select.

use std::fmt::Display;

use crate::rdf::version::FormatVersion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum ResourceType {
    #[strum(serialize = "generic")]
    Generic,
    #[strum(serialize = "application")]
    Application,
    #[strum(serialize = "dataset")]
    Dataset,
    #[strum(serialize = "notebook")]
    Notebook,
    #[strum(serialize = "model")]
    Model,
    #[strum(serialize = "collection")]
    Collection,
}

impl ResourceType {
    /// Unknown types fall back to the generic schema.
    pub fn parse_with_fallback(raw: &str) -> (Self, bool) {
        match raw.parse::<Self>() {
            Ok(resource_type) => (resource_type, true),
            Err(_) => (Self::Generic, false),
        }
    }
}

/// One known schema version: the `(type, major.minor)` key plus the patch
/// level this implementation covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schema {
    pub resource_type: ResourceType,
    pub major: u32,
    pub minor: u32,
    pub implemented_patch: u32,
}

impl Schema {
    pub fn format_version(&self) -> FormatVersion {
        FormatVersion::new(self.major, self.minor, self.implemented_patch)
    }

    pub fn major_minor(&self) -> (u32, u32) {
        (self.major, self.minor)
    }

    pub fn is_latest(&self) -> bool {
        latest_for(self.resource_type).major_minor() == self.major_minor()
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.resource_type, self.format_version())
    }
}

const GENERIC_VERSIONS: &[(u32, u32, u32)] = &[(0, 2, 4), (0, 3, 0)];
const MODEL_VERSIONS: &[(u32, u32, u32)] = &[(0, 3, 6), (0, 4, 10), (0, 5, 3)];
const COLLECTION_VERSIONS: &[(u32, u32, u32)] = &[(0, 2, 4), (0, 3, 0)];

/// All known `(major, minor, implemented patch)` triples for a type.
pub fn known_versions(resource_type: ResourceType) -> &'static [(u32, u32, u32)] {
    match resource_type {
        ResourceType::Model => MODEL_VERSIONS,
        ResourceType::Collection => COLLECTION_VERSIONS,
        _ => GENERIC_VERSIONS,
    }
}

pub fn latest_for(resource_type: ResourceType) -> Schema {
    let (major, minor, implemented_patch) = *known_versions(resource_type)
        .last()
        .expect("every resource type has at least one known version");
    Schema {
        resource_type,
        major,
        minor,
        implemented_patch,
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaLookupError {
    #[error("Unsupported format version '{requested}' for type '{resource_type}'. Supported: {supported}")]
    UnknownVersion {
        resource_type: ResourceType,
        requested: String,
        supported: String,
    },
}

fn supported_list(resource_type: ResourceType) -> String {
    known_versions(resource_type)
        .iter()
        .map(|(major, minor, _)| format!("{major}.{minor}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a schema lookup; future versions select the latest schema but
/// are flagged so the caller can warn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaMatch {
    Exact(Schema),
    /// The requested patch is newer than the implemented one.
    FuturePatch(Schema),
    /// The requested major.minor is newer than anything known; the latest
    /// schema is used instead.
    FutureVersion(Schema),
}

impl SchemaMatch {
    pub fn schema(&self) -> Schema {
        match self {
            Self::Exact(schema) | Self::FuturePatch(schema) | Self::FutureVersion(schema) => *schema,
        }
    }
}

/// Look up the schema for a type and a concrete format version.
pub fn get_schema(resource_type: ResourceType, requested: &FormatVersion) -> Result<SchemaMatch, SchemaLookupError> {
    let versions = known_versions(resource_type);
    for (major, minor, implemented_patch) in versions.iter().copied() {
        if (major, minor) == requested.major_minor() {
            let schema = Schema {
                resource_type,
                major,
                minor,
                implemented_patch,
            };
            return Ok(if requested.patch > implemented_patch {
                SchemaMatch::FuturePatch(schema)
            } else {
                SchemaMatch::Exact(schema)
            });
        }
    }
    let latest = latest_for(resource_type);
    if requested.major_minor() > latest.major_minor() {
        return Ok(SchemaMatch::FutureVersion(latest));
    }
    Err(SchemaLookupError::UnknownVersion {
        resource_type,
        requested: requested.to_string(),
        supported: supported_list(resource_type),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lookup_rules() {
        let v053 = FormatVersion::new(0, 5, 3);
        assert!(matches!(get_schema(ResourceType::Model, &v053), Ok(SchemaMatch::Exact(_))));

        let v059 = FormatVersion::new(0, 5, 9);
        assert!(matches!(get_schema(ResourceType::Model, &v059), Ok(SchemaMatch::FuturePatch(_))));

        let future = FormatVersion::new(9999, 0, 0);
        match get_schema(ResourceType::Model, &future) {
            Ok(SchemaMatch::FutureVersion(schema)) => assert!(schema.is_latest()),
            other => panic!("expected future version match, got {other:?}"),
        }

        let ancient = FormatVersion::new(0, 1, 0);
        assert!(get_schema(ResourceType::Model, &ancient).is_err());
    }

    #[test]
    fn test_unknown_type_fallback() {
        let (resource_type, known) = ResourceType::parse_with_fallback("mystery");
        assert_eq!(resource_type, ResourceType::Generic);
        assert!(!known);
    }
}
