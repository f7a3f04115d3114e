//! Building a typed resource description out of raw YAML content.
//!
//! Validation always runs twice: once at the caller's warning level to
//! produce the tree and the hard errors, and once at the `info` level to
//! gather the complete list of warnings without double-reporting.

use std::fmt::Display;

use crate::context::ValidationContext;
use crate::rdf::collection::CollectionDescr;
use crate::rdf::generic::{ApplicationDescr, DatasetDescr, GenericDescr, NotebookDescr};
use crate::rdf::legacy::LegacyDescr;
use crate::rdf::model::ModelDescr;
use crate::rdf::version::FormatVersion;
use crate::registry::{get_schema, latest_for, ResourceType, Schema, SchemaMatch};
use crate::summary::{ErrorEntry, Status, ValidationDetail, ValidationSummary, WarningEntry};
use crate::upgrade::upgrade_to_latest;
use crate::validation::{Severity, Validator};
use crate::yaml::{self, Mapping, YamlValue};

/// Any of the implemented resource descriptions.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum AnyDescription {
    Model(ModelDescr),
    Application(ApplicationDescr),
    Dataset(DatasetDescr),
    Notebook(NotebookDescr),
    Collection(CollectionDescr),
    Generic(GenericDescr),
    /// Validated shallowly at an older declared format version.
    Legacy(LegacyDescr),
}

impl AnyDescription {
    pub fn resource_type(&self) -> String {
        match self {
            Self::Model(_) => "model".into(),
            Self::Application(_) => "application".into(),
            Self::Dataset(_) => "dataset".into(),
            Self::Notebook(_) => "notebook".into(),
            Self::Collection(_) => "collection".into(),
            Self::Generic(descr) => descr.resource_type.clone(),
            Self::Legacy(descr) => descr.resource_type.clone(),
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            Self::Model(descr) => Some(descr.base.name.to_string()),
            Self::Application(descr) => Some(descr.base.name.to_string()),
            Self::Dataset(descr) => Some(descr.base.name.to_string()),
            Self::Notebook(descr) => Some(descr.base.name.to_string()),
            Self::Collection(descr) => Some(descr.base.name.to_string()),
            Self::Generic(descr) => Some(descr.base.name.to_string()),
            Self::Legacy(descr) => yaml::get_str(&descr.content, "name").map(str::to_owned),
        }
    }

    pub fn id(&self) -> Option<String> {
        let base = match self {
            Self::Model(descr) => &descr.base,
            Self::Application(descr) => &descr.base,
            Self::Dataset(descr) => &descr.base,
            Self::Notebook(descr) => &descr.base,
            Self::Collection(descr) => &descr.base,
            Self::Generic(descr) => &descr.base,
            Self::Legacy(descr) => return yaml::get_str(&descr.content, "id").map(str::to_owned),
        };
        base.id.as_ref().map(|id| id.to_string())
    }

    pub fn format_version(&self) -> FormatVersion {
        match self {
            Self::Model(descr) => descr.base.format_version.clone(),
            Self::Application(descr) => descr.base.format_version.clone(),
            Self::Dataset(descr) => descr.base.format_version.clone(),
            Self::Notebook(descr) => descr.base.format_version.clone(),
            Self::Collection(descr) => descr.base.format_version.clone(),
            Self::Generic(descr) => descr.base.format_version.clone(),
            Self::Legacy(descr) => descr.format_version.clone(),
        }
    }

    pub fn as_model(&self) -> Option<&ModelDescr> {
        match self {
            Self::Model(descr) => Some(descr),
            _ => None,
        }
    }

    /// Serialize back to plain YAML content.
    pub fn to_content(&self) -> Mapping {
        match serde_yaml::to_value(self) {
            Ok(YamlValue::Mapping(map)) => map,
            _ => Mapping::new(),
        }
    }
}

impl Display for AnyDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.resource_type(),
            self.name().unwrap_or_else(|| "<unnamed>".into())
        )
    }
}

/// Which format version to validate against.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum FormatSelector {
    /// Validate at whatever format version the data declares.
    #[default]
    Discover,
    /// Upgrade to the latest known format version before validating.
    Latest,
    /// Validate at a specific `MAJOR.MINOR` version.
    Exact(FormatVersion),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid format version selector '{found}'")]
pub struct SelectorParsingError {
    found: String,
}

impl std::str::FromStr for FormatSelector {
    type Err = SelectorParsingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_lowercase().as_str() {
            "discover" => Ok(Self::Discover),
            "latest" => Ok(Self::Latest),
            exact => FormatVersion::try_from(exact)
                .map(Self::Exact)
                .map_err(|_| SelectorParsingError { found: raw.to_owned() }),
        }
    }
}

/// The outcome of `build_description`: the typed tree (if validation
/// passed), the full summary, and the (possibly upgraded) content.
#[derive(Clone, Debug)]
pub struct LoadedDescription {
    pub description: Option<AnyDescription>,
    pub summary: ValidationSummary,
    pub content: Mapping,
}

impl LoadedDescription {
    pub fn is_valid(&self) -> bool {
        self.description.is_some() && self.summary.status != Status::Failed
    }
}

/// Build a bioimage.io resource description from raw RDF content.
pub fn build_description(
    content: &YamlValue,
    ctx: &ValidationContext,
    format_version: FormatSelector,
) -> LoadedDescription {
    let mut summary = ValidationSummary::new(ctx.source_name(), "unknown", "unknown");

    let map = match content {
        YamlValue::Mapping(map) => map.clone(),
        other => {
            summary.add_detail(ValidationDetail::new(
                "extract fields to choose the description schema",
                vec![ErrorEntry::new(
                    vec![],
                    "type_error.map",
                    format!("Invalid content of type '{}'", yaml::kind_of(other)),
                )],
                vec![],
            ));
            return LoadedDescription {
                description: None,
                summary,
                content: Mapping::new(),
            };
        }
    };

    // the two fields that select the schema must be present and strings
    let mut missing_errors = Vec::new();
    for minimum in ["type", "format_version"] {
        match yaml::get(&map, minimum) {
            None => missing_errors.push(ErrorEntry::new(
                vec![minimum.into()],
                "missing",
                format!("Missing field '{minimum}'"),
            )),
            Some(YamlValue::String(_)) => {}
            Some(other) => missing_errors.push(ErrorEntry::new(
                vec![minimum.into()],
                "type_error.str",
                format!("Expected string, found {}", yaml::kind_of(other)),
            )),
        }
    }
    if !missing_errors.is_empty() {
        summary.add_detail(ValidationDetail::new(
            "extract fields to choose the description schema",
            missing_errors,
            vec![],
        ));
        return LoadedDescription {
            description: None,
            summary,
            content: map,
        };
    }

    let type_str = yaml::get_str(&map, "type").expect("checked above").to_owned();
    let version_str = yaml::get_str(&map, "format_version").expect("checked above").to_owned();
    summary.resource_type = type_str.clone();
    summary.format_version = version_str.clone();

    let (resource_type, type_known) = ResourceType::parse_with_fallback(&type_str);

    let declared = match FormatVersion::try_from(version_str.as_str()) {
        Ok(version) => version,
        Err(err) => {
            summary.add_detail(ValidationDetail::new(
                "extract fields to choose the description schema",
                vec![ErrorEntry::new(
                    vec!["format_version".into()],
                    "value_error.format_version",
                    err.to_string(),
                )],
                vec![],
            ));
            return LoadedDescription {
                description: None,
                summary,
                content: map,
            };
        }
    };

    let type_warning = (!type_known).then(|| format!("Unknown resource type '{type_str}', treating it as 'generic'"));

    let discover = run_validation(
        &map,
        ctx,
        resource_type,
        type_warning.as_deref(),
        &declared,
        None,
        &mut summary,
    );

    let requested_schema = match &format_version {
        FormatSelector::Discover => None,
        FormatSelector::Latest => Some(latest_for(resource_type)),
        FormatSelector::Exact(requested) => match get_schema(resource_type, requested) {
            Ok(found) => Some(found.schema()),
            Err(err) => {
                summary.add_detail(ValidationDetail::new(
                    format!("look up schema {resource_type} {requested}"),
                    vec![ErrorEntry::new(
                        vec!["format_version".into()],
                        "value_error.format_version",
                        err.to_string(),
                    )],
                    vec![],
                ));
                return LoadedDescription {
                    description: None,
                    summary,
                    content: map,
                };
            }
        },
    };

    match requested_schema {
        Some(requested) if Some(requested.major_minor()) != discover.validated_major_minor => {
            let requested_result = run_validation(
                &map,
                ctx,
                resource_type,
                type_warning.as_deref(),
                &declared,
                Some(requested),
                &mut summary,
            );
            LoadedDescription {
                description: requested_result.description,
                summary,
                content: requested_result.content,
            }
        }
        _ => LoadedDescription {
            description: discover.description,
            summary,
            content: discover.content,
        },
    }
}

struct ValidationRun {
    description: Option<AnyDescription>,
    content: Mapping,
    validated_major_minor: Option<(u32, u32)>,
}

fn emit_preamble(cx: &mut Validator, type_warning: Option<&str>, version_warning: Option<&(Severity, String)>) {
    if let Some(msg) = type_warning {
        cx.with("type", |cx| cx.warn(Severity::Warning, msg.to_owned()));
    }
    if let Some((severity, msg)) = version_warning {
        cx.with("format_version", |cx| cx.warn(*severity, msg.clone()));
    }
}

#[allow(clippy::too_many_arguments)]
fn run_validation(
    map: &Mapping,
    ctx: &ValidationContext,
    resource_type: ResourceType,
    type_warning: Option<&str>,
    declared: &FormatVersion,
    requested: Option<Schema>,
    summary: &mut ValidationSummary,
) -> ValidationRun {
    // select the target schema: the declared one in discover mode, the
    // explicitly requested one otherwise
    let (schema, version_warning) = match requested {
        Some(schema) => (schema, None),
        None => match get_schema(resource_type, declared) {
            Ok(SchemaMatch::Exact(schema)) => (schema, None),
            Ok(SchemaMatch::FuturePatch(schema)) => (
                schema,
                Some((
                    Severity::Warning,
                    format!(
                        "future patch version {declared} treated as {}",
                        schema.format_version()
                    ),
                )),
            ),
            Ok(SchemaMatch::FutureVersion(schema)) => (
                schema,
                Some((
                    Severity::Alert,
                    format!(
                        "future format_version '{declared}' treated as '{}'",
                        schema.format_version()
                    ),
                )),
            ),
            Err(err) => {
                summary.add_detail(ValidationDetail::new(
                    format!("look up schema for {resource_type} {declared}"),
                    vec![ErrorEntry::new(
                        vec!["format_version".into()],
                        "value_error.format_version",
                        err.to_string(),
                    )],
                    vec![],
                ));
                return ValidationRun {
                    description: None,
                    content: map.clone(),
                    validated_major_minor: None,
                };
            }
        },
    };

    // upgrade a copy when targeting the latest schema from older data
    let mut content = map.clone();
    if schema.is_latest() && declared.major_minor() < schema.major_minor() {
        upgrade_to_latest(&mut content, resource_type);
    }

    // first pass: the caller's warning level decides which severities fail
    let mut first = Validator::new(ctx);
    emit_preamble(&mut first, type_warning, version_warning.as_ref());
    let description = validate_with_schema(&content, schema, &mut first);
    let (first_errors, _below_level) = first.into_diagnostics();
    let (mut errors, raised): (Vec<ErrorEntry>, Vec<ErrorEntry>) =
        first_errors.into_iter().partition(|e| e.kind != "warning");
    if errors.is_empty() && !raised.is_empty() {
        errors.push(ErrorEntry::new(
            vec![],
            "severe_warnings",
            format!(
                "Encountered {} warnings at or above warning level '{}'",
                raised.len(),
                ctx.warning_level
            ),
        ));
    }

    // second pass: gather every would-be warning without touching the tree
    let warnings: Vec<WarningEntry> = if ctx.warning_level > Severity::Info {
        let info_ctx = ctx.with_warning_level(Severity::Info);
        let mut second = Validator::new(&info_ctx);
        emit_preamble(&mut second, type_warning, version_warning.as_ref());
        let _ = validate_with_schema(&content, schema, &mut second);
        let (second_errors, second_warnings) = second.into_diagnostics();
        second_errors
            .into_iter()
            .filter(|e| e.kind == "warning")
            .map(ErrorEntry::into_warning)
            .chain(second_warnings)
            .collect()
    } else {
        Vec::new()
    };

    let failed = !errors.is_empty();
    summary.add_detail(ValidationDetail::new(
        format!("validate format as {resource_type} {}", schema.format_version()),
        errors,
        warnings,
    ));
    summary.format_version = schema.format_version().to_string();

    let description = if failed { None } else { description };
    if let Some(descr) = &description {
        summary.id = descr.id();
        if let Some(name) = descr.name() {
            summary.name = name;
        }
    }

    ValidationRun {
        description,
        content,
        validated_major_minor: Some(schema.major_minor()),
    }
}

fn validate_with_schema(content: &Mapping, schema: Schema, cx: &mut Validator) -> Option<AnyDescription> {
    if !schema.is_latest() {
        return LegacyDescr::validate_content(content, schema, cx).map(AnyDescription::Legacy);
    }
    match schema.resource_type {
        ResourceType::Model => ModelDescr::validate_content(content, cx).map(AnyDescription::Model),
        ResourceType::Application => ApplicationDescr::validate_content(content, cx).map(AnyDescription::Application),
        ResourceType::Dataset => DatasetDescr::validate_content(content, cx).map(AnyDescription::Dataset),
        ResourceType::Notebook => NotebookDescr::validate_content(content, cx).map(AnyDescription::Notebook),
        ResourceType::Collection => CollectionDescr::validate_content(content, cx).map(AnyDescription::Collection),
        ResourceType::Generic => GenericDescr::validate_content(content, cx).map(AnyDescription::Generic),
    }
}

/// Validate one collection entry (already merged) at the latest format of its
/// declared type, recording diagnostics into the surrounding validator.
pub(crate) fn validate_entry_content(entry: &Mapping, cx: &mut Validator) -> Option<AnyDescription> {
    let type_str = yaml::get_str(entry, "type").unwrap_or("generic");
    let (resource_type, type_known) = ResourceType::parse_with_fallback(type_str);
    if !type_known {
        cx.with("type", |cx| {
            cx.warn(
                Severity::Warning,
                format!("Unknown resource type '{type_str}', treating it as 'generic'"),
            );
        });
    }
    let mut content = entry.clone();
    upgrade_to_latest(&mut content, resource_type);
    validate_with_schema(&content, latest_for(resource_type), cx)
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    fn minimal_dataset() -> YamlValue {
        serde_yaml::from_str(indoc! {"
            format_version: 0.3.0
            type: dataset
            name: cells in bright field
            description: a handful of annotated images
            authors:
              - {name: Jane Doe}
            cite:
              - {text: the paper, doi: 10.1234/5678}
            license: MIT
        "})
        .unwrap()
    }

    #[test]
    fn test_build_valid_dataset() {
        let ctx = ValidationContext::default();
        let loaded = build_description(&minimal_dataset(), &ctx, FormatSelector::Discover);
        assert_eq!(loaded.summary.status, Status::Passed, "{}", loaded.summary);
        assert!(matches!(loaded.description, Some(AnyDescription::Dataset(_))));
    }

    #[test]
    fn test_deprecated_license_gives_valid_format() {
        let mut content = minimal_dataset();
        if let YamlValue::Mapping(map) = &mut content {
            yaml::insert(map, "license", YamlValue::String("BSD-2-Clause-FreeBSD".into()));
        }
        let ctx = ValidationContext::default();
        let loaded = build_description(&content, &ctx, FormatSelector::Discover);
        assert_eq!(loaded.summary.status, Status::ValidFormat);
        let warnings: Vec<_> = loaded.summary.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(crate::summary::format_loc(&warnings[0].loc), "license");
    }

    #[test]
    fn test_missing_type_and_format_version() {
        let content: YamlValue = serde_yaml::from_str("{name: nameless}").unwrap();
        let ctx = ValidationContext::default();
        let loaded = build_description(&content, &ctx, FormatSelector::Discover);
        assert_eq!(loaded.summary.status, Status::Failed);
        let kinds: Vec<_> = loaded.summary.errors().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["missing", "missing"]);
    }

    #[test]
    fn test_future_format_version_is_valid_format() {
        let mut content = minimal_dataset();
        if let YamlValue::Mapping(map) = &mut content {
            yaml::insert(map, "format_version", YamlValue::String("9999.0.0".into()));
        }
        let ctx = ValidationContext::default();
        let loaded = build_description(&content, &ctx, FormatSelector::Discover);
        assert_eq!(loaded.summary.status, Status::ValidFormat, "{}", loaded.summary);
        let warnings: Vec<_> = loaded.summary.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(crate::summary::format_loc(&warnings[0].loc), "format_version");
    }

    #[test]
    fn test_raised_warning_becomes_severe_warnings_error() {
        let mut content = minimal_dataset();
        if let YamlValue::Mapping(map) = &mut content {
            yaml::insert(map, "license", YamlValue::String("BSD-2-Clause-FreeBSD".into()));
        }
        let mut ctx = ValidationContext::default();
        ctx.warning_level = Severity::Warning;
        let loaded = build_description(&content, &ctx, FormatSelector::Discover);
        assert_eq!(loaded.summary.status, Status::Failed);
        let kinds: Vec<_> = loaded.summary.errors().map(|e| e.kind.as_str()).collect();
        assert!(kinds.contains(&"severe_warnings"));
        // the deprecated license still shows up exactly once, as a warning
        assert_eq!(loaded.summary.warnings().count(), 1);
    }
}
