//! Opening bioimage.io RDF sources: bare YAML files, package folders, zip
//! archives and URLs, plus the façade entry points built on top.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bioimg_rdf::build::{build_description, FormatSelector, LoadedDescription};
use bioimg_rdf::rdf::file_reference::HttpUrl;
use bioimg_rdf::summary::{Status, ValidationSummary};
use bioimg_rdf::yaml::YamlValue;
use bioimg_rdf::{Root, Severity, ValidationContext};

use crate::settings::Settings;
use crate::source::{FileSourceResolver, ResolverRoot, ZipPackage, ZipPackageError};

pub const BIOIMAGEIO_YAML: &str = "bioimageio.yaml";
pub const LEGACY_RDF_NAMES: &[&str] = &["rdf.yaml", "model.yaml"];

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Error reading '{source_name}': {error}")]
    Io {
        source_name: String,
        error: std::io::Error,
    },
    #[error("Could not parse yaml of '{source_name}': {error}")]
    Yaml {
        source_name: String,
        error: serde_yaml::Error,
    },
    #[error(transparent)]
    ZipPackage(#[from] ZipPackageError),
    #[error("No bioimageio.yaml (or legacy rdf.yaml/model.yaml) found in {0}")]
    RdfNotFound(String),
    #[error("Could not fetch '{source_name}': {reason}")]
    Http { source_name: String, reason: String },
    #[error("Invalid resource description: {0}")]
    InvalidDescription(String),
}

/// Pick the RDF entry among a package's file names.
pub fn identify_bioimageio_yaml_file_name(file_names: &[String]) -> Option<String> {
    file_names
        .iter()
        .find(|name| *name == BIOIMAGEIO_YAML || name.ends_with(".bioimageio.yaml"))
        .or_else(|| {
            file_names
                .iter()
                .find(|name| LEGACY_RDF_NAMES.contains(&name.as_str()))
        })
        .cloned()
}

/// An opened RDF: its raw content plus the context to validate it in.
pub struct OpenedRdf {
    pub content: YamlValue,
    pub ctx: ValidationContext,
    pub resolver_root: ResolverRoot,
}

#[derive(Clone, Debug)]
pub struct LoadOptions {
    pub format_version: FormatSelector,
    /// Overrides the settings default when set.
    pub perform_io_checks: Option<bool>,
    pub warning_level: Severity,
    pub update_hashes: bool,
    pub raise_errors: bool,
    pub disable_cache: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format_version: FormatSelector::Discover,
            perform_io_checks: None,
            warning_level: Severity::Error,
            update_hashes: false,
            raise_errors: false,
            disable_cache: false,
        }
    }
}

fn parse_yaml(bytes: &[u8], source_name: &str) -> Result<YamlValue, LoadError> {
    serde_yaml::from_slice(bytes).map_err(|error| LoadError::Yaml {
        source_name: source_name.to_owned(),
        error,
    })
}

/// Split a URL into the root its relative paths resolve against and the RDF
/// file name, handling the Zenodo `.../<file>/content` layout.
fn split_url(url: &HttpUrl) -> (Option<HttpUrl>, String) {
    let url_str = url.to_string();
    let trimmed = if url_str.contains("zenodo.org/api/records/") && url_str.ends_with("/content") {
        url_str.trim_end_matches("/content").trim_end_matches('/')
    } else {
        url_str.trim_end_matches('/')
    };
    match trimmed.rsplit_once('/') {
        Some((parent, file_name)) if parent.contains("//") => (
            HttpUrl::try_from(parent.to_owned()).ok(),
            file_name.to_owned(),
        ),
        _ => (None, "rdf.yaml".into()),
    }
}

fn open_zip(package: ZipPackage, original_name: &str) -> Result<OpenedRdf, LoadError> {
    let Some(rdf_name) = identify_bioimageio_yaml_file_name(package.entry_names()) else {
        return Err(LoadError::RdfNotFound(original_name.to_owned()));
    };
    let bytes = package
        .read_entry(&rdf_name)
        .map_err(|_| LoadError::RdfNotFound(original_name.to_owned()))?;
    let content = parse_yaml(&bytes, &format!("{original_name}:{rdf_name}"))?;

    let root_path = package.path().map(Path::to_owned).unwrap_or_else(|| PathBuf::from(original_name));
    let ctx = ValidationContext {
        root: Root::Archive(root_path),
        file_name: Some(rdf_name),
        ..ValidationContext::default()
    };
    Ok(OpenedRdf {
        content,
        ctx,
        resolver_root: ResolverRoot::Zip(Arc::new(package)),
    })
}

/// Open a bioimage.io resource: a local YAML file, a package folder, a zip
/// package, or a URL to either.
pub fn open_bioimageio_yaml(source: &str, settings: Arc<Settings>) -> Result<OpenedRdf, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let url = HttpUrl::try_from(source.to_owned()).map_err(|e| LoadError::Http {
            source_name: source.to_owned(),
            reason: e.to_string(),
        })?;
        let fetcher = FileSourceResolver::new(ResolverRoot::InMemory, settings);
        let ctx = ValidationContext::default();
        let bytes = fetcher
            .read_bytes(&ctx, &url.clone().into())
            .map_err(|e| LoadError::Http {
                source_name: source.to_owned(),
                reason: e.to_string(),
            })?;
        if bytes.starts_with(ZIP_MAGIC) {
            let package = ZipPackage::from_fetched_bytes(bytes, source)?;
            return open_zip(package, source);
        }
        let content = parse_yaml(&bytes, source)?;
        let (parent, file_name) = split_url(&url);
        let (root, resolver_root) = match parent {
            Some(parent) => (Root::Url(parent.clone()), ResolverRoot::Url(parent)),
            None => (Root::InMemory, ResolverRoot::InMemory),
        };
        let ctx = ValidationContext {
            root,
            file_name: Some(file_name),
            original_source_name: Some(source.to_owned()),
            ..ValidationContext::default()
        };
        return Ok(OpenedRdf {
            content,
            ctx,
            resolver_root,
        });
    }

    let path = Path::new(source);
    if path.is_dir() {
        // a package folder: find the RDF among its entries
        let mut names: Vec<String> = std::fs::read_dir(path)
            .map_err(|error| LoadError::Io {
                source_name: source.to_owned(),
                error,
            })?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        let Some(rdf_name) = identify_bioimageio_yaml_file_name(&names) else {
            return Err(LoadError::RdfNotFound(source.to_owned()));
        };
        return open_local_yaml(&path.join(rdf_name));
    }

    let bytes = std::fs::read(path).map_err(|error| LoadError::Io {
        source_name: source.to_owned(),
        error,
    })?;
    if bytes.starts_with(ZIP_MAGIC) {
        let package = ZipPackage::open(path)?;
        return open_zip(package, source);
    }
    let content = parse_yaml(&bytes, source)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_owned();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rdf.yaml".to_owned());
    let ctx = ValidationContext {
        root: Root::Dir(dir.clone()),
        file_name: Some(file_name),
        ..ValidationContext::default()
    };
    Ok(OpenedRdf {
        content,
        ctx,
        resolver_root: ResolverRoot::Dir(dir),
    })
}

fn open_local_yaml(path: &Path) -> Result<OpenedRdf, LoadError> {
    let source_name = path.to_string_lossy().into_owned();
    let bytes = std::fs::read(path).map_err(|error| LoadError::Io {
        source_name: source_name.clone(),
        error,
    })?;
    let content = parse_yaml(&bytes, &source_name)?;
    let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_owned();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rdf.yaml".to_owned());
    Ok(OpenedRdf {
        content,
        ctx: ValidationContext {
            root: Root::Dir(dir.clone()),
            file_name: Some(file_name),
            ..ValidationContext::default()
        },
        resolver_root: ResolverRoot::Dir(dir),
    })
}

/// Derive the full validation context for an opened RDF.
pub fn context_for(opened: &OpenedRdf, options: &LoadOptions, settings: Arc<Settings>) -> ValidationContext {
    let resolver = FileSourceResolver::new(opened.resolver_root.clone(), settings.clone());
    ValidationContext {
        perform_io_checks: options.perform_io_checks.unwrap_or(settings.perform_io_checks),
        warning_level: options.warning_level,
        update_hashes: options.update_hashes,
        raise_errors: options.raise_errors,
        disable_cache: options.disable_cache,
        log_warnings: settings.log_warnings,
        source_checker: Some(resolver.into_checker()),
        ..opened.ctx.clone()
    }
}

/// Load and validate a bioimage.io resource description.
pub fn load_description(source: &str, options: &LoadOptions) -> Result<LoadedDescription, LoadError> {
    let settings = Settings::shared();
    let opened = open_bioimageio_yaml(source, settings.clone())?;
    let ctx = context_for(&opened, options, settings);
    let loaded = build_description(&opened.content, &ctx, options.format_version.clone());
    if ctx.raise_errors && loaded.summary.status == Status::Failed {
        let first = loaded
            .summary
            .errors()
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "validation failed".to_owned());
        return Err(LoadError::InvalidDescription(first));
    }
    Ok(loaded)
}

/// Validate a source and return the summary only.
pub fn validate_format(source: &str, options: &LoadOptions) -> Result<ValidationSummary, LoadError> {
    Ok(load_description(source, options)?.summary)
}

/// Load a resource, upgrading it to the latest format version; optionally
/// write the updated YAML out.
pub fn update_format(
    source: &str,
    output: Option<&Path>,
    options: &LoadOptions,
) -> Result<LoadedDescription, LoadError> {
    let options = LoadOptions {
        format_version: FormatSelector::Latest,
        ..options.clone()
    };
    let loaded = load_description(source, &options)?;
    if let (Some(descr), Some(output)) = (&loaded.description, output) {
        write_yaml_file(&descr.to_content(), output)?;
    }
    Ok(loaded)
}

/// Recompute every `FileDescr.sha256` from the referenced bytes.
pub fn update_hashes(source: &str, options: &LoadOptions) -> Result<LoadedDescription, LoadError> {
    let options = LoadOptions {
        format_version: FormatSelector::Latest,
        perform_io_checks: Some(true),
        update_hashes: true,
        ..options.clone()
    };
    load_description(source, &options)
}

pub fn write_yaml_file(content: &bioimg_rdf::yaml::Mapping, path: &Path) -> Result<(), LoadError> {
    let file = std::fs::File::create(path).map_err(|error| LoadError::Io {
        source_name: path.to_string_lossy().into_owned(),
        error,
    })?;
    serde_yaml::to_writer(file, content).map_err(|error| LoadError::Yaml {
        source_name: path.to_string_lossy().into_owned(),
        error,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_identify_rdf_file_name() {
        let names = vec!["weights.pt".to_owned(), "my_model.bioimageio.yaml".to_owned()];
        assert_eq!(
            identify_bioimageio_yaml_file_name(&names),
            Some("my_model.bioimageio.yaml".to_owned())
        );

        let legacy = vec!["rdf.yaml".to_owned(), "weights.pt".to_owned()];
        assert_eq!(identify_bioimageio_yaml_file_name(&legacy), Some("rdf.yaml".to_owned()));

        let none = vec!["weights.pt".to_owned()];
        assert_eq!(identify_bioimageio_yaml_file_name(&none), None);
    }

    #[test]
    fn test_split_url() {
        let url = HttpUrl::try_from("https://example.com/models/unet/rdf.yaml").unwrap();
        let (parent, file_name) = split_url(&url);
        assert_eq!(parent.unwrap().to_string(), "https://example.com/models/unet");
        assert_eq!(file_name, "rdf.yaml");

        let zenodo = HttpUrl::try_from("https://zenodo.org/api/records/1/files/rdf.yaml/content").unwrap();
        let (parent, file_name) = split_url(&zenodo);
        assert_eq!(parent.unwrap().to_string(), "https://zenodo.org/api/records/1/files");
        assert_eq!(file_name, "rdf.yaml");
    }
}
