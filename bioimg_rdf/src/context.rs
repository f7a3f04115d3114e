//! The validation context threaded through every check.
//!
//! There are no static mutable singletons; each validation run owns (or
//! shares) exactly one context. I/O dependent checks go through the narrow
//! [`SourceChecker`] interface so that the schema layer stays free of any
//! network, hashing or codec concerns.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::rdf::file_description::Sha256;
use crate::rdf::file_reference::{FileReference, HttpUrl};
use crate::validation::Severity;
use crate::yaml::YamlValue;

/// Base against which relative file paths are resolved.
#[derive(Clone, Debug, Default)]
pub enum Root {
    Dir(PathBuf),
    Url(HttpUrl),
    /// A zip package; resolution happens inside the installed [`SourceChecker`].
    Archive(PathBuf),
    #[default]
    InMemory,
}

impl Root {
    pub fn source_name(&self, file_name: Option<&str>) -> String {
        let file_name = file_name.unwrap_or("in-memory");
        match self {
            Root::Dir(dir) => dir.join(file_name).to_string_lossy().into_owned(),
            Root::Url(url) => {
                let base = url.to_string();
                format!("{}/{}", base.trim_end_matches('/'), file_name)
            }
            Root::Archive(path) => format!("{}:{}", path.to_string_lossy(), file_name),
            Root::InMemory => file_name.to_owned(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum IoCheckError {
    #[error("File not found: {source_name}")]
    NotFound { source_name: String },
    #[error("Could not fetch {source_name}: {reason}")]
    Fetch { source_name: String, reason: String },
    #[error("Could not decode {source_name}: {reason}")]
    Decode { source_name: String, reason: String },
    #[error("Relative path '{path}' cannot be resolved without a root")]
    NoRoot { path: String },
}

/// What the external array codec reports about a decoded test tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct ArraySummary {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub min: f64,
    pub max: f64,
}

/// Narrow interface to the file fetcher, hasher and array codec.
///
/// Implementations resolve a [`FileReference`] against the context root
/// (directory, URL or zip archive) and perform the actual I/O.
pub trait SourceChecker: Send + Sync {
    /// Verify existence and return the SHA-256 of the referenced bytes,
    /// streaming and caching as the implementation sees fit.
    fn fetch_sha256(&self, ctx: &ValidationContext, source: &FileReference) -> Result<Sha256, IoCheckError>;

    /// Existence check only (HEAD for URLs); timeouts demote to warnings at
    /// the call sites.
    fn exists(&self, ctx: &ValidationContext, source: &FileReference) -> Result<(), IoCheckError>;

    fn read_text(&self, ctx: &ValidationContext, source: &FileReference) -> Result<String, IoCheckError>;

    fn read_array(&self, ctx: &ValidationContext, source: &FileReference) -> Result<ArraySummary, IoCheckError>;

    fn read_yaml(&self, ctx: &ValidationContext, source: &FileReference) -> Result<YamlValue, IoCheckError>;
}

#[derive(Clone)]
pub struct ValidationContext {
    pub root: Root,
    /// Logical RDF file name, used for diagnostics.
    pub file_name: Option<String>,
    pub original_source_name: Option<String>,
    pub perform_io_checks: bool,
    /// Warnings with a severity at or above this level are treated as errors.
    pub warning_level: Severity,
    /// Cache of already fetched sources and their hashes, shared between
    /// nested contexts.
    pub known_files: Arc<Mutex<BTreeMap<String, Option<Sha256>>>>,
    /// Overwrite declared hashes with computed ones instead of comparing.
    pub update_hashes: bool,
    /// Bail out with the first error instead of aggregating (debugging aid).
    pub raise_errors: bool,
    pub disable_cache: bool,
    pub log_warnings: bool,
    pub source_checker: Option<Arc<dyn SourceChecker>>,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            root: Root::InMemory,
            file_name: None,
            original_source_name: None,
            perform_io_checks: false,
            warning_level: Severity::Error,
            known_files: Arc::new(Mutex::new(BTreeMap::new())),
            update_hashes: false,
            raise_errors: false,
            disable_cache: false,
            log_warnings: true,
            source_checker: None,
        }
    }
}

impl ValidationContext {
    pub fn with_root(root: Root) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    pub fn with_warning_level(&self, warning_level: Severity) -> Self {
        Self {
            warning_level,
            ..self.clone()
        }
    }

    pub fn source_name(&self) -> String {
        if let Some(original) = &self.original_source_name {
            return original.clone();
        }
        self.root.source_name(self.file_name.as_deref())
    }

    pub fn known_sha(&self, source: &FileReference) -> Option<Option<Sha256>> {
        self.known_files.lock().ok()?.get(&source.to_string()).cloned()
    }

    pub fn remember_sha(&self, source: &FileReference, sha: Option<Sha256>) {
        if let Ok(mut known) = self.known_files.lock() {
            let _ = known.insert(source.to_string(), sha);
        }
    }
}
