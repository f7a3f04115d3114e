//! Resolution of file sources against a context root, with fetching, on-disk
//! caching and streaming hash computation.
//!
//! This is the concrete [`SourceChecker`] the schema layer talks to; the
//! on-disk cache is content-addressed by URL digest and therefore safe to
//! share between concurrent validations.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sha2::Digest;

use bioimg_rdf::rdf::file_description::Sha256;
use bioimg_rdf::rdf::file_reference::{FileReference, HttpUrl};
use bioimg_rdf::yaml::YamlValue;
use bioimg_rdf::{ArraySummary, IoCheckError, SourceChecker, ValidationContext};

use crate::settings::Settings;

#[derive(thiserror::Error, Debug)]
pub enum ZipPackageError {
    #[error("Could not read zip package: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

enum ZipReader {
    File(zip::ZipArchive<std::fs::File>),
    Memory(zip::ZipArchive<Cursor<Vec<u8>>>),
}

/// An opened zip package, on disk or fetched into memory.
///
/// The entry names are snapshotted at open time (the resolver and the RDF
/// lookup only ever need the listing plus whole-entry reads); the seeking
/// reader itself sits behind a mutex.
pub struct ZipPackage {
    shown_name: String,
    path: Option<PathBuf>,
    entry_names: Vec<String>,
    reader: Mutex<ZipReader>,
}

impl std::fmt::Debug for ZipPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ZipPackage({})", self.shown_name)
    }
}

impl ZipPackage {
    pub fn open(path: &Path) -> Result<Self, ZipPackageError> {
        let archive = zip::ZipArchive::new(std::fs::File::open(path)?)?;
        Ok(Self {
            shown_name: path.to_string_lossy().into_owned(),
            path: Some(path.to_owned()),
            entry_names: archive.file_names().map(str::to_owned).collect(),
            reader: Mutex::new(ZipReader::File(archive)),
        })
    }

    /// Wrap bytes fetched from a remote package.
    pub fn from_fetched_bytes(bytes: Vec<u8>, shown_name: impl Into<String>) -> Result<Self, ZipPackageError> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self {
            shown_name: shown_name.into(),
            path: None,
            entry_names: archive.file_names().map(str::to_owned).collect(),
            reader: Mutex::new(ZipReader::Memory(archive)),
        })
    }

    pub fn shown_name(&self) -> &str {
        &self.shown_name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entry_names(&self) -> &[String] {
        &self.entry_names
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.entry_names.iter().any(|entry| entry == name)
    }

    pub fn read_entry(&self, name: &str) -> Result<Vec<u8>, ZipPackageError> {
        let mut reader = self.reader.lock().map_err(|_| zip::result::ZipError::FileNotFound)?;
        let mut bytes = Vec::new();
        match &mut *reader {
            ZipReader::File(archive) => {
                let _ = archive.by_name(name)?.read_to_end(&mut bytes)?;
            }
            ZipReader::Memory(archive) => {
                let _ = archive.by_name(name)?.read_to_end(&mut bytes)?;
            }
        }
        Ok(bytes)
    }
}

/// The base files are resolved against.
#[derive(Clone, Debug)]
pub enum ResolverRoot {
    Dir(PathBuf),
    Url(HttpUrl),
    Zip(Arc<ZipPackage>),
    InMemory,
}

/// A source resolved to something that can actually be opened.
#[derive(Clone, Debug)]
pub enum ResolvedSource {
    Local(PathBuf),
    Remote(HttpUrl),
    ZipEntry { package: Arc<ZipPackage>, name: String },
}

impl std::fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.to_string_lossy()),
            Self::Remote(url) => write!(f, "{url}"),
            Self::ZipEntry { package, name } => write!(f, "{}:{name}", package.shown_name()),
        }
    }
}

pub struct FileSourceResolver {
    root: ResolverRoot,
    settings: Arc<Settings>,
}

impl FileSourceResolver {
    pub fn new(root: ResolverRoot, settings: Arc<Settings>) -> Self {
        Self { root, settings }
    }

    pub fn into_checker(self) -> Arc<dyn SourceChecker> {
        Arc::new(self)
    }

    pub fn resolve(&self, source: &FileReference) -> Result<ResolvedSource, IoCheckError> {
        match source {
            FileReference::Url(url) => Ok(ResolvedSource::Remote(url.clone())),
            FileReference::AbsolutePath(path) => Ok(ResolvedSource::Local(path.clone())),
            FileReference::Path(relative) => match &self.root {
                ResolverRoot::Dir(dir) => Ok(ResolvedSource::Local(dir.join(relative.as_str()))),
                ResolverRoot::Url(base) => {
                    let joined = join_url_root(base, relative.as_str()).map_err(|reason| IoCheckError::Fetch {
                        source_name: relative.to_string(),
                        reason,
                    })?;
                    Ok(ResolvedSource::Remote(joined))
                }
                ResolverRoot::Zip(package) => Ok(ResolvedSource::ZipEntry {
                    package: package.clone(),
                    name: relative.as_str().to_owned(),
                }),
                ResolverRoot::InMemory => Err(IoCheckError::NoRoot {
                    path: relative.to_string(),
                }),
            },
        }
    }

    fn agent(&self) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(self.settings.http_timeout)
            .user_agent(&self.settings.user_agent_header())
            .build()
    }

    fn cache_file_for(&self, url: &HttpUrl) -> PathBuf {
        let digest = sha2::Sha256::digest(url.to_string().as_bytes());
        let mut name = String::with_capacity(64);
        for byte in digest {
            name.push_str(&format!("{byte:02x}"));
        }
        self.settings.cache_path.join(name)
    }

    fn fetch_remote(&self, url: &HttpUrl, disable_cache: bool) -> Result<Vec<u8>, IoCheckError> {
        let cache_file = self.cache_file_for(url);
        if !disable_cache {
            if let Ok(cached) = std::fs::read(&cache_file) {
                tracing::debug!("cache hit for {url}");
                return Ok(cached);
            }
        }

        tracing::debug!("fetching {url}");
        let response = self.agent().get(&url.to_string()).call().map_err(|e| IoCheckError::Fetch {
            source_name: url.to_string(),
            reason: e.to_string(),
        })?;
        let mut bytes = Vec::new();
        let _ = response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| IoCheckError::Fetch {
                source_name: url.to_string(),
                reason: e.to_string(),
            })?;

        if !disable_cache {
            if std::fs::create_dir_all(&self.settings.cache_path).is_ok() {
                if let Err(err) = std::fs::write(&cache_file, &bytes) {
                    tracing::warn!("could not cache {url}: {err}");
                }
            }
        }
        Ok(bytes)
    }

    pub fn read_bytes(&self, ctx: &ValidationContext, source: &FileReference) -> Result<Vec<u8>, IoCheckError> {
        match self.resolve(source)? {
            ResolvedSource::Local(path) => std::fs::read(&path).map_err(|_| IoCheckError::NotFound {
                source_name: path.to_string_lossy().into_owned(),
            }),
            ResolvedSource::Remote(url) => self.fetch_remote(&url, ctx.disable_cache),
            ResolvedSource::ZipEntry { package, name } => {
                package.read_entry(&name).map_err(|_| IoCheckError::NotFound {
                    source_name: format!("{}:{name}", package.shown_name()),
                })
            }
        }
    }
}

fn sha256_hex(digest: sha2::digest::Output<sha2::Sha256>) -> Sha256 {
    let mut hex = String::with_capacity(64);
    for byte in digest {
        hex.push_str(&format!("{byte:02x}"));
    }
    Sha256::try_from(hex).expect("a hex digest is a valid sha256")
}

pub fn sha256_of_bytes(bytes: &[u8]) -> Sha256 {
    sha256_hex(sha2::Sha256::digest(bytes))
}

impl SourceChecker for FileSourceResolver {
    fn fetch_sha256(&self, ctx: &ValidationContext, source: &FileReference) -> Result<Sha256, IoCheckError> {
        match self.resolve(source)? {
            ResolvedSource::Local(path) => {
                let file = std::fs::File::open(&path).map_err(|_| IoCheckError::NotFound {
                    source_name: path.to_string_lossy().into_owned(),
                })?;
                let mut hasher = sha2::Sha256::new();
                let mut reader = std::io::BufReader::new(file);
                std::io::copy(&mut reader, &mut hasher).map_err(|e| IoCheckError::Fetch {
                    source_name: path.to_string_lossy().into_owned(),
                    reason: e.to_string(),
                })?;
                Ok(sha256_hex(hasher.finalize()))
            }
            _ => {
                let bytes = self.read_bytes(ctx, source)?;
                Ok(sha256_of_bytes(&bytes))
            }
        }
    }

    fn exists(&self, ctx: &ValidationContext, source: &FileReference) -> Result<(), IoCheckError> {
        match self.resolve(source)? {
            ResolvedSource::Local(path) => {
                if path.exists() {
                    Ok(())
                } else {
                    Err(IoCheckError::NotFound {
                        source_name: path.to_string_lossy().into_owned(),
                    })
                }
            }
            ResolvedSource::Remote(url) => {
                let _ = ctx;
                self.agent()
                    .head(&url.to_string())
                    .call()
                    .map_err(|e| IoCheckError::Fetch {
                        source_name: url.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(())
            }
            ResolvedSource::ZipEntry { package, name } => {
                if package.has_entry(&name) {
                    Ok(())
                } else {
                    Err(IoCheckError::NotFound {
                        source_name: format!("{}:{name}", package.shown_name()),
                    })
                }
            }
        }
    }

    fn read_text(&self, ctx: &ValidationContext, source: &FileReference) -> Result<String, IoCheckError> {
        let bytes = self.read_bytes(ctx, source)?;
        String::from_utf8(bytes).map_err(|e| IoCheckError::Decode {
            source_name: source.to_string(),
            reason: e.to_string(),
        })
    }

    fn read_array(&self, ctx: &ValidationContext, source: &FileReference) -> Result<ArraySummary, IoCheckError> {
        let bytes = self.read_bytes(ctx, source)?;
        crate::npy::read_array_summary(&bytes).map_err(|e| IoCheckError::Decode {
            source_name: source.to_string(),
            reason: e.to_string(),
        })
    }

    fn read_yaml(&self, ctx: &ValidationContext, source: &FileReference) -> Result<YamlValue, IoCheckError> {
        let bytes = self.read_bytes(ctx, source)?;
        serde_yaml::from_slice(&bytes).map_err(|e| IoCheckError::Decode {
            source_name: source.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Resolve a relative path against a URL root. The Zenodo API layout stores
/// record files behind a trailing `/content` segment, so the joined path has
/// to end up in front of it.
fn join_url_root(base: &HttpUrl, relative: &str) -> Result<HttpUrl, String> {
    let base_str = base.to_string();
    if base_str.contains("zenodo.org/api/records/") && base_str.contains("/files") {
        let trimmed = base_str.trim_end_matches('/');
        let rejoined = format!("{trimmed}/{relative}/content");
        return HttpUrl::try_from(rejoined).map_err(|e| e.to_string());
    }
    base.joined(relative).map_err(|e| e.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sha256_of_bytes() {
        let sha = sha256_of_bytes(b"hello world");
        assert_eq!(
            sha.as_str(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_zenodo_url_layout() {
        let base = HttpUrl::try_from("https://zenodo.org/api/records/123/files").unwrap();
        let joined = join_url_root(&base, "weights.pt").unwrap();
        assert_eq!(
            joined.to_string(),
            "https://zenodo.org/api/records/123/files/weights.pt/content"
        );
    }

    #[test]
    fn test_plain_url_join() {
        let base = HttpUrl::try_from("https://example.com/models/unet").unwrap();
        let joined = join_url_root(&base, "weights.pt").unwrap();
        assert_eq!(joined.to_string(), "https://example.com/models/unet/weights.pt");
    }
}
