//! Environment configuration, read once per process from `BIOIMAGEIO_*`
//! variables (plus the conventional `CI`).

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const ENV_PREFIX: &str = "BIOIMAGEIO_";

#[derive(Clone, Debug)]
pub struct Settings {
    /// Directory of the content-addressed download cache.
    pub cache_path: PathBuf,
    /// Default for `ValidationContext.perform_io_checks`.
    pub perform_io_checks: bool,
    /// Timeout for http requests.
    pub http_timeout: Duration,
    pub user_agent: Option<String>,
    /// Truthy in continuous integration; downloads then announce themselves
    /// with a `ci` user agent.
    pub ci: bool,
    /// Passed through to the array decoder.
    pub allow_pickle: bool,
    /// Whether validation warnings are echoed to the log.
    pub log_warnings: bool,
    /// Whether `<id>/draft` resource ids are resolved.
    pub resolve_draft: bool,
    /// URL of the id map used to resolve bioimage.io ids to RDF urls.
    pub id_map: String,
    pub id_map_draft: String,
    /// Pattern mapping a bioimage.io id to its bioimageio.yaml URL.
    pub collection_http_pattern: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_path: dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("bioimageio"),
            perform_io_checks: true,
            http_timeout: Duration::from_secs(10),
            user_agent: None,
            ci: false,
            allow_pickle: false,
            log_warnings: true,
            resolve_draft: true,
            id_map: "https://uk1s3.embassy.ebi.ac.uk/public-datasets/bioimage.io/id_map.json".into(),
            id_map_draft: "https://uk1s3.embassy.ebi.ac.uk/public-datasets/bioimage.io/id_map_draft.json".into(),
            collection_http_pattern:
                "https://hypha.aicell.io/bioimage-io/artifacts/{bioimageio_id}/files/rdf.yaml".into(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok().filter(|v| !v.is_empty())
}

fn env_flag(name: &str, default: bool) -> bool {
    match env_var(name) {
        Some(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(path) = env_var("CACHE_PATH") {
            settings.cache_path = PathBuf::from(path);
        }
        settings.perform_io_checks = env_flag("PERFORM_IO_CHECKS", settings.perform_io_checks);
        if let Some(seconds) = env_var("HTTP_TIMEOUT").and_then(|v| v.parse::<f64>().ok()) {
            settings.http_timeout = Duration::from_secs_f64(seconds);
        }
        settings.user_agent = env_var("USER_AGENT");
        settings.ci = std::env::var("CI").map(|v| !v.is_empty() && v != "false").unwrap_or(false);
        settings.allow_pickle = env_flag("ALLOW_PICKLE", settings.allow_pickle);
        settings.log_warnings = env_flag("LOG_WARNINGS", settings.log_warnings);
        settings.resolve_draft = env_flag("RESOLVE_DRAFT", settings.resolve_draft);
        if let Some(id_map) = env_var("ID_MAP") {
            settings.id_map = id_map;
        }
        if let Some(id_map_draft) = env_var("ID_MAP_DRAFT") {
            settings.id_map_draft = id_map_draft;
        }
        if let Some(pattern) = env_var("COLLECTION_HTTP_PATTERN") {
            settings.collection_http_pattern = pattern;
        }
        settings
    }

    pub fn user_agent_header(&self) -> String {
        if self.ci {
            return "ci".into();
        }
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("bioimg_engine/{}", env!("CARGO_PKG_VERSION")))
    }

    /// The process-wide settings, read from the environment on first use.
    pub fn shared() -> Arc<Settings> {
        static SHARED: OnceLock<Arc<Settings>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Settings::from_env())).clone()
    }
}
