//! Configuration management.
//!
//! Settings come from defaults, then an optional TOML file, then
//! `PAPERCUT_*` environment variables (`__` separates sections).
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! sherpa_romeo = "your-api-key"
//!
//! [endpoints]
//! arxiv_api = "https://export.arxiv.org/api/query"
//! arxiv_oai = "https://export.arxiv.org/oai2"
//! arxiv_taxonomy = "https://arxiv.org/category_taxonomy"
//! doi = "https://dx.doi.org"
//! sherpa = "https://v2.sherpa.ac.uk"
//!
//! [cache]
//! directory = "/var/tmp/papercut"
//!
//! [downloads]
//! directory = "./papers"
//!
//! [rate_limits]
//! request_delay_ms = 3000
//!
//! [http]
//! user_agent = "Mozilla/5.0 ..."
//! ```
//!
//! e.g. `PAPERCUT_RATE_LIMITS__REQUEST_DELAY_MS=0` disables the courtesy delay.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::sources::{
    ARXIV_API_URL, ARXIV_OAI_URL, ARXIV_TAXONOMY_URL, DOI_BASE_URL, SHERPA_API_KEY_ENV,
    SHERPA_BASE_URL,
};
use crate::utils::{Throttle, BROWSER_USER_AGENT};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Upstream base URLs
    #[serde(default)]
    pub endpoints: Endpoints,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// PDF download settings
    #[serde(default)]
    pub downloads: DownloadConfig,

    /// Courtesy delay for arXiv
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Throttle for the arXiv search and OAI endpoints
    pub fn throttle(&self) -> Throttle {
        Throttle::from_millis(self.rate_limits.request_delay_ms)
    }
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Sherpa Romeo API key, required for license lookups
    #[serde(default = "default_sherpa_key")]
    pub sherpa_romeo: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            sherpa_romeo: default_sherpa_key(),
        }
    }
}

fn default_sherpa_key() -> Option<String> {
    std::env::var(SHERPA_API_KEY_ENV)
        .ok()
        .filter(|k| !k.is_empty())
}

/// Upstream base URLs, overridable for mirrors and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_arxiv_api")]
    pub arxiv_api: String,

    #[serde(default = "default_arxiv_oai")]
    pub arxiv_oai: String,

    #[serde(default = "default_arxiv_taxonomy")]
    pub arxiv_taxonomy: String,

    #[serde(default = "default_doi")]
    pub doi: String,

    #[serde(default = "default_sherpa")]
    pub sherpa: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            arxiv_api: default_arxiv_api(),
            arxiv_oai: default_arxiv_oai(),
            arxiv_taxonomy: default_arxiv_taxonomy(),
            doi: default_doi(),
            sherpa: default_sherpa(),
        }
    }
}

fn default_arxiv_api() -> String {
    ARXIV_API_URL.to_string()
}

fn default_arxiv_oai() -> String {
    ARXIV_OAI_URL.to_string()
}

fn default_arxiv_taxonomy() -> String {
    ARXIV_TAXONOMY_URL.to_string()
}

fn default_doi() -> String {
    DOI_BASE_URL.to_string()
}

fn default_sherpa() -> String {
    SHERPA_BASE_URL.to_string()
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache root
    #[serde(default = "default_cache_dir")]
    pub directory: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
        }
    }
}

/// `<system temp dir>/papercut`
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("papercut")
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root of the PDF output tree; DOI PDFs go to `<directory>/dois`,
    /// arXiv PDFs to `<directory>/arxiv`
    #[serde(default = "default_download_dir")]
    pub directory: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
        }
    }
}

impl DownloadConfig {
    pub fn doi_dir(&self) -> PathBuf {
        self.directory.join("dois")
    }

    pub fn arxiv_dir(&self) -> PathBuf {
        self.directory.join("arxiv")
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("papers")
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Delay before every arXiv search or OAI request
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: default_request_delay(),
        }
    }
}

fn default_request_delay() -> u64 {
    3000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.to_string()
}

/// Load configuration.
///
/// `path` must exist when given. Without it, the default config file is used
/// if present.
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path));
        }
        None => {
            if let Some(found) = find_config_file() {
                tracing::info!("Using config file: {}", found.display());
                builder = builder.add_source(config::File::from(found).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("PAPERCUT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// `<config dir>/papercut/config.toml`, if it exists
pub fn find_config_file() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join("papercut").join("config.toml");
    path.is_file().then_some(path)
}
