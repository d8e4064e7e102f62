//! Command implementations behind the CLI.
//!
//! Each command takes the shared [`Context`] and a writer for its CSV output,
//! so tests can capture the output in a `Vec<u8>`.

mod cache;
mod doi;
mod license;
mod search;

pub use cache::{cache_clear, cache_status};
pub use doi::{get_doi, GetDoiArgs};
pub use license::{get_license, GetLicenseArgs};
pub use search::{search_arxiv, SearchArxivArgs};

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::sources::SourceError;
use crate::utils::{CacheService, HttpClient};

/// State shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub client: Arc<HttpClient>,
    pub cache: CacheService,
}

impl Context {
    pub fn new(config: Config) -> Result<Self, SourceError> {
        let client = Arc::new(HttpClient::with_user_agent(&config.http.user_agent)?);
        let cache = CacheService::from_config(&config.cache);
        Ok(Self {
            config,
            client,
            cache,
        })
    }
}

/// One identifier per line; blank lines are skipped
pub fn read_identifiers(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
