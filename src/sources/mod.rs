//! Metadata sources queried by papercut.
//!
//! Each upstream service lives in its own module:
//!
//! - [`arxiv`]: the arXiv search API (Atom feed) and the pagination driver
//! - [`oai`]: supplementary arXiv records from the OAI-PMH endpoint
//! - [`taxonomy`]: arXiv category labels scraped from the taxonomy page
//! - [`doi`]: DOI registration records and landing-page PDF discovery
//! - [`sherpa`]: Sherpa Romeo publisher policies and license resolution
//! - [`directory`]: email addresses scraped from a directory listing
//!
//! Sources that fetch a single record by identifier implement
//! [`MetadataSource`], which routes every request through the disk cache.

pub mod arxiv;
pub mod directory;
pub mod doi;
pub mod oai;
pub mod sherpa;
pub mod taxonomy;

pub use arxiv::{extract_identifier, parse_feed, ArxivSource, Paginator, SearchParams, ARXIV_API_URL};
pub use doi::{DoiSource, DOI_BASE_URL};
pub use oai::{OaiAuthor, OaiRecord, OaiSource, ARXIV_OAI_URL, DEFAULT_ARXIV_LICENSE};
pub use sherpa::{SherpaSource, SHERPA_API_KEY_ENV, SHERPA_BASE_URL};
pub use taxonomy::{Taxonomy, ARXIV_TAXONOMY_URL};

use async_trait::async_trait;

use crate::utils::{CacheKey, CacheService, HttpClient};

/// Accept header for JSON metadata requests
pub const ACCEPT_JSON: &str = "application/json";
/// Accept header for HTML landing pages
pub const ACCEPT_HTML: &str = "text/html";
/// Accept header for XML feeds and OAI records
pub const ACCEPT_XML: &str = "application/xml";

/// A source that can fetch one record by identifier and decode it.
///
/// The default [`get_by_id`](MetadataSource::get_by_id) consults the cache
/// under [`cache_key`](MetadataSource::cache_key) before going to the network,
/// then hands the raw bytes to [`parse`](MetadataSource::parse).
#[async_trait]
pub trait MetadataSource: Send + Sync + std::fmt::Debug {
    /// Decoded record type
    type Record: Send;

    /// Short identifier for log lines (e.g. "doi", "oai")
    fn id(&self) -> &str;

    fn client(&self) -> &HttpClient;

    fn cache(&self) -> &CacheService;

    /// Where the raw response for `id` is cached
    fn cache_key(&self, id: &str) -> CacheKey;

    /// Upstream URL for `id`
    fn request_url(&self, id: &str) -> String;

    /// Accept header sent with the request
    fn accept(&self) -> &'static str {
        ACCEPT_JSON
    }

    /// Decode a raw response body
    fn parse(&self, id: &str, body: &[u8]) -> Result<Self::Record, SourceError>;

    /// Fetch (or read from cache) and decode the record for `id`
    async fn get_by_id(&self, id: &str) -> Result<Self::Record, SourceError> {
        let key = self.cache_key(id);
        let url = self.request_url(id);
        tracing::debug!("{}: fetching {} ({})", self.id(), id, key);
        let body = self
            .cache()
            .fetch_or_cache(self.client(), &key, &url, self.accept())
            .await?;
        self.parse(id, &body)
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, HTML)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Record not found or empty response
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status where one is required
    #[error("API error: {0}")]
    Api(String),

    /// Upstream returned an identifier papercut cannot recognize
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// Missing or invalid configuration (e.g. API key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Whether this error should abort the whole run rather than skip a record
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SourceError::Network(_)
                | SourceError::MalformedIdentifier(_)
                | SourceError::Config(_)
                | SourceError::Io(_)
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(SourceError::Network("dns".into()).is_fatal());
        assert!(SourceError::MalformedIdentifier("x".into()).is_fatal());
        assert!(!SourceError::Parse("bad json".into()).is_fatal());
        assert!(!SourceError::NotFound("10.1/x".into()).is_fatal());
    }
}
