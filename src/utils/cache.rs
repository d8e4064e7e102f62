//! Local file cache for upstream responses.
//!
//! Every metadata request is keyed by a [`CacheKey`] that maps to a file
//! below the cache root. The raw response body is stored as-is.
//!
//! # Cache Structure
//!
//! ```text
//! <cache root>/
//!   dois/<doi>/doi.json     DOI registration record
//!   dois/<doi>/doi.html     landing page
//!   issns/<issn>            Sherpa publication id
//!   issns/ids/<id>          Sherpa publication record
//!   arxiv/<id>/oai.xml      OAI-PMH record
//! ```
//!
//! # Invalidation
//!
//! Entries never expire. A cached file is served until it is deleted, either
//! by hand or with `papercut cache clear`. Records that change upstream stay
//! stale until then.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::CacheConfig;
use crate::sources::{SourceError, ACCEPT_JSON};
use crate::utils::HttpClient;

/// Top-level directories owned by the cache
const NAMESPACES: [&str; 3] = ["dois", "issns", "arxiv"];

/// Relative location of one cached response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    relative: PathBuf,
}

impl CacheKey {
    /// DOI registration record: `dois/<doi>/doi.json`
    pub fn doi_record(doi: &str) -> Self {
        Self::from_segments("dois", doi, Some("doi.json"))
    }

    /// DOI landing page: `dois/<doi>/doi.html`
    pub fn doi_landing_page(doi: &str) -> Self {
        Self::from_segments("dois", doi, Some("doi.html"))
    }

    /// Sherpa publication id for an ISSN: `issns/<issn>`
    pub fn issn(issn: &str) -> Self {
        Self::from_segments("issns", issn, None)
    }

    /// Sherpa publication record: `issns/ids/<id>`
    pub fn publication(id: &str) -> Self {
        Self::from_segments("issns/ids", id, None)
    }

    /// arXiv OAI record: `arxiv/<id>/oai.xml`
    pub fn oai_record(id: &str) -> Self {
        Self::from_segments("arxiv", id, Some("oai.xml"))
    }

    /// Path relative to the cache root
    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    fn from_segments(namespace: &str, id: &str, file: Option<&str>) -> Self {
        let mut relative = PathBuf::from(namespace);
        // identifiers such as DOIs contain '/', which nests directories
        for segment in id.trim().split('/') {
            relative.push(sanitize_segment(segment));
        }
        if let Some(file) = file {
            relative.push(file);
        }
        Self { relative }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative.display())
    }
}

fn sanitize_segment(segment: &str) -> String {
    match segment {
        "" | "." | ".." => "_".to_string(),
        s => s.replace('\\', "_"),
    }
}

/// Cache service for storing and retrieving raw responses
#[derive(Debug, Clone)]
pub struct CacheService {
    base_dir: PathBuf,
}

impl CacheService {
    /// Create a cache rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create a cache from configuration
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.directory.clone())
    }

    /// Get the cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute path of the file backing `key`
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.base_dir.join(key.relative_path())
    }

    /// Read a cached response, if present
    pub fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(content) => {
                tracing::debug!("Cache HIT: {}", key);
                Some(content)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Cache MISS: {}", key);
                None
            }
            Err(e) => {
                tracing::warn!("Error reading cached file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a response body under `key`, creating parent directories
    pub fn put(&self, key: &CacheKey, body: &[u8]) -> Result<(), SourceError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        tracing::debug!("Cached {} ({} bytes)", key, body.len());
        Ok(())
    }

    /// Return the cached body for `key`, or fetch `url` and cache it.
    ///
    /// A cached file is returned without revalidation, except that a JSON
    /// request whose cached content is not valid JSON falls through to a live
    /// fetch. Only successful (2xx) responses are written to the cache;
    /// others are returned to the caller uncached.
    pub async fn fetch_or_cache(
        &self,
        client: &HttpClient,
        key: &CacheKey,
        url: &str,
        accept: &str,
    ) -> Result<Vec<u8>, SourceError> {
        if let Some(content) = self.get(key) {
            if accept != ACCEPT_JSON || is_valid_json(&content) {
                return Ok(content);
            }
            tracing::warn!("Cached file {} is not valid JSON, refetching", key);
        }

        let fetched = client.fetch(url, accept).await?;
        if fetched.is_success() {
            self.put(key, &fetched.body)?;
        } else {
            tracing::warn!("{} returned status {}; not caching", url, fetched.status);
        }

        Ok(fetched.body)
    }

    /// Remove every cached response. The cache root itself is kept.
    pub fn clear(&self) -> io::Result<()> {
        for namespace in NAMESPACES {
            let dir = self.base_dir.join(namespace);
            match fs::remove_dir_all(&dir) {
                Ok(()) => tracing::debug!("Removed {}", dir.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        tracing::info!("Cache cleared at {}", self.base_dir.display());
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            cache_dir: self.base_dir.clone(),
            ..CacheStats::default()
        };
        for namespace in NAMESPACES {
            let (files, bytes) = dir_usage(&self.base_dir.join(namespace));
            stats.namespaces.push((namespace.to_string(), files));
            stats.total_files += files;
            stats.total_bytes += bytes;
        }
        stats
    }
}

fn is_valid_json(content: &[u8]) -> bool {
    serde_json::from_slice::<serde::de::IgnoredAny>(content).is_ok()
}

/// File count and byte total below `path`
fn dir_usage(path: &Path) -> (usize, u64) {
    let mut files = 0;
    let mut bytes = 0;
    if let Ok(entries) = path.read_dir() {
        for entry in entries.flatten() {
            let entry_path = entry.path();
            if entry_path.is_dir() {
                let (f, b) = dir_usage(&entry_path);
                files += f;
                bytes += b;
            } else {
                files += 1;
                bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
    }
    (files, bytes)
}

/// Statistics about the cache
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Cache directory path
    pub cache_dir: PathBuf,

    /// Cached file count per namespace
    pub namespaces: Vec<(String, usize)>,

    pub total_files: usize,

    pub total_bytes: u64,
}
