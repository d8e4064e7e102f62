//! HTTP client utilities.

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, LOCATION};
use reqwest::{redirect, Client, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::sources::SourceError;

/// Browser-like user agent; several publisher sites reject anything else
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Status and body of a metadata request
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Shared HTTP client with sensible defaults
///
/// Holds two reqwest clients: one following redirects (the default) and one
/// that never follows them, for lookups that read the `Location` header.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    no_redirect: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with the browser user agent
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(BROWSER_USER_AGENT)
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let no_redirect = Client::builder()
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            no_redirect: Arc::new(no_redirect),
        })
    }

    /// GET `url` and return status and body.
    ///
    /// Non-success statuses are not errors here; the caller's parser decides.
    pub async fn fetch(&self, url: &str, accept: &str) -> Result<Fetched, SourceError> {
        tracing::info!("Accessing {}", url);

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::debug!("{} returned status {}", url, status);
        }

        Ok(Fetched {
            status,
            body: body.to_vec(),
        })
    }

    /// GET `url` without following redirects and return the `Location`
    /// header of a 302 response.
    pub async fn redirect_location(&self, url: &str) -> Result<Option<String>, SourceError> {
        tracing::info!("Accessing {}", url);

        let response = self
            .no_redirect
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch {}: {}", url, e)))?;

        if response.status() != StatusCode::FOUND {
            tracing::debug!("{} returned status {}, expected 302", url, response.status());
            return Ok(None);
        }

        Ok(response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()))
    }

    /// Stream a PDF from `url` into `path`, returning the number of bytes written.
    ///
    /// A non-success status is an error. The file at `path` may be left
    /// partially written on failure.
    pub async fn download_to(&self, url: &str, path: &Path) -> Result<u64, SourceError> {
        tracing::info!("Downloading {} to {}", url, path.display());

        let mut response = self
            .client
            .get(url)
            .header(ACCEPT, "application/pdf")
            .header(ACCEPT_LANGUAGE, "en-US")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to download PDF: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "{} returned a non-200 status code: {}",
                url,
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read PDF body: {}", e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}
