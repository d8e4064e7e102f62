//! DOI registration records via content negotiation.
//!
//! `GET <base>/<doi>` with `Accept: application/json` returns CSL-JSON from
//! whichever agency registered the DOI. The same URL with `Accept: text/html`
//! redirects to the publisher landing page, which is scraped for a
//! `citation_pdf_url` meta tag when the record lists no PDF link.

use async_trait::async_trait;
use regex::bytes::Regex;
use std::sync::{Arc, LazyLock};

use crate::models::DoiRecord;
use crate::sources::{MetadataSource, SourceError, ACCEPT_HTML};
use crate::utils::{CacheKey, CacheService, HttpClient};

/// Default DOI resolver
pub const DOI_BASE_URL: &str = "https://dx.doi.org";

static CITATION_PDF_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+name="citation_pdf_url"\s+content="([^"]+)"[^>]*>"#).unwrap()
});

/// DOI source
#[derive(Debug, Clone)]
pub struct DoiSource {
    client: Arc<HttpClient>,
    cache: CacheService,
    base_url: String,
}

impl DoiSource {
    pub fn new(client: Arc<HttpClient>, cache: CacheService, base_url: impl Into<String>) -> Self {
        Self {
            client,
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Registration record for `doi`, from cache when available
    pub async fn get_doi_record(&self, doi: &str) -> Result<DoiRecord, SourceError> {
        self.get_by_id(doi).await
    }

    /// First `citation_pdf_url` on the landing page of `doi`
    pub async fn landing_page_pdf(&self, doi: &str) -> Result<Option<String>, SourceError> {
        let body = self
            .cache
            .fetch_or_cache(
                &self.client,
                &CacheKey::doi_landing_page(doi),
                &self.request_url(doi),
                ACCEPT_HTML,
            )
            .await?;
        Ok(citation_pdf_url(&body))
    }

    /// PDF URL for a record: a declared PDF link, else the landing page scrape
    pub async fn resolve_pdf_url(
        &self,
        doi: &str,
        record: &DoiRecord,
    ) -> Result<Option<String>, SourceError> {
        if let Some(link) = record.pdf_link() {
            return Ok(Some(link.to_string()));
        }
        tracing::debug!("No PDF link in record for {}, checking landing page", doi);
        self.landing_page_pdf(doi).await
    }
}

/// First `citation_pdf_url` meta tag value in `html`
pub fn citation_pdf_url(html: &[u8]) -> Option<String> {
    CITATION_PDF_URL
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

#[async_trait]
impl MetadataSource for DoiSource {
    type Record = DoiRecord;

    fn id(&self) -> &str {
        "doi"
    }

    fn client(&self) -> &HttpClient {
        &self.client
    }

    fn cache(&self) -> &CacheService {
        &self.cache
    }

    fn cache_key(&self, id: &str) -> CacheKey {
        CacheKey::doi_record(id)
    }

    fn request_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    fn parse(&self, id: &str, body: &[u8]) -> Result<DoiRecord, SourceError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(SourceError::NotFound(format!("Could not find DOI {}", id)));
        }
        serde_json::from_slice(body)
            .map_err(|e| SourceError::Parse(format!("Could not decode JSON for {}: {}", id, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(server: &mockito::Server, dir: &TempDir) -> DoiSource {
        DoiSource::new(
            Arc::new(HttpClient::new().unwrap()),
            CacheService::new(dir.path()),
            server.url(),
        )
    }

    #[test]
    fn test_source_id() {
        let dir = TempDir::new().unwrap();
        let source = DoiSource::new(
            Arc::new(HttpClient::new().unwrap()),
            CacheService::new(dir.path()),
            DOI_BASE_URL,
        );
        assert_eq!(source.id(), "doi");
        assert_eq!(source.request_url("10.1000/xyz"), "https://dx.doi.org/10.1000/xyz");
    }

    #[test]
    fn test_citation_pdf_url() {
        let html = br#"<head>
<meta name="citation_title" content="On Things">
<meta name="citation_pdf_url" content="https://example.org/things.pdf">
<meta name="citation_pdf_url" content="https://example.org/other.pdf" />
</head>"#;
        assert_eq!(
            citation_pdf_url(html).as_deref(),
            Some("https://example.org/things.pdf")
        );
        assert_eq!(citation_pdf_url(b"<head></head>"), None);
    }

    #[tokio::test]
    async fn test_get_doi_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/10.1000/xyz123")
            .match_header("accept", "application/json")
            .with_body(r#"{"DOI":"10.1000/xyz123","title":"On Things","issued":{"date-parts":[[2022,9]]}}"#)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let doi = source(&server, &dir);
        let record = doi.get_doi_record("10.1000/xyz123").await.unwrap();
        assert_eq!(record.title, "On Things");
        assert_eq!(record.issued_date(), "2022-09");

        // second lookup is served from dois/<doi>/doi.json
        doi.get_doi_record("10.1000/xyz123").await.unwrap();
        assert!(dir.path().join("dois/10.1000/xyz123/doi.json").exists());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_body_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/10.1000/empty")
            .with_body("")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = source(&server, &dir).get_doi_record("10.1000/empty").await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_error_page_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/10.1000/missing")
            .with_status(404)
            .with_body("<html>DOI Not Found</html>")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let result = source(&server, &dir).get_doi_record("10.1000/missing").await;
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[tokio::test]
    async fn test_resolve_pdf_url_scrapes_landing_page() {
        let mut server = mockito::Server::new_async().await;
        let landing = server
            .mock("GET", "/10.1000/xyz123")
            .match_header("accept", "text/html")
            .with_body(r#"<meta name="citation_pdf_url" content="https://example.org/x.pdf">"#)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let doi = source(&server, &dir);
        let record = DoiRecord::default();
        let url = doi.resolve_pdf_url("10.1000/xyz123", &record).await.unwrap();
        assert_eq!(url.as_deref(), Some("https://example.org/x.pdf"));
        assert!(dir.path().join("dois/10.1000/xyz123/doi.html").exists());
        landing.assert_async().await;
    }
}
