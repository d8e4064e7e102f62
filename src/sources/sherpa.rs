//! Sherpa Romeo publisher policies.
//!
//! License lookup is two cached steps: the ISSN is resolved to a Sherpa
//! publication id by reading the redirect of a `romeosearch` request, then
//! the publication record is retrieved with the API key and its policies are
//! searched for an open Creative Commons license.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::PolicyResponse;
use crate::sources::{MetadataSource, SourceError};
use crate::utils::{CacheKey, CacheService, HttpClient};

/// Default Sherpa API base
pub const SHERPA_BASE_URL: &str = "https://v2.sherpa.ac.uk";

/// Environment variable holding the Sherpa Romeo API key
pub const SHERPA_API_KEY_ENV: &str = "SHERPA_ROMEO_API_KEY";

/// Sherpa Romeo source
#[derive(Debug, Clone)]
pub struct SherpaSource {
    client: Arc<HttpClient>,
    cache: CacheService,
    base_url: String,
    api_key: String,
}

impl SherpaSource {
    /// Create a Sherpa source. A missing or empty API key is a configuration error.
    pub fn new(
        client: Arc<HttpClient>,
        cache: CacheService,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, SourceError> {
        let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            SourceError::Config(format!(
                "The {} environment variable was not found.",
                SHERPA_API_KEY_ENV
            ))
        })?;

        Ok(Self {
            client,
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Sherpa publication id for `issn`.
    ///
    /// Sherpa answers a matching `romeosearch` with a 302 whose `Location`
    /// ends in the publication id. Any other answer means no publication.
    pub async fn publication_id_for_issn(&self, issn: &str) -> Result<Option<String>, SourceError> {
        let key = CacheKey::issn(issn);
        if let Some(cached) = self.cache.get(&key) {
            let id = String::from_utf8_lossy(&cached).trim().to_string();
            if !id.is_empty() {
                return Ok(Some(id));
            }
        }

        let url = format!(
            "{}/cgi/romeosearch?publication_title-auto={}",
            self.base_url,
            urlencoding::encode(issn)
        );
        let Some(location) = self.client.redirect_location(&url).await? else {
            return Ok(None);
        };

        let id = location
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if id.is_empty() {
            return Ok(None);
        }

        self.cache.put(&key, id.as_bytes())?;
        Ok(Some(id))
    }

    /// Publication policy record for a Sherpa publication id
    pub async fn get_publication(&self, id: &str) -> Result<PolicyResponse, SourceError> {
        self.get_by_id(id).await
    }

    /// Open license URI for `issn`, or an empty string.
    ///
    /// Lookup failures are logged and yield an empty string.
    pub async fn find_license_for_issn(&self, issn: &str) -> String {
        let id = match self.publication_id_for_issn(issn).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::info!("Could not find publication ID for ISSN {}", issn);
                return String::new();
            }
            Err(e) => {
                tracing::warn!("Error looking up ISSN {}: {}", issn, e);
                return String::new();
            }
        };

        match self.get_publication(&id).await {
            Ok(response) => response.get_license(),
            Err(e) => {
                tracing::warn!("Could not read publication info for {}: {}", issn, e);
                String::new()
            }
        }
    }

    /// First non-empty license among `issns`, tried in order
    pub async fn find_license(&self, issns: &[String]) -> String {
        for issn in issns {
            let license = self.find_license_for_issn(issn).await;
            if !license.is_empty() {
                return license;
            }
        }
        String::new()
    }
}

#[async_trait]
impl MetadataSource for SherpaSource {
    type Record = PolicyResponse;

    fn id(&self) -> &str {
        "sherpa"
    }

    fn client(&self) -> &HttpClient {
        &self.client
    }

    fn cache(&self) -> &CacheService {
        &self.cache
    }

    fn cache_key(&self, id: &str) -> CacheKey {
        CacheKey::publication(id)
    }

    fn request_url(&self, id: &str) -> String {
        let filter = format!(r#"[["id","equals","{}"]]"#, id);
        format!(
            "{}/cgi/retrieve?item-type=publication&format=Json&limit=10&offset=0&order=-id&filter={}&api-key={}",
            self.base_url,
            urlencoding::encode(&filter),
            urlencoding::encode(&self.api_key)
        )
    }

    fn parse(&self, id: &str, body: &[u8]) -> Result<PolicyResponse, SourceError> {
        serde_json::from_slice(body).map_err(|e| {
            SourceError::Parse(format!("Unable to read publication {}: {}", id, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    const PUBLICATION: &str = r#"{"items":[{"id":4242,"publisher_policy":[{
        "uri":"https://v2.sherpa.ac.uk/id/publisher_policy/1",
        "permitted_oa":[
            {"article_version":["submitted"],"location":{"location":["any_website"]}},
            {"article_version":["published"],"location":{"location":["institutional_repository"]},
             "license":[{"license":"cc_by","version":"4.0"}]}
        ]}]}]}"#;

    fn source(server: &mockito::Server, dir: &TempDir) -> SherpaSource {
        SherpaSource::new(
            Arc::new(HttpClient::new().unwrap()),
            CacheService::new(dir.path()),
            server.url(),
            Some("test-key".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_api_key() {
        let dir = TempDir::new().unwrap();
        let result = SherpaSource::new(
            Arc::new(HttpClient::new().unwrap()),
            CacheService::new(dir.path()),
            SHERPA_BASE_URL,
            Some("  ".to_string()),
        );
        assert!(matches!(result, Err(SourceError::Config(_))));
    }

    #[test]
    fn test_retrieve_url() {
        let dir = TempDir::new().unwrap();
        let sherpa = SherpaSource::new(
            Arc::new(HttpClient::new().unwrap()),
            CacheService::new(dir.path()),
            SHERPA_BASE_URL,
            Some("abc".to_string()),
        )
        .unwrap();
        assert_eq!(
            sherpa.request_url("4242"),
            "https://v2.sherpa.ac.uk/cgi/retrieve?item-type=publication&format=Json&limit=10&offset=0&order=-id&filter=%5B%5B%22id%22%2C%22equals%22%2C%224242%22%5D%5D&api-key=abc"
        );
    }

    #[tokio::test]
    async fn test_find_license_for_issn() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/cgi/romeosearch")
            .match_query(Matcher::UrlEncoded(
                "publication_title-auto".into(),
                "1234-5678".into(),
            ))
            .with_status(302)
            .with_header("location", "https://v2.sherpa.ac.uk/id/publication/4242")
            .expect(1)
            .create_async()
            .await;
        let retrieve = server
            .mock("GET", "/cgi/retrieve")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("filter".into(), r#"[["id","equals","4242"]]"#.into()),
                Matcher::UrlEncoded("api-key".into(), "test-key".into()),
            ]))
            .with_body(PUBLICATION)
            .expect(1)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let sherpa = source(&server, &dir);

        let license = sherpa.find_license_for_issn("1234-5678").await;
        assert_eq!(license, "https://creativecommons.org/licenses/by/4.0/");

        // both steps are cached
        let again = sherpa.find_license_for_issn("1234-5678").await;
        assert_eq!(again, license);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("issns/1234-5678")).unwrap(),
            "4242"
        );
        assert!(dir.path().join("issns/ids/4242").exists());

        search.assert_async().await;
        retrieve.assert_async().await;
    }

    #[tokio::test]
    async fn test_unknown_issn_gives_empty_license() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/cgi/romeosearch")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>No results</html>")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let sherpa = source(&server, &dir);
        assert_eq!(sherpa.find_license_for_issn("0000-0000").await, "");
        assert!(!dir.path().join("issns/0000-0000").exists());
    }

    #[tokio::test]
    async fn test_find_license_tries_issns_in_order() {
        let mut server = mockito::Server::new_async().await;
        let _miss = server
            .mock("GET", "/cgi/romeosearch")
            .match_query(Matcher::UrlEncoded(
                "publication_title-auto".into(),
                "1111-1111".into(),
            ))
            .with_status(200)
            .create_async()
            .await;
        let _hit = server
            .mock("GET", "/cgi/romeosearch")
            .match_query(Matcher::UrlEncoded(
                "publication_title-auto".into(),
                "2222-2222".into(),
            ))
            .with_status(302)
            .with_header("location", "/id/publication/4242")
            .create_async()
            .await;
        let _retrieve = server
            .mock("GET", "/cgi/retrieve")
            .match_query(Matcher::Any)
            .with_body(PUBLICATION)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let sherpa = source(&server, &dir);
        let license = sherpa
            .find_license(&["1111-1111".to_string(), "2222-2222".to_string()])
            .await;
        assert_eq!(license, "https://creativecommons.org/licenses/by/4.0/");
    }
}
