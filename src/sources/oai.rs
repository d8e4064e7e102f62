//! arXiv OAI-PMH records.
//!
//! The `arXiv` metadata format carries the license URL and the author list
//! split into keyname and forenames, neither of which the search API returns.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::sync::Arc;

use crate::sources::{MetadataSource, SourceError, ACCEPT_XML};
use crate::utils::{CacheKey, CacheService, HttpClient, Throttle};

/// Base URL for the arXiv OAI-PMH endpoint
pub const ARXIV_OAI_URL: &str = "https://export.arxiv.org/oai2";

/// License assumed when a record carries none
pub const DEFAULT_ARXIV_LICENSE: &str =
    "https://arxiv.org/licenses/nonexclusive-distrib/1.0/license.html";

/// License and authors of one arXiv record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaiRecord {
    pub id: String,
    pub license: String,
    pub authors: Vec<OaiAuthor>,
}

impl Default for OaiRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            license: DEFAULT_ARXIV_LICENSE.to_string(),
            authors: Vec::new(),
        }
    }
}

impl OaiRecord {
    /// `relators:cre:person:<keyname>, <forenames>` for each author
    pub fn linked_agents(&self) -> Vec<String> {
        self.authors
            .iter()
            .map(|a| format!("relators:cre:person:{}", a.display_name()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OaiAuthor {
    pub keyname: String,
    pub forenames: String,
}

impl OaiAuthor {
    pub fn display_name(&self) -> String {
        if self.forenames.is_empty() {
            self.keyname.clone()
        } else {
            format!("{}, {}", self.keyname, self.forenames)
        }
    }
}

/// OAI-PMH source for arXiv records
#[derive(Debug, Clone)]
pub struct OaiSource {
    client: Arc<HttpClient>,
    cache: CacheService,
    base_url: String,
    throttle: Throttle,
}

impl OaiSource {
    pub fn new(
        client: Arc<HttpClient>,
        cache: CacheService,
        base_url: impl Into<String>,
        throttle: Throttle,
    ) -> Self {
        Self {
            client,
            cache,
            base_url: base_url.into(),
            throttle,
        }
    }
}

#[async_trait]
impl MetadataSource for OaiSource {
    type Record = OaiRecord;

    fn id(&self) -> &str {
        "oai"
    }

    fn client(&self) -> &HttpClient {
        &self.client
    }

    fn cache(&self) -> &CacheService {
        &self.cache
    }

    fn cache_key(&self, id: &str) -> CacheKey {
        CacheKey::oai_record(id)
    }

    fn request_url(&self, id: &str) -> String {
        format!(
            "{}?verb=GetRecord&identifier=oai:arXiv.org:{}&metadataPrefix=arXiv",
            self.base_url, id
        )
    }

    fn accept(&self) -> &'static str {
        ACCEPT_XML
    }

    fn parse(&self, _id: &str, body: &[u8]) -> Result<OaiRecord, SourceError> {
        parse_oai(body)
    }

    /// Same as the default, but waits the courtesy delay on a cache miss
    async fn get_by_id(&self, id: &str) -> Result<OaiRecord, SourceError> {
        let key = self.cache_key(id);
        if !self.cache.path_for(&key).exists() {
            self.throttle.wait().await;
        }
        tracing::debug!("{}: fetching {} ({})", self.id(), id, key);
        let body = self
            .cache
            .fetch_or_cache(&self.client, &key, &self.request_url(id), self.accept())
            .await?;
        self.parse(id, &body)
    }
}

/// Decode an OAI-PMH `GetRecord` response in the `arXiv` metadata format.
///
/// An OAI `<error>` element (e.g. `idDoesNotExist`) is a
/// [`SourceError::NotFound`].
pub fn parse_oai(body: &[u8]) -> Result<OaiRecord, SourceError> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut record = OaiRecord::default();
    let mut saw_root = false;
    let mut in_error = false;
    let mut author: Option<OaiAuthor> = None;
    let mut open: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "OAI-PMH" => saw_root = true,
                    "error" => in_error = true,
                    "author" => author = Some(OaiAuthor::default()),
                    _ => {}
                }
                open.push(name);
                text.clear();
            }
            Ok(Event::Text(e)) => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| SourceError::Parse(format!("XML text error: {}", e)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::End(_)) => {
                let name = open.pop().unwrap_or_default();
                let value = std::mem::take(&mut text);
                let in_arxiv = open.iter().any(|n| n == "arXiv");

                match name.as_str() {
                    "error" => {
                        return Err(SourceError::NotFound(format!("OAI error: {}", value)));
                    }
                    "keyname" => {
                        if let Some(a) = author.as_mut() {
                            a.keyname = value;
                        }
                    }
                    "forenames" => {
                        if let Some(a) = author.as_mut() {
                            a.forenames = value;
                        }
                    }
                    "author" => {
                        if let Some(a) = author.take() {
                            record.authors.push(a);
                        }
                    }
                    "id" if in_arxiv => record.id = value,
                    "license" if in_arxiv && !value.is_empty() => record.license = value,
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                // self-closing <error code="..."/>
                if e.local_name().as_ref() == b"error" {
                    in_error = true;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SourceError::Parse(format!(
                    "XML parsing error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SourceError::Parse("Response is not an OAI-PMH document".to_string()));
    }
    if in_error {
        return Err(SourceError::NotFound("OAI error".to_string()));
    }

    Ok(record)
}
