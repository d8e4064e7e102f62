//! arXiv search API source.
//!
//! Queries `export.arxiv.org/api/query` and decodes the Atom response,
//! including the OpenSearch pagination fields and the `arxiv:` extension
//! elements. [`Paginator`] walks every page of a query.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::models::{Author, Category, Entry, Feed, Link};
use crate::sources::{SourceError, ACCEPT_XML};
use crate::utils::{HttpClient, Throttle};

/// Base URL for the arXiv search API
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

static ABS_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/abs/(.+?)(?:v\d+)?$").unwrap());

/// Query parameters for one search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// `search_query`, e.g. `au:smith` or an email address
    pub query: Option<String>,

    /// `id_list`, comma-separated arXiv ids
    pub ids: Option<String>,

    /// Offset of the first result
    pub start: usize,

    /// Page size
    pub max_results: usize,
}

impl SearchParams {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ids: None,
            start: 0,
            max_results: 10,
        }
    }

    pub fn ids(ids: impl Into<String>) -> Self {
        Self {
            query: None,
            ids: Some(ids.into()),
            start: 0,
            max_results: 10,
        }
    }

    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Request URL for this page against `base_url`
    pub fn page_url(&self, base_url: &str) -> Result<String, SourceError> {
        let has_query = self.query.as_deref().is_some_and(|q| !q.is_empty());
        let has_ids = self.ids.as_deref().is_some_and(|i| !i.is_empty());
        if !has_query && !has_ids {
            return Err(SourceError::Config("query or ids required".to_string()));
        }

        let mut url = url::Url::parse(base_url)
            .map_err(|e| SourceError::Config(format!("Invalid arXiv API url {}: {}", base_url, e)))?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
                pairs.append_pair("search_query", query);
            }
            if let Some(ids) = self.ids.as_deref().filter(|i| !i.is_empty()) {
                pairs.append_pair("id_list", ids);
            }
            pairs.append_pair("start", &self.start.to_string());
            pairs.append_pair("max_results", &self.max_results.to_string());
        }
        Ok(url.to_string())
    }
}

/// arXiv search source
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: Arc<HttpClient>,
    base_url: String,
    throttle: Throttle,
}

impl ArxivSource {
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>, throttle: Throttle) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            throttle,
        }
    }

    /// Fetch and decode one page. Waits the courtesy delay first.
    pub async fn search(&self, params: &SearchParams) -> Result<Feed, SourceError> {
        let url = params.page_url(&self.base_url)?;
        self.throttle.wait().await;
        let fetched = self.client.fetch(&url, ACCEPT_XML).await?;
        parse_feed(&fetched.body)
    }

    /// Iterate every page of `params`, starting at `params.start`
    pub fn paginate(&self, params: SearchParams) -> Paginator<'_> {
        Paginator {
            source: self,
            params,
            done: false,
        }
    }
}

/// Pagination driver over the search API.
///
/// After each page, `next = startIndex + itemsPerPage`; another request is
/// made only while `next < totalResults`. A page reporting zero items per
/// page, or a `next` that does not advance, ends the walk.
#[derive(Debug)]
pub struct Paginator<'a> {
    source: &'a ArxivSource,
    params: SearchParams,
    done: bool,
}

impl Paginator<'_> {
    /// Fetch the next page, or `None` once all results are consumed
    pub async fn next_page(&mut self) -> Result<Option<Feed>, SourceError> {
        if self.done {
            return Ok(None);
        }

        let feed = match self.source.search(&self.params).await {
            Ok(feed) => feed,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };

        let next = feed.start_index + feed.items_per_page;
        if feed.items_per_page == 0 || next >= feed.total_results || next <= self.params.start {
            self.done = true;
        } else {
            self.params.start = next;
        }

        Ok(Some(feed))
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// arXiv identifier from an entry URL, without the version suffix.
///
/// `http://arxiv.org/abs/2101.00001v2` yields `2101.00001`. A URL that does
/// not match is a [`SourceError::MalformedIdentifier`].
pub fn extract_identifier(entry_id: &str) -> Result<String, SourceError> {
    ABS_ID
        .captures(entry_id.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SourceError::MalformedIdentifier(entry_id.to_string()))
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Get attribute value by local name
fn get_attr(e: &BytesStart<'_>, name: &str) -> String {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
        .unwrap_or_default()
}

/// Attribute-only elements inside an entry
fn apply_attributes(entry: &mut Entry, name: &str, e: &BytesStart<'_>) {
    match name {
        "link" => entry.links.push(Link {
            href: get_attr(e, "href"),
            rel: get_attr(e, "rel"),
            title: get_attr(e, "title"),
            link_type: get_attr(e, "type"),
        }),
        "category" => entry.categories.push(Category {
            term: get_attr(e, "term"),
            scheme: get_attr(e, "scheme"),
        }),
        "primary_category" => {
            entry.primary_category = Some(Category {
                term: get_attr(e, "term"),
                scheme: get_attr(e, "scheme"),
            })
        }
        _ => {}
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize, SourceError> {
    value
        .trim()
        .parse()
        .map_err(|_| SourceError::Parse(format!("Invalid {} value: {:?}", name, value)))
}

fn parse_timestamp(value: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|d| d.with_timezone(&chrono::Utc))
}

/// Decode an arXiv Atom response
pub fn parse_feed(body: &[u8]) -> Result<Feed, SourceError> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut feed = Feed::default();
    let mut saw_feed = false;
    let mut entry: Option<Entry> = None;
    let mut author: Option<Author> = None;
    let mut open: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                match name.as_str() {
                    "feed" if open.is_empty() => saw_feed = true,
                    "entry" => entry = Some(Entry::default()),
                    "author" if entry.is_some() => author = Some(Author::default()),
                    _ => {}
                }
                if let Some(entry) = entry.as_mut() {
                    apply_attributes(entry, &name, e);
                }
                open.push(name);
                text.clear();
            }
            Ok(Event::Empty(ref e)) => {
                if let Some(entry) = entry.as_mut() {
                    apply_attributes(entry, &local_name(e), e);
                }
            }
            Ok(Event::Text(e)) => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| SourceError::Parse(format!("XML text error: {}", e)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                let name = open.pop().unwrap_or_default();
                let value = std::mem::take(&mut text);

                if let Some(current) = author.as_mut() {
                    match name.as_str() {
                        "name" => current.name = value,
                        "affiliation" => current.affiliation = Some(value),
                        "author" => {
                            if let (Some(entry), Some(done)) = (entry.as_mut(), author.take()) {
                                entry.authors.push(done);
                            }
                        }
                        _ => {}
                    }
                } else if let Some(current) = entry.as_mut() {
                    match name.as_str() {
                        "id" => current.id = value,
                        "title" => current.title = value,
                        "summary" => current.summary = value,
                        "published" => current.published = parse_timestamp(&value),
                        "updated" => current.updated = parse_timestamp(&value),
                        "doi" => current.doi = value,
                        "comment" => current.comment = value,
                        "journal_ref" => current.journal_ref = value,
                        "entry" => {
                            if let Some(done) = entry.take() {
                                feed.entries.push(done.finish());
                            }
                        }
                        _ => {}
                    }
                } else {
                    match name.as_str() {
                        "title" => feed.title = value,
                        "id" => feed.id = value,
                        "updated" => feed.updated = value,
                        "totalResults" => feed.total_results = parse_count(&name, &value)?,
                        "startIndex" => feed.start_index = parse_count(&name, &value)?,
                        "itemsPerPage" => feed.items_per_page = parse_count(&name, &value)?,
                        _ => {}
                    }
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

    if !saw_feed {
        return Err(SourceError::Parse("Response is not an Atom feed".to_string()));
    }

    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query?search_query%3Dau%3Asmith" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=au:smith</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <updated>2024-04-01T00:00:00-04:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">25</opensearch:totalResults>
  <opensearch:startIndex xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">0</opensearch:startIndex>
  <opensearch:itemsPerPage xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">10</opensearch:itemsPerPage>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v2</id>
    <updated>2021-02-03T10:00:00Z</updated>
    <published>2021-01-01T18:59:59Z</published>
    <title>Learning to
      Rank   &amp; Retrieve</title>
    <summary>  We study ranking.
</summary>
    <author>
      <name>Jane Smith</name>
      <arxiv:affiliation xmlns:arxiv="http://arxiv.org/schemas/atom">Lehigh University</arxiv:affiliation>
    </author>
    <author>
      <name>John Doe</name>
    </author>
    <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.1000/xyz123</arxiv:doi>
    <link title="doi" href="http://dx.doi.org/10.1000/xyz123" rel="related"/>
    <link href="http://arxiv.org/abs/2101.00001v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2101.00001v2" rel="related" type="application/pdf"/>
    <arxiv:comment xmlns:arxiv="http://arxiv.org/schemas/atom">12 pages</arxiv:comment>
    <arxiv:journal_ref xmlns:arxiv="http://arxiv.org/schemas/atom">J. Ranking 1 (2021)</arxiv:journal_ref>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.IR" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.IR" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed() {
        let feed = parse_feed(SAMPLE_FEED.as_bytes()).unwrap();
        assert_eq!(feed.total_results, 25);
        assert_eq!(feed.start_index, 0);
        assert_eq!(feed.items_per_page, 10);
        assert_eq!(feed.entries.len(), 1);

        let entry = &feed.entries[0];
        assert_eq!(entry.id, "http://arxiv.org/abs/2101.00001v2");
        assert_eq!(entry.title, "Learning to Rank & Retrieve");
        assert_eq!(entry.summary, "We study ranking.");
        assert_eq!(entry.published_date(), "2021-01-01");
        assert_eq!(entry.doi, "10.1000/xyz123");
        assert_eq!(entry.comment, "12 pages");
        assert_eq!(entry.journal_ref, "J. Ranking 1 (2021)");
        assert_eq!(entry.authors.len(), 2);
        assert_eq!(entry.authors[0].name, "Jane Smith");
        assert_eq!(entry.authors[0].affiliation.as_deref(), Some("Lehigh University"));
        assert_eq!(entry.authors[1].affiliation, None);
        assert_eq!(entry.links.len(), 3);
        assert_eq!(entry.pdf.as_deref(), Some("http://arxiv.org/pdf/2101.00001v2"));
        assert_eq!(
            entry.primary_category.as_ref().map(|c| c.term.as_str()),
            Some("cs.IR")
        );
        assert_eq!(entry.category_terms(), vec!["cs.IR", "cs.AI"]);
    }

    #[test]
    fn test_parse_feed_rejects_non_feed() {
        assert!(matches!(
            parse_feed(b"<html><body>Service unavailable</body></html>"),
            Err(SourceError::Parse(_))
        ));
        assert!(matches!(parse_feed(b"not xml at all"), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_extract_identifier() {
        assert_eq!(
            extract_identifier("http://arxiv.org/abs/2101.00001v2").unwrap(),
            "2101.00001"
        );
        assert_eq!(
            extract_identifier("http://arxiv.org/abs/2101.00001").unwrap(),
            "2101.00001"
        );
        assert_eq!(
            extract_identifier("http://arxiv.org/abs/hep-th/9901001v1").unwrap(),
            "hep-th/9901001"
        );
        assert!(matches!(
            extract_identifier("http://arxiv.org/api/errors#incorrect_id_format"),
            Err(SourceError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_page_url() {
        let url = SearchParams::query("au:smith")
            .start(10)
            .max_results(5)
            .page_url(ARXIV_API_URL)
            .unwrap();
        assert_eq!(
            url,
            "https://export.arxiv.org/api/query?search_query=au%3Asmith&start=10&max_results=5"
        );

        let url = SearchParams::ids("2101.00001,2101.00002")
            .page_url(ARXIV_API_URL)
            .unwrap();
        assert!(url.contains("id_list=2101.00001%2C2101.00002"));
    }

    #[test]
    fn test_page_url_requires_query_or_ids() {
        let params = SearchParams {
            query: None,
            ids: Some(String::new()),
            start: 0,
            max_results: 10,
        };
        assert!(matches!(
            params.page_url(ARXIV_API_URL),
            Err(SourceError::Config(_))
        ));
    }

    fn page(total: usize, start: usize, per_page: usize) -> String {
        format!(
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
  <opensearch:totalResults>{total}</opensearch:totalResults>
  <opensearch:startIndex>{start}</opensearch:startIndex>
  <opensearch:itemsPerPage>{per_page}</opensearch:itemsPerPage>
</feed>"#
        )
    }

    #[tokio::test]
    async fn test_pagination_stops_after_last_page() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for start in [0, 10, 20] {
            mocks.push(
                server
                    .mock("GET", "/api/query")
                    .match_query(mockito::Matcher::AllOf(vec![
                        mockito::Matcher::UrlEncoded("search_query".into(), "au:smith".into()),
                        mockito::Matcher::UrlEncoded("start".into(), start.to_string()),
                    ]))
                    .with_body(page(25, start, 10))
                    .expect(1)
                    .create_async()
                    .await,
            );
        }

        let source = ArxivSource::new(
            Arc::new(HttpClient::new().unwrap()),
            format!("{}/api/query", server.url()),
            Throttle::none(),
        );
        let mut pages = source.paginate(SearchParams::query("au:smith"));
        let mut count = 0;
        while let Some(_feed) = pages.next_page().await.unwrap() {
            count += 1;
        }

        assert_eq!(count, 3);
        assert!(pages.is_done());
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_pagination_waits_before_every_request() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for start in [0, 10, 20] {
            mocks.push(
                server
                    .mock("GET", "/api/query")
                    .match_query(mockito::Matcher::UrlEncoded("start".into(), start.to_string()))
                    .with_body(page(25, start, 10))
                    .expect(1)
                    .create_async()
                    .await,
            );
        }

        let delay = std::time::Duration::from_millis(100);
        let source = ArxivSource::new(
            Arc::new(HttpClient::new().unwrap()),
            format!("{}/api/query", server.url()),
            Throttle::new(delay),
        );
        let mut pages = source.paginate(SearchParams::query("au:smith"));

        let started = std::time::Instant::now();
        let mut count = 0;
        while let Some(_feed) = pages.next_page().await.unwrap() {
            count += 1;
        }

        assert_eq!(count, 3);
        assert!(started.elapsed() >= delay * 3);
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_pagination_zero_items_per_page_terminates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::Any)
            .with_body(page(25, 0, 0))
            .expect(1)
            .create_async()
            .await;

        let source = ArxivSource::new(
            Arc::new(HttpClient::new().unwrap()),
            format!("{}/api/query", server.url()),
            Throttle::none(),
        );
        let mut pages = source.paginate(SearchParams::query("au:smith"));
        assert!(pages.next_page().await.unwrap().is_some());
        assert!(pages.next_page().await.unwrap().is_none());
        mock.assert_async().await;
    }
}
