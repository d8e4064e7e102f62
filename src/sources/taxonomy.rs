//! arXiv category labels.
//!
//! Labels are scraped once per run from the category taxonomy page. Each
//! term is rendered as `Group--Label`, where the group comes from the term's
//! archive prefix.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::sources::ACCEPT_HTML;
use crate::utils::HttpClient;

/// arXiv category taxonomy page
pub const ARXIV_TAXONOMY_URL: &str = "https://arxiv.org/category_taxonomy";

static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<h4>([a-z\-]+(?:\.[A-Z]+)?) <span>\(([^)]+)\)</span></h4>").unwrap()
});

/// Archive prefix to group name; any other prefix is Physics
const GROUPS: [(&str, &str); 7] = [
    ("cs", "Computer Science"),
    ("econ", "Economics"),
    ("eess", "Electrical Engineering and Systems Science"),
    ("math", "Mathematics"),
    ("q-bio", "Quantitative Biology"),
    ("q-fin", "Quantitative Finance"),
    ("stat", "Statistics"),
];

/// Extract `term -> label` pairs from taxonomy HTML
pub fn transform_labels(html: &str) -> HashMap<String, String> {
    LABEL
        .captures_iter(html)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// Group name for a category term such as `cs.AI` or `hep-th`
pub fn category_group(term: &str) -> &'static str {
    let prefix = term.split('.').next().unwrap_or(term);
    GROUPS
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, group)| *group)
        .unwrap_or("Physics")
}

/// Term to label table
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    labels: HashMap<String, String>,
}

impl Taxonomy {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// Scrape the taxonomy page. Failures are logged and give an empty table.
    pub async fn fetch(client: &HttpClient, url: &str) -> Self {
        match client.fetch(url, ACCEPT_HTML).await {
            Ok(fetched) if fetched.is_success() => {
                let labels = transform_labels(&String::from_utf8_lossy(&fetched.body));
                tracing::debug!("Loaded {} category labels", labels.len());
                Self::new(labels)
            }
            Ok(fetched) => {
                tracing::warn!("Category taxonomy returned status {}", fetched.status);
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Error fetching category taxonomy: {}", e);
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `Group--Label` for `term`; an unknown term keeps the term as label
    pub fn label(&self, term: &str) -> String {
        let label = self.labels.get(term).map(String::as_str).unwrap_or(term);
        format!("{}--{}", category_group(term), label)
    }
}
