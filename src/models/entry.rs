//! arXiv search results: the Atom feed and its entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::clean_string;

/// One page of search results plus OpenSearch pagination metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    pub title: String,

    pub id: String,

    pub updated: String,

    /// `opensearch:totalResults`
    pub total_results: usize,

    /// `opensearch:startIndex`
    pub start_index: usize,

    /// `opensearch:itemsPerPage`
    pub items_per_page: usize,

    pub entries: Vec<Entry>,
}

/// A single search result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entry {
    /// Abstract page URL, e.g. `http://arxiv.org/abs/2101.00001v2`
    pub id: String,

    pub updated: Option<DateTime<Utc>>,

    pub published: Option<DateTime<Utc>>,

    /// Whitespace-normalized title
    pub title: String,

    pub summary: String,

    pub authors: Vec<Author>,

    /// `arxiv:doi`
    pub doi: String,

    pub links: Vec<Link>,

    /// `arxiv:comment`
    pub comment: String,

    /// `arxiv:journal_ref`
    pub journal_ref: String,

    /// `arxiv:primary_category`
    pub primary_category: Option<Category>,

    pub categories: Vec<Category>,

    /// Href of the last link titled `pdf`, if any
    pub pdf: Option<String>,
}

impl Entry {
    /// Normalize the title and resolve the PDF link.
    ///
    /// Called once after parsing; the resolved PDF is always one of `links`.
    pub fn finish(mut self) -> Self {
        self.title = clean_string(&self.title);
        self.summary = self.summary.trim().to_string();
        self.pdf = self
            .links
            .iter()
            .rfind(|link| link.title == "pdf")
            .map(|link| link.href.clone());
        self
    }

    /// Publication date as `YYYY-MM-DD`
    pub fn published_date(&self) -> String {
        self.published
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// Category terms in feed order, primary category first, without duplicates
    pub fn category_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = Vec::new();
        for category in self.primary_category.iter().chain(self.categories.iter()) {
            if !category.term.is_empty() && !terms.contains(&category.term) {
                terms.push(category.term.clone());
            }
        }
        terms
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,

    /// `arxiv:affiliation`
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    pub title: String,
    #[serde(rename = "type")]
    pub link_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub term: String,
    pub scheme: String,
}

impl Category {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            scheme: String::new(),
        }
    }
}
