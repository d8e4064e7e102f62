//! DOI registration records (CSL-JSON as served by doi.org content negotiation).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::de;

/// Sentinel returned by [`join_date_parts`] for unusable dates
pub const INVALID_DATE: &str = "invalid date";

/// One work keyed by DOI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoiRecord {
    #[serde(rename = "DOI", default, deserialize_with = "de::string")]
    pub doi: String,

    #[serde(default, deserialize_with = "de::string")]
    pub publisher: String,

    #[serde(default, deserialize_with = "de::string")]
    pub title: String,

    #[serde(default, deserialize_with = "de::string")]
    pub r#abstract: String,

    #[serde(rename = "type", default, deserialize_with = "de::string")]
    pub work_type: String,

    #[serde(default)]
    pub issued: Option<DateParts>,

    #[serde(default)]
    pub published: Option<DateParts>,

    #[serde(rename = "published-print", default)]
    pub published_print: Option<DateParts>,

    #[serde(rename = "published-online", default)]
    pub published_online: Option<DateParts>,

    #[serde(default)]
    pub created: Option<DateParts>,

    #[serde(rename = "author", default)]
    pub authors: Vec<DoiAuthor>,

    #[serde(rename = "ISSN", default, deserialize_with = "de::strings")]
    pub issn: Vec<String>,

    #[serde(rename = "container-title", default, deserialize_with = "de::string")]
    pub container_title: String,

    #[serde(default, deserialize_with = "de::string")]
    pub volume: String,

    #[serde(default, deserialize_with = "de::string")]
    pub issue: String,

    #[serde(default, deserialize_with = "de::string")]
    pub page: String,

    #[serde(default, deserialize_with = "de::string")]
    pub language: String,

    #[serde(default, deserialize_with = "de::strings")]
    pub subject: Vec<String>,

    /// Landing page URL
    #[serde(rename = "URL", default, deserialize_with = "de::string")]
    pub url: String,

    /// Candidate full-text links
    #[serde(rename = "link", default)]
    pub links: Vec<DoiLink>,
}

impl DoiRecord {
    /// The issued date, falling back to the published and created dates
    pub fn issued_date(&self) -> String {
        [&self.issued, &self.published, &self.created]
            .into_iter()
            .flatten()
            .find(|d| !d.is_empty())
            .map(join_date_parts)
            .unwrap_or_else(|| INVALID_DATE.to_string())
    }

    /// Last link that is a PDF by content type or by URL
    pub fn pdf_link(&self) -> Option<&str> {
        self.links
            .iter()
            .rfind(|l| l.is_pdf())
            .map(|l| l.url.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoiAuthor {
    #[serde(default, deserialize_with = "de::string")]
    pub given: String,

    #[serde(default, deserialize_with = "de::string")]
    pub family: String,

    /// Organizational author name, used when `family` is absent
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,

    #[serde(default, deserialize_with = "de::string")]
    pub sequence: String,

    #[serde(default)]
    pub affiliation: Vec<Affiliation>,
}

impl DoiAuthor {
    /// `Family, Given`
    pub fn display_name(&self) -> String {
        if self.family.is_empty() && !self.name.is_empty() {
            return self.name.clone();
        }
        format!("{}, {}", self.family, self.given)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Affiliation {
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoiLink {
    #[serde(rename = "URL", default, deserialize_with = "de::string")]
    pub url: String,

    #[serde(rename = "content-type", default, deserialize_with = "de::string")]
    pub content_type: String,

    #[serde(rename = "content-version", default, deserialize_with = "de::string")]
    pub content_version: String,

    #[serde(rename = "intended-application", default, deserialize_with = "de::string")]
    pub intended_application: String,
}

impl DoiLink {
    pub fn is_pdf(&self) -> bool {
        self.content_type == "application/pdf" || self.url.to_lowercase().contains("pdf")
    }
}

/// Precision-tiered date: `{"date-parts": [[year, month?, day?]]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i32>>>,
}

impl DateParts {
    pub fn new(parts: &[i32]) -> Self {
        Self {
            date_parts: vec![parts.iter().copied().map(Some).collect()],
        }
    }

    /// No usable first date; Crossref sends `[[null]]` for unknown dates
    pub fn is_empty(&self) -> bool {
        self.date_parts
            .first()
            .map_or(true, |d| d.is_empty() || d.contains(&None))
    }
}

/// Join the first date of `parts` into an EDTF date.
///
/// One component is the year as-is, two become `YYYY-MM`, three
/// `YYYY-MM-DD`. Anything that is not a real calendar date yields
/// [`INVALID_DATE`].
pub fn join_date_parts(parts: &DateParts) -> String {
    let Some(first) = parts.date_parts.first() else {
        return INVALID_DATE.to_string();
    };
    let Some(components) = first.iter().copied().collect::<Option<Vec<i32>>>() else {
        return INVALID_DATE.to_string();
    };

    let calendar = |year: i32, month: i32, day: i32| {
        let month = u32::try_from(month).ok()?;
        let day = u32::try_from(day).ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    };

    let joined = match components.as_slice() {
        [year] => Some(year.to_string()),
        [year, month] => calendar(*year, *month, 1).map(|d| d.format("%Y-%m").to_string()),
        [year, month, day] => {
            calendar(*year, *month, *day).map(|d| d.format("%Y-%m-%d").to_string())
        }
        _ => None,
    };

    joined.unwrap_or_else(|| INVALID_DATE.to_string())
}
