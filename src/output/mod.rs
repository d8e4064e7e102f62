//! CSV output in the repository import format.
//!
//! Each command writes one fixed header and then one row per record to
//! stdout, flushing after every row so partial runs still leave usable output.
//! Multi-valued columns are joined with `|`.

use serde::Serialize;
use std::io::Write;

use crate::models::{DoiRecord, Entry};
use crate::sources::OaiRecord;
use crate::utils::{collapse_whitespace, full_title, push_unique, trim_to_max_len, MAX_TITLE_LEN};

/// Value of the `field_model` column
pub const MODEL_DIGITAL_DOCUMENT: &str = "Digital Document";

/// Separator for multi-valued columns
pub const MULTI_VALUE_SEPARATOR: &str = "|";

pub const ARXIV_HEADER: [&str; 12] = [
    "id",
    "field_edtf_date_issued",
    "title",
    "field_full_title",
    "field_abstract",
    "field_model",
    "field_linked_agent",
    "field_identifier",
    "field_rights",
    "field_subject",
    "field_note",
    "file",
];

pub const DOI_HEADER: [&str; 14] = [
    "id",
    "field_edtf_date_issued",
    "title",
    "field_full_title",
    "field_abstract",
    "field_model",
    "field_linked_agent",
    "field_identifier",
    "field_related_item",
    "field_extent",
    "field_language",
    "field_rights",
    "field_subject",
    "file",
];

pub const LICENSE_HEADER: [&str; 2] = ["id", "field_rights"];

/// CSV writer with a fixed header
pub struct CsvOutput<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvOutput<W> {
    /// Wrap `out` and write `header` immediately
    pub fn new(out: W, header: &[&str]) -> Result<Self, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(out);
        writer.write_record(header)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    /// Serialize one row (fields in header order) and flush
    pub fn write_row<S: Serialize>(&mut self, row: &S) -> Result<(), csv::Error> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, csv::Error> {
        self.writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

pub fn join_values(values: &[String]) -> String {
    values.join(MULTI_VALUE_SEPARATOR)
}

/// `relators:<role>:person:<name>`
pub fn person_agent(role: &str, name: &str) -> String {
    format!("relators:{}:person:{}", role, name)
}

/// `relators:pbl:corporate_body:<publisher>`
pub fn publisher_agent(publisher: &str) -> String {
    format!("relators:pbl:corporate_body:{}", publisher)
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
}

/// `{"attr0":"<kind>","value":"<value>"}`
pub fn identifier(kind: &str, value: &str) -> String {
    format!(r#"{{"attr0":"{}","value":{}}}"#, kind, json_string(value))
}

/// `{"type": "volume", "number": "<number>"}`
pub fn related_item(number: &str) -> String {
    format!(r#"{{"type": "volume", "number": {}}}"#, json_string(number))
}

/// `{"attr0": "page", "number": "<pages>"}`
pub fn page_extent(pages: &str) -> String {
    format!(r#"{{"attr0": "page", "number": {}}}"#, json_string(pages))
}

/// One row of `search arxiv`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArxivRow {
    pub id: String,
    pub field_edtf_date_issued: String,
    pub title: String,
    pub field_full_title: String,
    pub field_abstract: String,
    pub field_model: String,
    pub field_linked_agent: String,
    pub field_identifier: String,
    pub field_rights: String,
    pub field_subject: String,
    pub field_note: String,
    pub file: String,
}

impl ArxivRow {
    /// Build a row from a search entry and its OAI record.
    ///
    /// `subjects` are the already-labelled categories. Authors come from the
    /// OAI record, or from the feed when the record lists none.
    pub fn new(id: &str, entry: &Entry, oai: &OaiRecord, subjects: Vec<String>, file: String) -> Self {
        let mut agents = oai.linked_agents();
        if agents.is_empty() {
            agents = entry
                .authors
                .iter()
                .map(|a| person_agent("cre", &a.name))
                .collect();
        }

        let mut identifiers = vec![identifier("arxiv", id)];
        if !entry.doi.is_empty() {
            identifiers.push(identifier("doi", &entry.doi));
        }

        let mut notes = Vec::new();
        push_unique(&mut notes, collapse_whitespace(&entry.comment));
        push_unique(&mut notes, collapse_whitespace(&entry.journal_ref));

        Self {
            id: id.to_string(),
            field_edtf_date_issued: entry.published_date(),
            title: trim_to_max_len(&entry.title, MAX_TITLE_LEN),
            field_full_title: full_title(&entry.title),
            field_abstract: collapse_whitespace(&entry.summary),
            field_model: MODEL_DIGITAL_DOCUMENT.to_string(),
            field_linked_agent: join_values(&agents),
            field_identifier: join_values(&identifiers),
            field_rights: oai.license.clone(),
            field_subject: join_values(&subjects),
            field_note: join_values(&notes),
            file,
        }
    }
}

/// One row of `get doi`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoiRow {
    pub id: String,
    pub field_edtf_date_issued: String,
    pub title: String,
    pub field_full_title: String,
    pub field_abstract: String,
    pub field_model: String,
    pub field_linked_agent: String,
    pub field_identifier: String,
    pub field_related_item: String,
    pub field_extent: String,
    pub field_language: String,
    pub field_rights: String,
    pub field_subject: String,
    pub file: String,
}

impl DoiRow {
    pub fn new(doi: &str, record: &DoiRecord, rights: String, file: String) -> Self {
        let mut agents: Vec<String> = record
            .authors
            .iter()
            .map(|a| person_agent("aut", &a.display_name()))
            .collect();
        if !record.publisher.is_empty() {
            agents.push(publisher_agent(&record.publisher));
        }

        let record_doi = if record.doi.is_empty() { doi } else { &record.doi };
        let mut identifiers = vec![identifier("doi", record_doi)];
        identifiers.extend(record.issn.iter().map(|issn| identifier("issn", issn)));

        let related: Vec<String> = [&record.volume, &record.issue]
            .into_iter()
            .filter(|n| !n.is_empty())
            .map(|n| related_item(n))
            .collect();

        let extent = if record.page.is_empty() {
            String::new()
        } else {
            page_extent(&record.page)
        };

        Self {
            id: doi.to_string(),
            field_edtf_date_issued: record.issued_date(),
            title: trim_to_max_len(&record.title, MAX_TITLE_LEN),
            field_full_title: full_title(&record.title),
            field_abstract: record.r#abstract.clone(),
            field_model: MODEL_DIGITAL_DOCUMENT.to_string(),
            field_linked_agent: join_values(&agents),
            field_identifier: join_values(&identifiers),
            field_related_item: join_values(&related),
            field_extent: extent,
            field_language: record.language.clone(),
            field_rights: rights,
            field_subject: join_values(&record.subject),
            file,
        }
    }
}

/// One row of `get license`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LicenseRow {
    pub id: String,
    pub field_rights: String,
}
