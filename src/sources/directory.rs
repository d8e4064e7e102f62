//! Author email addresses scraped from a directory listing page.

use regex::Regex;
use std::sync::LazyLock;

use crate::sources::{SourceError, ACCEPT_HTML};
use crate::utils::{push_unique, HttpClient};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

/// Every email address in `html`, in page order, without duplicates
pub fn extract_emails(html: &str) -> Vec<String> {
    let mut emails = Vec::new();
    for m in EMAIL.find_iter(html) {
        push_unique(&mut emails, m.as_str().to_string());
    }
    emails
}

/// Fetch a directory listing and extract its email addresses
pub async fn fetch_emails(client: &HttpClient, url: &str) -> Result<Vec<String>, SourceError> {
    let fetched = client.fetch(url, ACCEPT_HTML).await?;
    if !fetched.is_success() {
        return Err(SourceError::Api(format!(
            "{} returned status {}",
            url, fetched.status
        )));
    }
    let emails = extract_emails(&String::from_utf8_lossy(&fetched.body));
    tracing::info!("Found {} email addresses at {}", emails.len(), url);
    Ok(emails)
}
