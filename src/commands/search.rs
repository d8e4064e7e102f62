//! `papercut search arxiv`

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::io::Write;

use super::Context;
use crate::output::{ArxivRow, CsvOutput, ARXIV_HEADER};
use crate::sources::directory::fetch_emails;
use crate::sources::{
    extract_identifier, ArxivSource, MetadataSource, OaiRecord, OaiSource, SearchParams,
    SourceError, Taxonomy,
};
use crate::utils::PdfDownloader;

/// Options for `search arxiv`
#[derive(Debug, Clone, Default)]
pub struct SearchArxivArgs {
    /// Search API url; the configured endpoint when `None`
    pub url: Option<String>,
    pub query: Option<String>,
    pub ids: Option<String>,
    /// Directory page to scrape author emails from; one search per email
    pub emails_from: Option<String>,
    pub start: usize,
    pub results: usize,
    pub download_pdfs: bool,
}

impl SearchArxivArgs {
    /// Search requests to run, in order
    async fn searches(&self, ctx: &Context) -> Result<Vec<SearchParams>> {
        let pages = |params: SearchParams| params.start(self.start).max_results(self.results);

        if let Some(url) = &self.emails_from {
            let emails = fetch_emails(&ctx.client, url).await?;
            return Ok(emails.into_iter().map(|e| pages(SearchParams::query(e))).collect());
        }

        let query = self.query.clone().filter(|q| !q.is_empty());
        let ids = self.ids.clone().filter(|i| !i.is_empty());
        if query.is_none() && ids.is_none() {
            bail!("query or ids required.");
        }

        Ok(vec![pages(SearchParams {
            query,
            ids,
            start: 0,
            max_results: 10,
        })])
    }
}

/// Run every search, enrich each entry and write one CSV row per paper.
///
/// Papers returned by more than one search are written once.
pub async fn search_arxiv<W: Write>(ctx: &Context, args: &SearchArxivArgs, out: W) -> Result<()> {
    let searches = args.searches(ctx).await?;
    let endpoints = &ctx.config.endpoints;
    let throttle = ctx.config.throttle();

    let arxiv = ArxivSource::new(
        ctx.client.clone(),
        args.url.clone().unwrap_or_else(|| endpoints.arxiv_api.clone()),
        throttle,
    );
    let oai = OaiSource::new(
        ctx.client.clone(),
        ctx.cache.clone(),
        endpoints.arxiv_oai.clone(),
        throttle,
    );
    let pdfs = args
        .download_pdfs
        .then(|| PdfDownloader::new(ctx.client.clone(), ctx.config.downloads.arxiv_dir()));
    let taxonomy = Taxonomy::fetch(&ctx.client, &endpoints.arxiv_taxonomy).await;
    if taxonomy.is_empty() {
        tracing::debug!("No category labels, subjects keep their raw terms");
    }

    let mut csv = CsvOutput::new(out, &ARXIV_HEADER)?;
    let mut seen = HashSet::new();

    for params in searches {
        tracing::info!(
            "Searching arXiv for {}",
            params.query.as_deref().or(params.ids.as_deref()).unwrap_or_default()
        );
        let mut pages = arxiv.paginate(params);

        loop {
            let feed = match pages.next_page().await {
                Ok(Some(feed)) => feed,
                Ok(None) => break,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Could not read search results: {}", e);
                    break;
                }
            };

            for entry in feed.entries {
                let id = extract_identifier(&entry.id)?;
                if !seen.insert(id.clone()) {
                    tracing::debug!("{} already written", id);
                    continue;
                }

                let record = match oai.get_by_id(&id).await {
                    Ok(record) => record,
                    Err(SourceError::NotFound(e)) => {
                        tracing::warn!("No OAI record for {}: {}", id, e);
                        OaiRecord::default()
                    }
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!("Skipping {}: {}", id, e);
                        continue;
                    }
                };

                let subjects = entry
                    .category_terms()
                    .iter()
                    .map(|term| taxonomy.label(term))
                    .collect();

                let file = match (&pdfs, entry.pdf.as_deref()) {
                    (Some(pdfs), Some(url)) => pdfs.fetch(&id, url).await,
                    (None, Some(url)) => url.to_string(),
                    (_, None) => String::new(),
                };

                csv.write_row(&ArxivRow::new(&id, &entry, &record, subjects, file))?;
            }
        }
    }

    Ok(())
}
