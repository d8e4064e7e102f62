//! `papercut get doi`

use anyhow::{Context as _, Result};
use std::io::Write;
use std::path::PathBuf;

use super::{read_identifiers, Context};
use crate::output::{CsvOutput, DoiRow, DOI_HEADER};
use crate::sources::{DoiSource, SherpaSource};
use crate::utils::PdfDownloader;

/// Options for `get doi`
#[derive(Debug, Clone, Default)]
pub struct GetDoiArgs {
    /// File with one DOI per line
    pub file: PathBuf,
    /// DOI resolver url; the configured endpoint when `None`
    pub url: Option<String>,
    /// Fill `field_rights` from Sherpa Romeo
    pub license: bool,
    /// Skip PDF downloads
    pub no_pdf: bool,
}

/// Fetch each DOI record and write one CSV row per DOI.
///
/// Records that cannot be decoded are logged and skipped.
pub async fn get_doi<W: Write>(ctx: &Context, args: &GetDoiArgs, out: W) -> Result<()> {
    let dois = read_identifiers(&args.file)
        .with_context(|| format!("Error opening file {}", args.file.display()))?;

    let doi_source = DoiSource::new(
        ctx.client.clone(),
        ctx.cache.clone(),
        args.url.clone().unwrap_or_else(|| ctx.config.endpoints.doi.clone()),
    );
    let sherpa = if args.license {
        Some(SherpaSource::new(
            ctx.client.clone(),
            ctx.cache.clone(),
            ctx.config.endpoints.sherpa.clone(),
            ctx.config.api_keys.sherpa_romeo.clone(),
        )?)
    } else {
        None
    };
    let pdfs = (!args.no_pdf)
        .then(|| PdfDownloader::new(ctx.client.clone(), ctx.config.downloads.doi_dir()));

    let mut csv = CsvOutput::new(out, &DOI_HEADER)?;

    for doi in dois {
        let record = match doi_source.get_doi_record(&doi).await {
            Ok(record) => record,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", doi, e);
                continue;
            }
        };

        let file = match &pdfs {
            Some(pdfs) => match doi_source.resolve_pdf_url(&doi, &record).await {
                Ok(Some(url)) => pdfs.fetch(&doi, &url).await,
                Ok(None) => String::new(),
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Could not resolve PDF for {}: {}", doi, e);
                    String::new()
                }
            },
            None => record.pdf_link().unwrap_or_default().to_string(),
        };

        let rights = match &sherpa {
            Some(sherpa) => sherpa.find_license(&record.issn).await,
            None => String::new(),
        };

        csv.write_row(&DoiRow::new(&doi, &record, rights, file))?;
    }

    Ok(())
}
