//! `papercut get license`

use anyhow::{Context as _, Result};
use std::io::Write;
use std::path::PathBuf;

use super::{read_identifiers, Context};
use crate::output::{CsvOutput, LicenseRow, LICENSE_HEADER};
use crate::sources::{DoiSource, SherpaSource};

/// Options for `get license`
#[derive(Debug, Clone, Default)]
pub struct GetLicenseArgs {
    /// File with one DOI per line
    pub file: PathBuf,
    /// DOI resolver url; the configured endpoint when `None`
    pub url: Option<String>,
}

/// Resolve an open license for each DOI through its ISSNs.
///
/// Fails before writing anything when the Sherpa API key is missing.
pub async fn get_license<W: Write>(ctx: &Context, args: &GetLicenseArgs, out: W) -> Result<()> {
    let sherpa = SherpaSource::new(
        ctx.client.clone(),
        ctx.cache.clone(),
        ctx.config.endpoints.sherpa.clone(),
        ctx.config.api_keys.sherpa_romeo.clone(),
    )?;
    let dois = read_identifiers(&args.file)
        .with_context(|| format!("Error opening file {}", args.file.display()))?;
    let doi_source = DoiSource::new(
        ctx.client.clone(),
        ctx.cache.clone(),
        args.url.clone().unwrap_or_else(|| ctx.config.endpoints.doi.clone()),
    );

    let mut csv = CsvOutput::new(out, &LICENSE_HEADER)?;

    for doi in dois {
        let record = match doi_source.get_doi_record(&doi).await {
            Ok(record) => record,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", doi, e);
                continue;
            }
        };

        let field_rights = sherpa.find_license(&record.issn).await;
        csv.write_row(&LicenseRow { id: doi, field_rights })?;
    }

    Ok(())
}
