//! PDF download into a content-addressed directory.
//!
//! Files are named by the MD5 hex digest of the record identifier (the DOI
//! or arXiv id), so the same record always lands at the same path and a
//! second run skips files it already has.

use std::path::PathBuf;
use std::sync::Arc;

use crate::utils::HttpClient;

/// Downloads PDFs into a fixed output directory
#[derive(Debug, Clone)]
pub struct PdfDownloader {
    client: Arc<HttpClient>,
    directory: PathBuf,
}

impl PdfDownloader {
    pub fn new(client: Arc<HttpClient>, directory: impl Into<PathBuf>) -> Self {
        Self {
            client,
            directory: directory.into(),
        }
    }

    /// Local path for the PDF of `key`: `<directory>/<md5(key)>.pdf`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{:x}.pdf", md5::compute(key)))
    }

    /// Download `url` for `key` and return the value for the `file` column.
    ///
    /// Returns the local path when the file exists or the download succeeds.
    /// On failure the partial file is removed and the remote URL is returned.
    pub async fn fetch(&self, key: &str, url: &str) -> String {
        let path = self.path_for(key);
        if path.exists() {
            tracing::debug!("{} already downloaded to {}", key, path.display());
            return path.display().to_string();
        }

        if let Err(e) = std::fs::create_dir_all(&self.directory) {
            tracing::warn!(
                "Unable to create download directory {}: {}",
                self.directory.display(),
                e
            );
            return url.to_string();
        }

        match self.client.download_to(url, &path).await {
            Ok(bytes) => {
                tracing::info!("Saved {} ({} bytes)", path.display(), bytes);
                path.display().to_string()
            }
            Err(e) => {
                tracing::warn!("Error downloading PDF for {}: {}", key, e);
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!("Error deleting file {}: {}", path.display(), e),
                }
                url.to_string()
            }
        }
    }
}
