//! Utility modules supporting papercut's fetch pipeline.
//!
//! - [`HttpClient`]: GET with the browser user agent, plus a no-redirect variant
//! - [`CacheService`]: stale-forever file cache keyed by [`CacheKey`]
//! - [`PdfDownloader`]: content-addressed PDF downloads
//! - [`Throttle`]: fixed delay between rate-limited requests
//! - text helpers for titles and whitespace cleanup
//!
//! # Fetch through the cache
//!
//! ```rust,no_run
//! use papercut::utils::{CacheKey, CacheService, HttpClient};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let cache = CacheService::new(std::env::temp_dir().join("papercut"));
//! let body = cache
//!     .fetch_or_cache(
//!         &client,
//!         &CacheKey::doi_record("10.1000/xyz123"),
//!         "https://dx.doi.org/10.1000/xyz123",
//!         "application/json",
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod http;
mod pdf;
mod text;
mod throttle;

pub use cache::{CacheKey, CacheService, CacheStats};
pub use http::{Fetched, HttpClient, BROWSER_USER_AGENT};
pub use pdf::PdfDownloader;
pub use text::{
    clean_string, collapse_whitespace, full_title, push_unique, trim_to_max_len, MAX_TITLE_LEN,
};
pub use throttle::Throttle;
