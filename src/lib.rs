//! # papercut
//!
//! Harvests bibliographic metadata from arXiv, DOI registration agencies and
//! Sherpa Romeo, and writes it as CSV for a repository ingest pipeline.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Decoded upstream records (feed entries, DOI records, policies)
//! - [`sources`]: One client per upstream service, plus the `MetadataSource` trait
//! - [`output`]: CSV schemas and row builders
//! - [`commands`]: The CLI commands wired from the above
//! - [`utils`]: HTTP client, disk cache, PDF downloads, throttling and text helpers
//! - [`config`]: Configuration management

pub mod commands;
pub mod config;
pub mod models;
pub mod output;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use sources::{MetadataSource, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
