//! Data models for upstream records.
//!
//! - [`Feed`] / [`Entry`]: arXiv search results
//! - [`DoiRecord`]: DOI registration metadata
//! - [`PolicyResponse`]: Sherpa Romeo publisher policies

mod de;
mod entry;
mod policy;
mod record;

pub use entry::{Author, Category, Entry, Feed, Link};
pub use policy::{
    Embargo, License, Location, PermittedOa, PolicyResponse, Publication, PublisherPolicy,
    ALLOWED_LOCATIONS,
};
pub use record::{
    join_date_parts, Affiliation, DateParts, DoiAuthor, DoiLink, DoiRecord, INVALID_DATE,
};
