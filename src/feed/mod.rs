//! Feed extraction: RSS/Atom documents in, publishable records out.
//!
//! The module is organized into two submodules:
//!
//! - [`parser`] - Low-level feed parsing using the `feed-rs` crate
//! - [`extractor`] - Per-source fetch-parse-fetch loop producing [`Record`]s
//!
//! A failure on one source never aborts the others: the extractor logs the
//! failure and moves on, so a single dead feed degrades output instead of
//! stopping the pipeline.

mod extractor;
mod parser;

pub use extractor::{FeedExtractor, Record};
pub use parser::{parse_entries, Entry, ParseError};
