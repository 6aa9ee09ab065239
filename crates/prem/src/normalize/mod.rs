//! Metadata normalizers, one per registry record shape.
//!
//! A normalizer is a pure function from a [`RawRecord`] to [`Metadata`]. It never performs I/O:
//! when a record is too malformed to normalize, the record travels back inside
//! [`PremError::MetadataExtraction`] and the caller decides where to dump it.
//!
//! Optional fields that a record lacks become empty strings. Only a missing title or a missing or
//! malformed date structure is an extraction error.

use crate::clients::RawRecord;

use super::*;

pub mod arxiv;
pub mod crossref;

/// CrossRef record types that denote a container of articles rather than an article.
pub const CONTAINER_TYPES: [&str; 8] = [
  "journal",
  "journal-issue",
  "journal-volume",
  "book-series",
  "book-set",
  "proceedings",
  "report-series",
  "standard-series",
];

/// Whether a registry record type denotes a container.
pub fn is_container_type(kind: &str) -> bool { CONTAINER_TYPES.contains(&kind) }

/// Builds the extraction error for `record`.
pub(crate) fn extraction_error(reason: impl Into<String>, record: &RawRecord) -> PremError {
  PremError::MetadataExtraction { reason: reason.into(), record: Box::new(record.clone()) }
}

/// Surname used for filenames: the last whitespace-separated token of a display name.
pub(crate) fn last_token(name: &str) -> String {
  name.split_whitespace().last().map(format::sanitize).unwrap_or_default()
}
