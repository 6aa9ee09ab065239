//! Error types for the prem library.
//!
//! Failures are split by how the resolution pipeline is supposed to react to them:
//! - Soft outcomes ([`PremError::NotFound`], [`PremError::NotAnArticle`]) mean "try the next
//!   candidate" and never abort a file.
//! - Registry failures (transport, malformed responses, failed queries) end processing of the
//!   current file but not of the batch.
//! - Rewrite failures ([`PremError::TemplateFieldMissing`], [`PremError::TargetExists`]) are
//!   raised before any file is touched.
//!
//! # Examples
//!
//! ```no_run
//! use prem::errors::PremError;
//!
//! fn report(err: &PremError) {
//!   match err {
//!     e if e.is_recoverable() => println!("skipping: {e}"),
//!     PremError::RegistryUnavailable(e) => println!("registry down: {e}"),
//!     e => println!("failed: {e}"),
//!   }
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::clients::RawRecord;

/// Error type alias used for the [`prem`](crate) crate.
pub type Result<T> = core::result::Result<T, PremError>;

/// Errors that can occur while resolving and rewriting a PDF.
#[derive(Error, Debug)]
pub enum PremError {
  /// The identifier is well formed but the registry has no record for it.
  #[error("No record found for {0}")]
  NotFound(String),

  /// The registry record exists but denotes a container (issue, volume, journal) instead of an
  /// article. The string is the record type reported by the registry.
  #[error("Record is a {0}, not an article")]
  NotAnArticle(String),

  /// The registry could not be reached.
  ///
  /// This can occur when:
  /// - The network is unavailable
  /// - The server is unreachable
  /// - The request times out
  /// - TLS/SSL errors occur
  #[error("Registry unavailable: {0}")]
  RegistryUnavailable(String),

  /// The registry answered, but the body could not be parsed as the expected JSON or XML.
  #[error("Malformed registry response: {0}")]
  RegistryResponse(String),

  /// A free-text query was answered with a non-success status.
  #[error("Query for \"{query}\" failed with HTTP status {status}")]
  QueryFailed {
    /// HTTP status returned by the registry
    status: u16,
    /// The query text that was sent
    query:  String,
  },

  /// The source does not offer free-text search.
  #[error("{0} does not support free-text queries")]
  QueryUnsupported(String),

  /// A registry record is present but lacks the structure needed for normalization.
  ///
  /// The raw record travels with the error so it can be written to a diagnostic dump before the
  /// error is reported.
  #[error("Could not extract metadata: {reason}")]
  MetadataExtraction {
    /// What was missing or malformed
    reason: String,
    /// The offending record, verbatim
    record: Box<RawRecord>,
  },

  /// A filename template placeholder does not name a metadata field.
  #[error("Template placeholder {{{0}}} does not name a metadata field")]
  TemplateFieldMissing(String),

  /// A caller-supplied identifier pattern is not a valid regular expression.
  #[error("Invalid identifier pattern: {0}")]
  BadPattern(#[from] regex::Error),

  /// A PDF metadata value has a type that cannot be turned into text.
  #[error("Unsupported PDF metadata value for key {0}")]
  UnsupportedMetadataValue(String),

  /// The rendered filename already belongs to a different file.
  #[error("Refusing to overwrite existing file {0}")]
  TargetExists(PathBuf),

  /// PDF parsing and processing errors from the lopdf library.
  #[error(transparent)]
  Pdf(#[from] lopdf::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// JSON (de)serialization failed outside of registry parsing, e.g. in the cache.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A SQLite operation failed.
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// An async SQLite operation failed.
  #[error(transparent)]
  AsyncSqlite(#[from] tokio_rusqlite::Error),

  /// Failed to parse a URL.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// The configuration file could not be parsed.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// The configuration is invalid.
  #[error("{0}")]
  Config(String),

  /// Writing the XMP packet failed.
  #[error("XMP error: {0}")]
  Xmp(String),
}

impl PremError {
  /// Whether the pipeline should move on to the next candidate instead of failing the file.
  ///
  /// Only "nothing exists for this identifier" and "this is not an article" qualify; transport,
  /// parse and template failures are real defects and must surface.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, PremError::NotFound(_) | PremError::NotAnArticle(_))
  }
}

impl From<reqwest::Error> for PremError {
  fn from(e: reqwest::Error) -> Self { PremError::RegistryUnavailable(e.to_string()) }
}
