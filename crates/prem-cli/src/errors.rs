//! Error types for the prem CLI.
//!
//! Per-file failures are printed and do not end the run. Only the errors below, which occur
//! before any file is processed, reach `main` and produce a non-zero exit code.

use thiserror::Error;

/// Errors that abort a prem run.
#[derive(Error, Debug)]
pub enum PremCliError {
  /// Invalid configuration, unreadable cache and other library failures
  #[error(transparent)]
  Prem(#[from] prem::errors::PremError),

  /// File system errors, e.g. an uncreatable log directory
  #[error(transparent)]
  IO(#[from] std::io::Error),

  /// Malformed glob patterns among the file arguments
  #[error(transparent)]
  Glob(#[from] glob::PatternError),

  /// The log file appender could not be created
  #[error(transparent)]
  LogFile(#[from] tracing_appender::rolling::InitError),
}
