//! The interactive UI collaborator.
//!
//! When no identifier resolves, the pipeline asks a human: first to edit a search query seeded
//! with the document's text, then to pick one of the labelled search results. Both calls may block
//! for as long as the human takes; there is no timeout.

use super::*;

/// Editor and single-choice picker.
pub trait Interaction: Send + Sync {
  /// Lets the user edit `seed`. `None` means the edit was cancelled.
  fn edit(&self, seed: &str) -> Result<Option<String>>;

  /// Lets the user pick one of `labels`. Returns the index, or `None` when cancelled.
  fn select(&self, labels: &[String]) -> Result<Option<usize>>;
}

/// An [`Interaction`] that cancels everything, for unattended runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

impl Interaction for Unattended {
  fn edit(&self, _seed: &str) -> Result<Option<String>> { Ok(None) }

  fn select(&self, _labels: &[String]) -> Result<Option<usize>> { Ok(None) }
}
