//! The resolution pipeline.
//!
//! One PDF goes through three stages, stopping at the first that yields metadata:
//!
//! 1. **Metadata scan**: identifiers in the document information dictionary.
//! 2. **Text scan**: identifiers in the text of the first pages.
//! 3. **Manual query**: the user edits a search query, and picks one of the labelled matches.
//!
//! "Not found" and "not an article" answers move on to the next candidate. Transport, parse and
//! extraction failures end the pipeline for this document with an error.

use crate::{clients::Registry, identifier::CandidateIdentifier, interaction::Interaction, pdf::PdfDocument};

use super::*;

/// Default number of pages whose text is scanned.
pub const DEFAULT_PAGES: usize = 3;

/// Terminal state of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
  /// Metadata for the document was found.
  Resolved(Metadata),
  /// Every stage was exhausted; nothing should be written.
  Unresolved,
}

/// Runs the resolution stages against an ordered list of registries.
pub struct Resolver {
  /// Sources, in the order they are tried
  registries:  Vec<Arc<dyn Registry>>,
  /// Human in the loop for the manual query stage
  interaction: Arc<dyn Interaction>,
  /// Number of leading pages scanned for identifiers
  pages:       usize,
  /// Whether the manual query stage runs at all
  interactive: bool,
}

impl Resolver {
  /// Creates a resolver scanning [`DEFAULT_PAGES`] pages, with the manual query stage enabled.
  pub fn new(registries: Vec<Arc<dyn Registry>>, interaction: Arc<dyn Interaction>) -> Self {
    Self { registries, interaction, pages: DEFAULT_PAGES, interactive: true }
  }

  /// Sets how many leading pages are scanned.
  pub fn with_pages(mut self, pages: usize) -> Self {
    self.pages = pages;
    self
  }

  /// Enables or disables the manual query stage.
  pub fn with_interactive(mut self, interactive: bool) -> Self {
    self.interactive = interactive;
    self
  }

  /// Resolves `doc` to normalized metadata.
  pub async fn resolve(&self, doc: &dyn PdfDocument) -> Result<Resolution> {
    if let Some(metadata) = self.metadata_scan(doc).await? {
      return Ok(Resolution::Resolved(metadata));
    }

    let text = doc.pages_to_text(self.pages);
    if let Some(metadata) = self.text_scan(&text).await? {
      return Ok(Resolution::Resolved(metadata));
    }

    if !self.interactive {
      debug!("Skipping manual query for {}", doc.path().display());
      return Ok(Resolution::Unresolved);
    }
    Ok(match self.manual_query(&text).await? {
      Some(metadata) => Resolution::Resolved(metadata),
      None => Resolution::Unresolved,
    })
  }

  /// Tries the first identifier each source recognizes in the information dictionary.
  async fn metadata_scan(&self, doc: &dyn PdfDocument) -> Result<Option<Metadata>> {
    let info = doc.metadata()?;
    for registry in &self.registries {
      let candidates = registry.pattern().find_in_metadata(&info)?;
      let Some(candidate) = candidates.first() else { continue };
      debug!("Found {candidate} in the metadata of {}", doc.path().display());
      if let Some(metadata) = self.try_candidate(registry.as_ref(), candidate).await? {
        return Ok(Some(metadata));
      }
    }
    Ok(None)
  }

  /// Tries every distinct identifier in `text`, source by source.
  async fn text_scan(&self, text: &str) -> Result<Option<Metadata>> {
    for registry in &self.registries {
      for candidate in registry.pattern().find_all(text) {
        debug!("Found {candidate} in the document text");
        if let Some(metadata) = self.try_candidate(registry.as_ref(), &candidate).await? {
          return Ok(Some(metadata));
        }
      }
    }
    Ok(None)
  }

  /// Resolves one candidate, turning recoverable failures into `None`.
  async fn try_candidate(
    &self,
    registry: &dyn Registry,
    candidate: &CandidateIdentifier,
  ) -> Result<Option<Metadata>> {
    match registry.resolve(&candidate.value).await {
      Ok(metadata) => {
        info!("Resolved {candidate} via {}", registry.name());
        Ok(Some(metadata))
      },
      Err(e) if e.is_recoverable() => {
        info!("Skipping {candidate}: {e}");
        Ok(None)
      },
      Err(e) => Err(e),
    }
  }

  /// Asks the user for a query, searches, and lets them pick a match.
  async fn manual_query(&self, text: &str) -> Result<Option<Metadata>> {
    let Some(registry) = self.registries.iter().find(|registry| registry.supports_query()) else {
      info!("No configured source supports title search");
      return Ok(None);
    };

    let query = match self.interaction.edit(text)? {
      Some(query) if !format::sanitize(&query).is_empty() => format::sanitize(&query),
      _ => {
        info!("Query cancelled");
        return Ok(None);
      },
    };

    let mut matches = Vec::new();
    for record in registry.query_by_title(&query).await? {
      match registry.normalize(&record) {
        Ok(metadata) => matches.push(metadata),
        Err(e) => warn!("Skipping search result: {e}"),
      }
    }
    if matches.is_empty() {
      info!("No usable matches for {query:?}");
      return Ok(None);
    }

    let labels: Vec<String> = matches.iter().map(format::candidate_label).collect();
    match self.interaction.select(&labels)? {
      Some(index) if index < matches.len() => Ok(Some(matches.swap_remove(index))),
      Some(index) => {
        warn!("Selection {index} is out of range");
        Ok(None)
      },
      None => Ok(None),
    }
  }
}
