//! The rewrite engine: embed metadata into a PDF and store it under its new name.
//!
//! The new name is rendered and checked before the document is modified, the document is written
//! to a temporary sibling and moved into place, and the original is removed only after that move
//! succeeded. An interrupted run therefore leaves either the untouched original or both files.

use std::fs;

use crate::{pdf::PdfDocument, template};

use super::*;

/// Prefix of the temporary file written next to the target.
const TEMP_PREFIX: &str = ".prem-";

/// Renames and rewrites documents according to a filename template.
#[derive(Debug, Clone)]
pub struct Rewriter {
  /// Filename template
  template:  String,
  /// Whether rendered names are lower-cased
  lowercase: bool,
}

impl Default for Rewriter {
  fn default() -> Self { Self::new(template::DEFAULT_TEMPLATE, false) }
}

impl Rewriter {
  /// Creates a rewriter. See [`Rewriter::validate`] for checking the template early.
  pub fn new(template: impl Into<String>, lowercase: bool) -> Self {
    Self { template: template.into(), lowercase }
  }

  /// The configured template.
  pub fn template(&self) -> &str { &self.template }

  /// Checks that every placeholder of the template maps to a field.
  pub fn validate(&self) -> Result<()> { template::fields(&self.template).map(|_| ()) }

  /// The path `input` would be stored under, in the same directory.
  ///
  /// Fails with [`PremError::TargetExists`] when that path already belongs to a different file.
  pub fn plan(&self, input: &Path, metadata: &Metadata) -> Result<PathBuf> {
    let name = template::render(&self.template, metadata, self.lowercase)?;
    let target = input.parent().unwrap_or_else(|| Path::new("")).join(name);
    if target.exists() && !same_file(input, &target) {
      return Err(PremError::TargetExists(target));
    }
    Ok(target)
  }

  /// Merges `metadata` into `doc` and stores it under the planned name.
  ///
  /// Returns the path the document now lives at.
  pub fn apply(&self, doc: &mut dyn PdfDocument, metadata: &Metadata) -> Result<PathBuf> {
    let input = doc.path().to_path_buf();
    let target = self.plan(&input, metadata)?;

    doc.merge_metadata(metadata)?;

    let temp = temp_path(&target);
    if let Err(e) = doc.save(&temp).and_then(|()| Ok(fs::rename(&temp, &target)?)) {
      let _ = fs::remove_file(&temp);
      return Err(e);
    }
    debug!("Wrote {}", target.display());

    if !same_file(&input, &target) && input.exists() {
      fs::remove_file(&input)?;
      debug!("Removed {}", input.display());
    }
    Ok(target)
  }
}

/// Hidden sibling of `target` used while writing.
fn temp_path(target: &Path) -> PathBuf {
  let name = target.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
  target.with_file_name(format!("{TEMP_PREFIX}{name}"))
}

/// Whether both paths name the same file. Paths that cannot be resolved are compared as given.
fn same_file(a: &Path, b: &Path) -> bool {
  match (fs::canonicalize(a), fs::canonicalize(b)) {
    (Ok(a), Ok(b)) => a == b,
    _ => a == b,
  }
}
