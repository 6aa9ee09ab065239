//! Text formatting utilities for registry strings and candidate labels.
//!
//! Registry titles routinely carry JATS/MathML markup, hard line breaks and
//! slashes. [`sanitize`] turns them into a single line that is safe both for
//! display and as a filename component.
//!
//! # Examples
//!
//! ```
//! use prem::format;
//!
//! let title = "The <i>a priori</i> method\n for  I/O  bounds";
//! assert_eq!(format::sanitize(title), "The a priori method for I O bounds");
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use super::*;

lazy_static! {
  /// An opening, closing or self-closing markup tag. A bare `<` or `>` is not a tag.
  static ref MARKUP_TAG: Regex =
    Regex::new(r"</?[A-Za-z][\w:.-]*(?:\s[^<>]*)?/?>").unwrap();
}

/// Cleans a display string for use in labels and filenames.
///
/// - Markup tags are dropped, keeping the text they wrap
/// - Newlines and forward slashes become spaces
/// - Runs of whitespace collapse to a single space, and the ends are trimmed
///
/// # Examples
///
/// ```
/// use prem::format;
///
/// assert_eq!(format::sanitize("Black holes\nand thermodynamics"), "Black holes and thermodynamics");
/// assert_eq!(format::sanitize("<jats:title>Spin</jats:title>"), "Spin");
/// assert_eq!(format::sanitize("   "), "");
/// ```
pub fn sanitize(text: &str) -> String {
  let text = MARKUP_TAG.replace_all(text, "");
  text.replace('/', " ").split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Renders the label a candidate is shown under during interactive selection.
pub fn candidate_label(metadata: &Metadata) -> String {
  format!("{} - {} - {}", metadata.year, metadata.author, metadata.short_title)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sanitize() {
    assert_eq!(sanitize("Hello World"), "Hello World");
    assert_eq!(sanitize("No    Extra    Spaces"), "No Extra Spaces");
    assert_eq!(sanitize("line\nbreak\r\nand\ttab"), "line break and tab");
    assert_eq!(sanitize("input/output"), "input output");
    assert_eq!(sanitize("H<sub>2</sub>O and <b>bold</b>"), "H2O and bold");
    assert_eq!(sanitize("a < b and c > d"), "a < b and c > d");
    assert_eq!(sanitize("Bounds for x < n and y > m"), "Bounds for x < n and y > m");
    assert_eq!(sanitize("<mml:math display=\"inline\">x</mml:math> <br/>spin"), "x spin");
    assert_eq!(sanitize(""), "");
  }

  #[test]
  fn test_sanitize_is_idempotent() {
    let once = sanitize(" <i>Spin</i>  glasses /\n a review ");
    assert_eq!(sanitize(&once), once);
  }

  #[test]
  fn test_candidate_label() {
    let metadata = Metadata {
      year: "1975".into(),
      author: "Hawking".into(),
      short_title: "Black holes and thermodynamics".into(),
      ..Metadata::default()
    };
    assert_eq!(candidate_label(&metadata), "1975 - Hawking - Black holes and thermodynamics");
  }
}
