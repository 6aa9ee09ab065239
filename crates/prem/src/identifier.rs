//! Identifier patterns for the supported schemes.
//!
//! Each [`Scheme`] has a default [`IdentifierPattern`] recognizing an *article* identifier in
//! arbitrary text. Matching never fails: text without an identifier simply yields no candidates.
//!
//! ```
//! use prem::identifier::{IdentifierPattern, Scheme};
//!
//! let doi = IdentifierPattern::doi();
//! let found = doi.find_all("Phys. Rev. D 13, 191, doi:10.1103/PhysRevD.13.191.");
//! assert_eq!(found[0].value, "10.1103/PhysRevD.13.191");
//!
//! // Volume-level DOIs qualified by an ISSN are not articles.
//! assert!(doi.find_all("10.1002/(ISSN)1521-3773").is_empty());
//! ```

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::*;
use crate::pdf::MetadataValue;

lazy_static! {
  /// A DOI: registrant prefix, slash, suffix of the characters CrossRef recommends.
  static ref DOI: Regex = Regex::new(r"10\.\d{4,9}/[A-Za-z0-9./:;()\-_]+").unwrap();
  /// DOIs whose suffix starts with an ISSN qualifier denote a journal or volume.
  static ref DOI_ISSN: Regex = Regex::new(r"^10\.\d{4,9}/\(ISSN\)").unwrap();
  /// New-style arXiv identifier `YYMM.NNNNN` with an optional version; `MM` is a month.
  static ref ARXIV: Regex =
    Regex::new(r"\b\d{2}(?:0[1-9]|1[0-2])\.\d{4,5}(?:v\d+)?\b").unwrap();
}

/// The identifier schemes prem knows how to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
  /// Digital Object Identifier, `10.<registrant>/<suffix>`
  Doi,
  /// arXiv preprint identifier, `YYMM.NNNNN`
  Arxiv,
}

impl Scheme {
  /// Prefix used for the scheme in `dc:identifier`, e.g. `doi:10.1103/PhysRevD.13.191`.
  pub fn prefix(&self) -> &'static str {
    match self {
      Scheme::Doi => "doi",
      Scheme::Arxiv => "arXiv",
    }
  }
}

impl std::fmt::Display for Scheme {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Scheme::Doi => write!(f, "DOI"),
      Scheme::Arxiv => write!(f, "arXiv"),
    }
  }
}

/// An unverified identifier-shaped substring found in a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateIdentifier {
  /// Scheme the value was matched under
  pub scheme: Scheme,
  /// The matched identifier, trimmed of trailing punctuation
  pub value:  String,
}

impl std::fmt::Display for CandidateIdentifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.scheme.prefix(), self.value)
  }
}

/// A compiled matcher for one identifier scheme.
#[derive(Debug, Clone)]
pub struct IdentifierPattern {
  /// Scheme the matches belong to
  scheme:  Scheme,
  /// Regex locating identifiers in text
  matcher: Regex,
  /// Matches that also match this regex are not article identifiers
  exclude: Option<Regex>,
}

impl IdentifierPattern {
  /// The default DOI pattern, excluding ISSN-qualified volume DOIs.
  pub fn doi() -> Self {
    Self { scheme: Scheme::Doi, matcher: DOI.clone(), exclude: Some(DOI_ISSN.clone()) }
  }

  /// The default arXiv pattern.
  pub fn arxiv() -> Self { Self { scheme: Scheme::Arxiv, matcher: ARXIV.clone(), exclude: None } }

  /// The default pattern for `scheme`.
  pub fn for_scheme(scheme: Scheme) -> Self {
    match scheme {
      Scheme::Doi => Self::doi(),
      Scheme::Arxiv => Self::arxiv(),
    }
  }

  /// Builds a pattern for `scheme` from a caller-supplied regular expression.
  ///
  /// The scheme's exclusions still apply. An invalid expression is rejected with
  /// [`PremError::BadPattern`] before any matching is attempted.
  pub fn custom(scheme: Scheme, pattern: &str) -> Result<Self> {
    let matcher = Regex::new(pattern)?;
    Ok(Self { matcher, ..Self::for_scheme(scheme) })
  }

  /// The scheme this pattern recognizes.
  pub fn scheme(&self) -> Scheme { self.scheme }

  /// Returns every distinct identifier in `text`, in order of first appearance.
  pub fn find_all(&self, text: &str) -> Vec<CandidateIdentifier> {
    let mut seen = HashSet::new();
    self
      .matcher
      .find_iter(text)
      .map(|m| trim_identifier(self.scheme, m.as_str()))
      .filter(|value| !value.is_empty())
      .filter(|value| !self.exclude.as_ref().is_some_and(|re| re.is_match(value)))
      .filter(|value| seen.insert(value.clone()))
      .map(|value| CandidateIdentifier { scheme: self.scheme, value })
      .collect()
  }

  /// Whether `text` contains at least one article identifier of this scheme.
  pub fn is_match(&self, text: &str) -> bool { !self.find_all(text).is_empty() }

  /// Searches every value of a PDF metadata dictionary.
  ///
  /// Non-string values are stringified first. A value that has no textual form is an
  /// integration bug and is reported as [`PremError::UnsupportedMetadataValue`].
  pub fn find_in_metadata(
    &self,
    metadata: &BTreeMap<String, MetadataValue>,
  ) -> Result<Vec<CandidateIdentifier>> {
    let mut values = Vec::with_capacity(metadata.len());
    for (key, value) in metadata {
      let text =
        value.to_text().ok_or_else(|| PremError::UnsupportedMetadataValue(key.clone()))?;
      values.push(text);
    }
    Ok(self.find_all(&values.join(" ")))
  }
}

/// Removes sentence punctuation that the greedy DOI suffix class swallows.
fn trim_identifier(scheme: Scheme, raw: &str) -> String {
  if scheme != Scheme::Doi {
    return raw.to_string();
  }
  let mut value = raw;
  loop {
    let trimmed = value.trim_end_matches(['.', ',', ';', ':']);
    let unbalanced = trimmed.ends_with(')') && trimmed.matches('(').count() < trimmed.matches(')').count();
    let trimmed = if unbalanced { &trimmed[..trimmed.len() - 1] } else { trimmed };
    if trimmed == value {
      return value.to_string();
    }
    value = trimmed;
  }
}
