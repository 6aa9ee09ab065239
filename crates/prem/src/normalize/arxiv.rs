//! Normalizer for arXiv Atom entries.

use chrono::DateTime;
use lazy_static::lazy_static;
use regex::Regex;

use super::*;

lazy_static! {
  /// Prefix of an arXiv abstract URL, as used in Atom `<id>` elements.
  static ref ABS_URL: Regex = Regex::new(r"^https?://(?:export\.)?arxiv\.org/abs/").unwrap();
}

/// An arXiv Atom entry in the JSON form it is cached and dumped in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArxivRecord {
  /// Abstract URL, e.g. `http://arxiv.org/abs/2301.07041v2`
  pub id:          String,
  /// Title, possibly wrapped over several lines
  pub title:       String,
  /// Abstract
  #[serde(default)]
  pub summary:     String,
  /// RFC 3339 timestamp of the first version
  #[serde(default)]
  pub published:   String,
  /// Author names in byline order
  #[serde(default)]
  pub authors:     Vec<String>,
  /// Category terms, e.g. `cs.CR`
  #[serde(default)]
  pub categories:  Vec<String>,
  /// Journal reference supplied by the authors
  #[serde(default)]
  pub journal_ref: Option<String>,
}

/// The bare arXiv identifier of an abstract URL.
pub fn strip_abs_url(id: &str) -> &str {
  match ABS_URL.find(id) {
    Some(prefix) => &id[prefix.end()..],
    None => id,
  }
}

/// Normalizes an arXiv entry.
///
/// arXiv only serves articles, so there is no container check. The author is the last token of
/// the first listed name and the year is the leading four digits of the publication timestamp.
pub fn normalize(record: &RawRecord) -> Result<Metadata> {
  let entry: ArxivRecord = serde_json::from_value(record.0.clone())
    .map_err(|e| extraction_error(format!("unexpected arXiv record shape: {e}"), record))?;

  let id = strip_abs_url(entry.id.trim()).to_string();
  let title = format::sanitize(&entry.title);
  if title.is_empty() {
    return Err(extraction_error("arXiv entry has no title", record));
  }

  let published = entry.published.trim();
  let year = published
    .get(..4)
    .filter(|year| year.chars().all(|c| c.is_ascii_digit()))
    .ok_or_else(|| {
      extraction_error(format!("malformed arXiv publication timestamp {published:?}"), record)
    })?
    .to_string();
  let cover_display_date = DateTime::parse_from_rfc3339(published)
    .map(|date| date.format("%Y-%m-%d").to_string())
    .unwrap_or_else(|_| year.clone());

  let creators: Vec<String> =
    entry.authors.iter().map(|name| format::sanitize(name)).filter(|n| !n.is_empty()).collect();
  let author = creators.first().map(|name| last_token(name)).unwrap_or_default();

  let url = if entry.id.trim().is_empty() {
    String::new()
  } else if ABS_URL.is_match(entry.id.trim()) {
    entry.id.trim().to_string()
  } else {
    format!("https://arxiv.org/abs/{id}")
  };

  Ok(Metadata {
    identifier: if id.is_empty() { String::new() } else { format!("arXiv:{id}") },
    creators,
    subjects: entry.categories.into_iter().collect(),
    description: entry.journal_ref.map(|r| format::sanitize(&r)).unwrap_or_default(),
    url,
    cover_display_date,
    author,
    short_title: title.clone(),
    title,
    year,
    ..Metadata::default()
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn entry() -> serde_json::Value {
    json!({
      "id": "http://arxiv.org/abs/2301.07041v2",
      "title": "Verifiable Fully Homomorphic Encryption",
      "summary": "Fully Homomorphic Encryption (FHE) is seeing increasing real-world deployment...",
      "published": "2023-01-17T18:59:59Z",
      "authors": ["Alexander Viand", "Christian Knabenhans", "Anwar Hithnawi"],
      "categories": ["cs.CR"]
    })
  }

  #[test]
  fn test_normalize_entry() {
    let metadata = normalize(&RawRecord(entry())).unwrap();
    assert_eq!(metadata.identifier, "arXiv:2301.07041v2");
    assert_eq!(metadata.title, "Verifiable Fully Homomorphic Encryption");
    assert_eq!(metadata.author, "Viand");
    assert_eq!(metadata.year, "2023");
    assert_eq!(metadata.cover_display_date, "2023-01-17");
    assert_eq!(metadata.creators.len(), 3);
    assert!(metadata.subjects.contains("cs.CR"));
    assert_eq!(metadata.url, "http://arxiv.org/abs/2301.07041v2");
    assert_eq!(metadata.doi, "");
    assert!(metadata.is_complete());
  }

  #[test]
  fn test_wrapped_title_and_journal_ref() {
    let mut record = entry();
    record["title"] = json!("Verifiable Fully\n  Homomorphic Encryption");
    record["journal_ref"] = json!("IEEE S&P 2024");
    let metadata = normalize(&RawRecord(record)).unwrap();
    assert_eq!(metadata.title, "Verifiable Fully Homomorphic Encryption");
    assert_eq!(metadata.description, "IEEE S&P 2024");
  }

  #[test]
  fn test_missing_authors_is_soft() {
    let mut record = entry();
    record["authors"] = json!([]);
    let metadata = normalize(&RawRecord(record)).unwrap();
    assert_eq!(metadata.author, "");
    assert!(metadata.creators.is_empty());
  }

  #[test]
  fn test_bad_timestamp_is_extraction_error() {
    let mut record = entry();
    record["published"] = json!("");
    assert!(matches!(normalize(&RawRecord(record)), Err(PremError::MetadataExtraction { .. })));
  }

  #[test]
  fn test_strip_abs_url() {
    assert_eq!(strip_abs_url("https://arxiv.org/abs/2301.07041"), "2301.07041");
    assert_eq!(strip_abs_url("http://arxiv.org/abs/2301.07041v1"), "2301.07041v1");
    assert_eq!(strip_abs_url("2301.07041"), "2301.07041");
  }
}
