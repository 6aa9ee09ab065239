//! Normalizer for CrossRef work records.
//!
//! The record is the `message` object of `GET /works/{doi}`, or one element of `message.items`
//! from a search.

use super::*;

/// The parts of a CrossRef work that prem reads. Everything else in the record is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CrossrefWork {
  /// Record type, e.g. `journal-article` or `journal-issue`
  #[serde(rename = "type", default)]
  kind:             String,
  /// Titles (usually exactly one)
  #[serde(default)]
  title:            Vec<String>,
  /// Authors, not necessarily in byline order
  #[serde(default)]
  author:           Vec<CrossrefAuthor>,
  /// Earliest of the publication dates
  issued:           Option<CrossrefDate>,
  /// Print publication date
  published_print:  Option<CrossrefDate>,
  /// Online publication date
  published_online: Option<CrossrefDate>,
  /// Publication date as deposited
  published:        Option<CrossrefDate>,
  /// When the DOI was registered
  created:          Option<CrossrefDate>,
  /// The DOI
  #[serde(rename = "DOI", default)]
  doi:              String,
  /// Landing page URL
  #[serde(rename = "URL")]
  url:              Option<String>,
  /// Publisher name
  publisher:        Option<String>,
  /// Subject headings
  #[serde(default)]
  subject:          Vec<String>,
  /// Journal or proceedings names
  #[serde(default)]
  container_title:  Vec<String>,
  /// ISSNs of the container
  #[serde(rename = "ISSN", default)]
  issn:             Vec<String>,
  /// Volume
  volume:           Option<String>,
  /// Page range
  page:             Option<String>,
}

/// One CrossRef contributor, either a person or an organisation.
#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
  /// Given name
  given:    Option<String>,
  /// Family name
  family:   Option<String>,
  /// Organisation name
  name:     Option<String>,
  /// `"first"` or `"additional"`
  sequence: Option<String>,
}

impl CrossrefAuthor {
  /// Name as shown in `dc:creator`.
  fn display_name(&self) -> String {
    match (&self.given, &self.family, &self.name) {
      (Some(given), Some(family), _) => format!("{} {}", given.trim(), family.trim()),
      (_, Some(family), _) => family.trim().to_string(),
      (_, None, Some(name)) => name.trim().to_string(),
      (Some(given), None, None) => given.trim().to_string(),
      (None, None, None) => String::new(),
    }
  }

  /// Name used for `prem:author`.
  fn surname(&self) -> String {
    let surname = self.family.as_ref().or(self.name.as_ref()).or(self.given.as_ref());
    surname.map(|s| format::sanitize(s)).unwrap_or_default()
  }
}

/// CrossRef's partial date, `{"date-parts": [[year, month, day]]}` with month and day optional.
#[derive(Debug, Deserialize)]
struct CrossrefDate {
  /// Date parts; CrossRef encodes an unknown date as `[[null]]`
  #[serde(rename = "date-parts")]
  date_parts: Option<Vec<Vec<Option<i64>>>>,
}

impl CrossrefDate {
  /// The first date-parts array, or `None` when the structure is malformed.
  fn parts(&self) -> Option<Vec<i64>> {
    let first = self.date_parts.as_ref()?.first()?;
    Some(first.iter().map_while(|part| *part).collect())
  }
}

/// Normalizes a CrossRef work.
///
/// Container records (journals, issues, volumes...) are rejected with
/// [`PremError::NotAnArticle`] so they are never mistaken for a resolved article.
///
/// # Examples
///
/// ```
/// use prem::{clients::RawRecord, normalize::crossref::normalize};
///
/// let record = RawRecord(serde_json::json!({
///   "type": "journal-article",
///   "title": ["Black holes and thermodynamics"],
///   "author": [{"sequence": "first", "family": "Hawking"}],
///   "issued": {"date-parts": [[1975]]},
///   "DOI": "10.1103/PhysRevD.13.191"
/// }));
///
/// let metadata = normalize(&record).unwrap();
/// assert_eq!(metadata.author, "Hawking");
/// assert_eq!(metadata.year, "1975");
/// ```
pub fn normalize(record: &RawRecord) -> Result<Metadata> {
  let work: CrossrefWork = serde_json::from_value(record.0.clone())
    .map_err(|e| extraction_error(format!("unexpected CrossRef record shape: {e}"), record))?;

  if is_container_type(&work.kind) {
    debug!("CrossRef record {} is a {}", work.doi, work.kind);
    return Err(PremError::NotAnArticle(work.kind));
  }

  let title = work
    .title
    .first()
    .map(|title| format::sanitize(title))
    .filter(|title| !title.is_empty())
    .ok_or_else(|| extraction_error("CrossRef record has no title", record))?;

  let date = publication_date(&work, record)?;
  let year = date.first().map(i64::to_string).unwrap_or_default();
  let cover_display_date = match date.as_slice() {
    [] => String::new(),
    [year] => format!("{year:04}"),
    [year, month] => format!("{year:04}-{month:02}"),
    [year, month, day, ..] => format!("{year:04}-{month:02}-{day:02}"),
  };

  let first_author = work
    .author
    .iter()
    .find(|author| author.sequence.as_deref() == Some("first"))
    .or_else(|| work.author.first());
  let author = first_author.map(CrossrefAuthor::surname).unwrap_or_default();
  if author.is_empty() {
    debug!("CrossRef record {} lists no author", work.doi);
  }

  let publication_name = work.container_title.first().map(|t| format::sanitize(t)).unwrap_or_default();
  let volume = work.volume.unwrap_or_default();
  let page_range = work.page.unwrap_or_default();
  let description = describe(&publication_name, &volume, &year, &page_range);
  let url = match work.url {
    Some(url) => url,
    None if !work.doi.is_empty() => format!("https://doi.org/{}", work.doi),
    None => String::new(),
  };

  Ok(Metadata {
    identifier: if work.doi.is_empty() { String::new() } else { format!("doi:{}", work.doi) },
    creators: work.author.iter().map(CrossrefAuthor::display_name).filter(|n| !n.is_empty()).collect(),
    subjects: work.subject.into_iter().collect(),
    description,
    publisher: work.publisher.unwrap_or_default(),
    doi: work.doi,
    url,
    publication_name,
    aggregation_type: work.kind,
    issn: work.issn.into_iter().next().unwrap_or_default(),
    volume,
    page_range,
    cover_display_date,
    author,
    short_title: title.clone(),
    title,
    year,
  })
}

/// Date parts of the first date structure that carries a year, falling back through
/// `issued`, `published-print`, `published-online`, `published` and `created`.
///
/// A present but year-less date (`[[null]]`) yields empty parts. No date structure at all, or a
/// structure without `date-parts`, is an extraction error.
fn publication_date(work: &CrossrefWork, record: &RawRecord) -> Result<Vec<i64>> {
  let candidates = [
    ("issued", &work.issued),
    ("published-print", &work.published_print),
    ("published-online", &work.published_online),
    ("published", &work.published),
    ("created", &work.created),
  ];

  let mut any_present = false;
  for (name, date) in candidates {
    let Some(date) = date else { continue };
    any_present = true;
    let parts = date
      .parts()
      .ok_or_else(|| extraction_error(format!("malformed \"{name}\" date in CrossRef record"), record))?;
    if !parts.is_empty() {
      trace!("Using {name} date {parts:?}");
      return Ok(parts);
    }
  }

  if any_present {
    Ok(Vec::new())
  } else {
    Err(extraction_error("CrossRef record has no date", record))
  }
}

/// `"<journal>, <volume> (<year>) <pages>"`, omitting missing pieces. Empty without a journal.
fn describe(journal: &str, volume: &str, year: &str, pages: &str) -> String {
  if journal.is_empty() {
    return String::new();
  }
  let mut description = journal.to_string();
  if !volume.is_empty() {
    description.push_str(&format!(", {volume}"));
  }
  if !year.is_empty() {
    description.push_str(&format!(" ({year})"));
  }
  if !pages.is_empty() {
    description.push_str(&format!(" {pages}"));
  }
  description
}
