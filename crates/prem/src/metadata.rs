//! The canonical, source-independent metadata record.
//!
//! Every normalizer produces a [`Metadata`], and everything downstream (filename template,
//! candidate labels, PDF writer) reads it through stable namespaced [`Field`] keys. A field the
//! registry did not provide is an empty string or an empty collection, never a missing key.
//!
//! # Examples
//!
//! ```
//! use prem::metadata::{Field, Metadata};
//!
//! let metadata = Metadata {
//!   title: "Black holes and thermodynamics".into(),
//!   year: "1975".into(),
//!   ..Metadata::default()
//! };
//!
//! assert_eq!(metadata.get(Field::Year), "1975");
//! assert_eq!(metadata.get(Field::Publisher), "");
//! assert_eq!(metadata.get(Field::Format), "application/pdf");
//! ```

use std::str::FromStr;

use super::*;

/// MIME type stored in `dc:format`.
pub const PDF_FORMAT: &str = "application/pdf";

/// Stable keys of the normalized metadata schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
  /// `dc:identifier`, scheme-prefixed (`doi:...`, `arXiv:...`)
  Identifier,
  /// `dc:format`
  Format,
  /// `dc:title`
  Title,
  /// `dc:creator`
  Creator,
  /// `dc:subject`
  Subject,
  /// `dc:description`
  Description,
  /// `dc:publisher`
  Publisher,
  /// `prism3:doi`
  Doi,
  /// `prism3:url`
  Url,
  /// `prism3:publicationName`
  PublicationName,
  /// `prism3:aggregationType`
  AggregationType,
  /// `prism3:issn`
  Issn,
  /// `prism3:volume`
  Volume,
  /// `prism3:pageRange`
  PageRange,
  /// `prism3:coverDisplayDate`
  CoverDisplayDate,
  /// `crossmark:DOI`
  CrossmarkDoi,
  /// `prem:author`
  Author,
  /// `prem:title`
  ShortTitle,
  /// `prem:year`
  Year,
}

impl Field {
  /// Every field, in the order they are written to a PDF.
  pub const ALL: [Field; 19] = [
    Field::Identifier,
    Field::Format,
    Field::Title,
    Field::Creator,
    Field::Subject,
    Field::Description,
    Field::Publisher,
    Field::Doi,
    Field::Url,
    Field::PublicationName,
    Field::AggregationType,
    Field::Issn,
    Field::Volume,
    Field::PageRange,
    Field::CoverDisplayDate,
    Field::CrossmarkDoi,
    Field::Author,
    Field::ShortTitle,
    Field::Year,
  ];

  /// The namespaced key, e.g. `"prism3:pageRange"`.
  pub fn key(&self) -> &'static str {
    match self {
      Field::Identifier => "dc:identifier",
      Field::Format => "dc:format",
      Field::Title => "dc:title",
      Field::Creator => "dc:creator",
      Field::Subject => "dc:subject",
      Field::Description => "dc:description",
      Field::Publisher => "dc:publisher",
      Field::Doi => "prism3:doi",
      Field::Url => "prism3:url",
      Field::PublicationName => "prism3:publicationName",
      Field::AggregationType => "prism3:aggregationType",
      Field::Issn => "prism3:issn",
      Field::Volume => "prism3:volume",
      Field::PageRange => "prism3:pageRange",
      Field::CoverDisplayDate => "prism3:coverDisplayDate",
      Field::CrossmarkDoi => "crossmark:DOI",
      Field::Author => "prem:author",
      Field::ShortTitle => "prem:title",
      Field::Year => "prem:year",
    }
  }

  /// The namespace prefix of the key.
  pub fn namespace(&self) -> &'static str {
    self.key().split_once(':').map(|(ns, _)| ns).unwrap_or_default()
  }

  /// The local name of the key, without its namespace.
  pub fn local_name(&self) -> &'static str {
    self.key().split_once(':').map(|(_, name)| name).unwrap_or_default()
  }
}

impl std::fmt::Display for Field {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.key()) }
}

impl FromStr for Field {
  type Err = PremError;

  /// Parses a namespaced key, ignoring ASCII case.
  fn from_str(s: &str) -> Result<Self> {
    Field::ALL
      .into_iter()
      .find(|field| field.key().eq_ignore_ascii_case(s))
      .ok_or_else(|| PremError::TemplateFieldMissing(s.to_string()))
  }
}

/// Normalized bibliographic metadata for one article.
///
/// Constructed once per successful registry fetch and not modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
  /// `dc:identifier`, scheme-prefixed
  pub identifier:         String,
  /// `dc:title`, as the registry spells it (sanitized)
  pub title:              String,
  /// `dc:creator`, author display names in registry order
  pub creators:           Vec<String>,
  /// `dc:subject`
  pub subjects:           BTreeSet<String>,
  /// `dc:description`
  pub description:        String,
  /// `dc:publisher`
  pub publisher:          String,
  /// `prism3:doi`
  pub doi:                String,
  /// `prism3:url`
  pub url:                String,
  /// `prism3:publicationName`
  pub publication_name:   String,
  /// `prism3:aggregationType`
  pub aggregation_type:   String,
  /// `prism3:issn`
  pub issn:               String,
  /// `prism3:volume`
  pub volume:             String,
  /// `prism3:pageRange`
  pub page_range:         String,
  /// `prism3:coverDisplayDate`
  pub cover_display_date: String,
  /// `prem:author`, surname of the first author
  pub author:             String,
  /// `prem:title`, sanitized title for filenames
  pub short_title:        String,
  /// `prem:year`, four-digit year
  pub year:               String,
}

impl Metadata {
  /// Renders a field as text. Absent fields render as `""`.
  ///
  /// Creators are joined with `", "` and subjects with `"; "`.
  pub fn get(&self, field: Field) -> String {
    match field {
      Field::Identifier => self.identifier.clone(),
      Field::Format => PDF_FORMAT.to_string(),
      Field::Title => self.title.clone(),
      Field::Creator => self.creators.join(", "),
      Field::Subject => self.subjects.iter().cloned().collect::<Vec<_>>().join("; "),
      Field::Description => self.description.clone(),
      Field::Publisher => self.publisher.clone(),
      Field::Doi | Field::CrossmarkDoi => self.doi.clone(),
      Field::Url => self.url.clone(),
      Field::PublicationName => self.publication_name.clone(),
      Field::AggregationType => self.aggregation_type.clone(),
      Field::Issn => self.issn.clone(),
      Field::Volume => self.volume.clone(),
      Field::PageRange => self.page_range.clone(),
      Field::CoverDisplayDate => self.cover_display_date.clone(),
      Field::Author => self.author.clone(),
      Field::ShortTitle => self.short_title.clone(),
      Field::Year => self.year.clone(),
    }
  }

  /// All non-empty fields as `(key, value)` pairs, in [`Field::ALL`] order.
  pub fn entries(&self) -> Vec<(Field, String)> {
    Field::ALL
      .into_iter()
      .map(|field| (field, self.get(field)))
      .filter(|(_, value)| !value.is_empty())
      .collect()
  }

  /// Whether the three fields used by the default filename template are present.
  pub fn is_complete(&self) -> bool {
    !self.author.is_empty() && !self.short_title.is_empty() && !self.year.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_is_empty_but_addressable() {
    let metadata = Metadata::default();
    for field in Field::ALL {
      let value = metadata.get(field);
      if field == Field::Format {
        assert_eq!(value, PDF_FORMAT);
      } else {
        assert!(value.is_empty(), "{field} should be empty");
      }
    }
    assert_eq!(metadata.entries(), vec![(Field::Format, PDF_FORMAT.to_string())]);
  }

  #[test]
  fn test_field_keys_roundtrip() {
    for field in Field::ALL {
      assert_eq!(field.key().parse::<Field>().unwrap(), field);
    }
    assert_eq!("PRISM3:PAGERANGE".parse::<Field>().unwrap(), Field::PageRange);
    assert!(matches!("dc:rights".parse::<Field>(), Err(PremError::TemplateFieldMissing(_))));
  }

  #[test]
  fn test_field_namespaces() {
    assert_eq!(Field::CrossmarkDoi.namespace(), "crossmark");
    assert_eq!(Field::CrossmarkDoi.local_name(), "DOI");
    assert_eq!(Field::Year.namespace(), "prem");
  }

  #[test]
  fn test_collections_render() {
    let metadata = Metadata {
      creators: vec!["Stephen Hawking".into(), "Roger Penrose".into()],
      subjects: ["gr-qc", "hep-th"].into_iter().map(String::from).collect(),
      doi: "10.1103/PhysRevD.13.191".into(),
      ..Metadata::default()
    };
    assert_eq!(metadata.get(Field::Creator), "Stephen Hawking, Roger Penrose");
    assert_eq!(metadata.get(Field::Subject), "gr-qc; hep-th");
    assert_eq!(metadata.get(Field::CrossmarkDoi), "10.1103/PhysRevD.13.191");
    assert!(!metadata.is_complete());
  }
}
