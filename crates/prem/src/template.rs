//! Filename templates.
//!
//! A template is literal text with `{placeholder}` tokens, e.g. `"{year} - {author} - {title}.pdf"`.
//! Placeholders are matched case-insensitively, either by a short alias or by a full namespaced
//! key such as `{prism3:volume}`. Every placeholder is checked before anything is rendered, so an
//! unknown one fails with [`PremError::TemplateFieldMissing`] before any file is touched.
//!
//! # Examples
//!
//! ```
//! use prem::{metadata::Metadata, template};
//!
//! let metadata = Metadata {
//!   year: "1975".into(),
//!   author: "Hawking".into(),
//!   short_title: "Black holes and thermodynamics".into(),
//!   ..Metadata::default()
//! };
//!
//! let name = template::render(template::DEFAULT_TEMPLATE, &metadata, false).unwrap();
//! assert_eq!(name, "1975 - Hawking - Black holes and thermodynamics.pdf");
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use super::*;

/// Template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "{year} - {author} - {title}.pdf";

/// Suffix every rendered filename ends with.
pub const PDF_SUFFIX: &str = ".pdf";

lazy_static! {
  static ref PLACEHOLDER: Regex = Regex::new(r"\{([^{}]*)\}").unwrap();
}

/// Maps a placeholder name to its field.
pub fn field_for(name: &str) -> Result<Field> {
  let name = name.trim().to_lowercase();
  let field = match name.as_str() {
    "year" => Field::Year,
    "author" => Field::Author,
    "title" => Field::ShortTitle,
    "doi" => Field::Doi,
    "publisher" => Field::Publisher,
    "journal" => Field::PublicationName,
    "volume" => Field::Volume,
    _ => return name.parse(),
  };
  Ok(field)
}

/// The fields referenced by `template`, in order of appearance.
pub fn fields(template: &str) -> Result<Vec<Field>> {
  PLACEHOLDER.captures_iter(template).map(|caps| field_for(&caps[1])).collect()
}

/// Appends [`PDF_SUFFIX`] unless `name` already ends with it, ignoring case.
pub fn with_pdf_suffix(name: &str) -> String {
  if name.to_lowercase().ends_with(PDF_SUFFIX) {
    name.to_string()
  } else {
    format!("{name}{PDF_SUFFIX}")
  }
}

/// Renders `template` with the values of `metadata`.
///
/// Values are passed through [`format::sanitize`], so they never contain path separators. With
/// `lowercase` set, the whole name is lower-cased.
pub fn render(template: &str, metadata: &Metadata, lowercase: bool) -> Result<String> {
  let fields = fields(template)?;

  let mut name = String::with_capacity(template.len());
  let mut last = 0;
  for (caps, field) in PLACEHOLDER.captures_iter(template).zip(fields) {
    let Some(token) = caps.get(0) else { continue };
    name.push_str(&template[last..token.start()]);
    name.push_str(&format::sanitize(&metadata.get(field)));
    last = token.end();
  }
  name.push_str(&template[last..]);

  if lowercase {
    name = name.to_lowercase();
  }
  let name = with_pdf_suffix(&name);
  trace!("Rendered {template:?} as {name:?}");
  Ok(name)
}

/// Recovers placeholder values from a filename rendered with `template`.
///
/// Returns `None` when `filename` does not have the template's shape.
pub fn extract(template: &str, filename: &str) -> Result<Option<BTreeMap<Field, String>>> {
  let template = with_pdf_suffix(template);
  let fields = fields(&template)?;

  let mut pattern = String::from("(?i)^");
  let mut last = 0;
  for caps in PLACEHOLDER.captures_iter(&template) {
    let Some(token) = caps.get(0) else { continue };
    pattern.push_str(&regex::escape(&template[last..token.start()]));
    pattern.push_str("(.*?)");
    last = token.end();
  }
  pattern.push_str(&regex::escape(&template[last..]));
  pattern.push('$');

  let matcher = Regex::new(&pattern)?;
  let Some(caps) = matcher.captures(filename) else {
    return Ok(None);
  };
  Ok(Some(
    fields
      .into_iter()
      .enumerate()
      .filter_map(|(i, field)| caps.get(i + 1).map(|value| (field, value.as_str().to_string())))
      .collect(),
  ))
}
