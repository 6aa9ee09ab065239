//! The PDF document service.
//!
//! The core never touches PDF objects directly. It opens documents through a [`PdfEngine`]
//! chosen at construction time and works with the returned [`PdfDocument`] handle: read the
//! metadata dictionary, extract page text, merge normalized metadata, save.
//!
//! [`LopdfEngine`] is the production backend. Besides the document information dictionary it can
//! embed an XMP packet, and it refreshes `ModDate` on every save.

use chrono::Local;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::*;

/// A value of the PDF metadata dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
  /// Text string
  Text(String),
  /// Array
  List(Vec<MetadataValue>),
  /// Integer number
  Integer(i64),
  /// Real number
  Real(f64),
  /// Boolean
  Boolean(bool),
  /// `null`
  Null,
  /// A value with no textual form (dictionary, stream), tagged with its type name
  Opaque(String),
}

impl MetadataValue {
  /// Stringifies the value for identifier matching.
  ///
  /// Lists are joined with spaces and `null` is empty. Returns `None` for [`MetadataValue::Opaque`]
  /// values, anywhere in the value.
  pub fn to_text(&self) -> Option<String> {
    match self {
      MetadataValue::Text(text) => Some(text.clone()),
      MetadataValue::List(items) =>
        items.iter().map(MetadataValue::to_text).collect::<Option<Vec<_>>>().map(|v| v.join(" ")),
      MetadataValue::Integer(i) => Some(i.to_string()),
      MetadataValue::Real(r) => Some(r.to_string()),
      MetadataValue::Boolean(b) => Some(b.to_string()),
      MetadataValue::Null => Some(String::new()),
      MetadataValue::Opaque(_) => None,
    }
  }
}

/// An open PDF document.
pub trait PdfDocument: Send {
  /// Path the document was opened from.
  fn path(&self) -> &Path;

  /// The document information dictionary, with references resolved.
  fn metadata(&self) -> Result<BTreeMap<String, MetadataValue>>;

  /// Number of pages.
  fn page_count(&self) -> usize;

  /// Text of the page with the given 1-based number.
  fn page_text(&self, page: u32) -> Result<String>;

  /// Merges `metadata` into the document's metadata store.
  ///
  /// Keys that `metadata` does not provide are kept; keys it provides are overwritten.
  fn merge_metadata(&mut self, metadata: &Metadata) -> Result<()>;

  /// Writes the document to `path`.
  fn save(&mut self, path: &Path) -> Result<()>;

  /// Text of the first `pages` pages, joined by newlines.
  ///
  /// Pages whose text cannot be extracted are skipped with a warning, so a document with a broken
  /// font still yields whatever text the other pages have.
  fn pages_to_text(&self, pages: usize) -> String {
    let count = self.page_count().min(pages);
    let mut text = Vec::with_capacity(count);
    for page in 1..=count as u32 {
      match self.page_text(page) {
        Ok(page_text) => text.push(page_text),
        Err(e) => warn!("Could not extract text of page {page} of {}: {e}", self.path().display()),
      }
    }
    text.join("\n")
  }
}

/// Opens PDF documents.
pub trait PdfEngine: Send + Sync {
  /// Opens the document at `path`.
  fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>>;
}

/// Entries of the document information dictionary for `metadata`.
///
/// Every non-empty namespaced field, plus the standard `Title`, `Author`, `Subject` and
/// `Keywords` entries that viewers display.
pub fn info_entries(metadata: &Metadata) -> Vec<(String, String)> {
  let mut entries: Vec<(String, String)> =
    metadata.entries().into_iter().map(|(field, value)| (field.key().to_string(), value)).collect();
  let standard = [
    ("Title", metadata.get(Field::Title)),
    ("Author", metadata.get(Field::Creator)),
    ("Subject", metadata.get(Field::Description)),
    ("Keywords", metadata.get(Field::Subject)),
  ];
  entries.extend(
    standard
      .into_iter()
      .filter(|(_, value)| !value.is_empty())
      .map(|(key, value)| (key.to_string(), value)),
  );
  entries
}

/// [`PdfEngine`] backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfEngine {
  /// Also embed an XMP packet when merging metadata
  write_xmp: bool,
}

impl LopdfEngine {
  /// Creates an engine; `write_xmp` controls whether an XMP packet is embedded.
  pub fn new(write_xmp: bool) -> Self { Self { write_xmp } }
}

impl PdfEngine for LopdfEngine {
  fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>> {
    debug!("Opening {}", path.display());
    let doc = Document::load(path)?;
    Ok(Box::new(LopdfDocument { path: path.to_path_buf(), doc, write_xmp: self.write_xmp }))
  }
}

/// A document opened by [`LopdfEngine`].
pub struct LopdfDocument {
  /// Where the document was loaded from
  path:      PathBuf,
  /// The parsed document
  doc:       Document,
  /// Also embed an XMP packet when merging metadata
  write_xmp: bool,
}

impl LopdfDocument {
  /// Id of the information dictionary, creating an empty one if the document has none.
  ///
  /// An information dictionary stored inline in the trailer is moved into its own object.
  fn info_id(&mut self) -> Result<ObjectId> {
    match self.doc.trailer.get(b"Info") {
      Ok(Object::Reference(id)) => return Ok(*id),
      Ok(Object::Dictionary(inline)) => {
        let inline = inline.clone();
        let id = self.doc.add_object(inline);
        self.doc.trailer.set("Info", Object::Reference(id));
        return Ok(id);
      },
      _ => {},
    }
    let id = self.doc.add_object(Dictionary::new());
    self.doc.trailer.set("Info", Object::Reference(id));
    Ok(id)
  }

  /// Points the catalog's `/Metadata` at a stream holding `packet`, reusing an existing stream
  /// object if there is one.
  fn set_xmp(&mut self, packet: &str) -> Result<()> {
    let stream = Stream::new(
      lopdf::dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
      packet.as_bytes().to_vec(),
    );
    let root_id = self.doc.trailer.get(b"Root")?.as_reference()?;
    let existing = self
      .doc
      .get_object(root_id)?
      .as_dict()?
      .get(b"Metadata")
      .and_then(Object::as_reference)
      .ok();

    match existing {
      Some(id) => {
        self.doc.objects.insert(id, Object::Stream(stream));
      },
      None => {
        let id = self.doc.add_object(stream);
        self.doc.get_object_mut(root_id)?.as_dict_mut()?.set("Metadata", Object::Reference(id));
      },
    }
    Ok(())
  }

  /// Converts a PDF object to a [`MetadataValue`], following references `depth` levels deep.
  fn convert(&self, object: &Object, depth: usize) -> MetadataValue {
    match object {
      Object::String(bytes, _) => MetadataValue::Text(decode_text_string(bytes)),
      Object::Name(bytes) => MetadataValue::Text(String::from_utf8_lossy(bytes).into_owned()),
      Object::Integer(i) => MetadataValue::Integer(*i),
      Object::Real(r) => MetadataValue::Real(f64::from(*r)),
      Object::Boolean(b) => MetadataValue::Boolean(*b),
      Object::Null => MetadataValue::Null,
      Object::Array(items) =>
        MetadataValue::List(items.iter().map(|item| self.convert(item, depth)).collect()),
      Object::Reference(id) if depth > 0 => match self.doc.get_object(*id) {
        Ok(target) => self.convert(target, depth - 1),
        Err(_) => MetadataValue::Null,
      },
      Object::Reference(_) => MetadataValue::Opaque("Reference".into()),
      Object::Dictionary(_) => MetadataValue::Opaque("Dictionary".into()),
      Object::Stream(_) => MetadataValue::Opaque("Stream".into()),
    }
  }
}

impl PdfDocument for LopdfDocument {
  fn path(&self) -> &Path { &self.path }

  fn metadata(&self) -> Result<BTreeMap<String, MetadataValue>> {
    let info = match self.doc.trailer.get(b"Info") {
      Ok(Object::Reference(id)) => self.doc.get_object(*id)?.as_dict()?,
      Ok(Object::Dictionary(info)) => info,
      _ => return Ok(BTreeMap::new()),
    };
    Ok(
      info
        .iter()
        .map(|(key, value)| (String::from_utf8_lossy(key).into_owned(), self.convert(value, 4)))
        .collect(),
    )
  }

  fn page_count(&self) -> usize { self.doc.get_pages().len() }

  fn page_text(&self, page: u32) -> Result<String> { Ok(self.doc.extract_text(&[page])?) }

  fn merge_metadata(&mut self, metadata: &Metadata) -> Result<()> {
    let info_id = self.info_id()?;
    let info = self.doc.get_object_mut(info_id)?.as_dict_mut()?;
    for (key, value) in info_entries(metadata) {
      trace!("Setting {key} = {value}");
      info.set(key.into_bytes(), encode_text_string(&value));
    }

    if self.write_xmp {
      self.set_xmp(&xmp::render(metadata)?)?;
    }
    Ok(())
  }

  fn save(&mut self, path: &Path) -> Result<()> {
    let info_id = self.info_id()?;
    self.doc.get_object_mut(info_id)?.as_dict_mut()?.set("ModDate", pdf_date(Local::now()));
    self.doc.save(path)?;
    debug!("Saved {}", path.display());
    Ok(())
  }
}

/// Encodes a PDF text string: PDFDocEncoding-compatible ASCII as a literal, anything else as
/// UTF-16BE with a byte order mark.
pub fn encode_text_string(text: &str) -> Object {
  if text.is_ascii() {
    return Object::string_literal(text);
  }
  let mut bytes = vec![0xFE, 0xFF];
  bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
  Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decodes a PDF text string. UTF-16BE strings start with a byte order mark; everything else is
/// read as (lossy) UTF-8, which covers the ASCII subset of PDFDocEncoding.
pub fn decode_text_string(bytes: &[u8]) -> String {
  if bytes.starts_with(&[0xFE, 0xFF]) {
    let (text, ..) = encoding_rs::UTF_16BE.decode(&bytes[2..]);
    text.into_owned()
  } else {
    String::from_utf8_lossy(bytes).into_owned()
  }
}

/// A PDF date string, `D:YYYYMMDDHHmmSS+HH'mm'`.
fn pdf_date(now: chrono::DateTime<Local>) -> Object {
  let offset = now.offset().local_minus_utc();
  let sign = if offset >= 0 { '+' } else { '-' };
  let offset = offset.abs();
  Object::string_literal(format!(
    "D:{}{sign}{:02}'{:02}'",
    now.format("%Y%m%d%H%M%S"),
    offset / 3600,
    (offset % 3600) / 60
  ))
}



#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::{fixtures::write_pdf, *};

  fn hawking() -> Metadata {
    Metadata {
      identifier: "doi:10.1103/PhysRevD.13.191".into(),
      title: "Black holes and thermodynamics".into(),
      creators: vec!["S. W. Hawking".into()],
      doi: "10.1103/PhysRevD.13.191".into(),
      author: "Hawking".into(),
      short_title: "Black holes and thermodynamics".into(),
      year: "1975".into(),
      ..Metadata::default()
    }
  }

  #[test]
  fn test_metadata_value_to_text() {
    assert_eq!(MetadataValue::Null.to_text().as_deref(), Some(""));
    assert_eq!(MetadataValue::Integer(3).to_text().as_deref(), Some("3"));
    assert_eq!(MetadataValue::Boolean(true).to_text().as_deref(), Some("true"));
    let list = MetadataValue::List(vec![MetadataValue::Text("a".into()), MetadataValue::Integer(1)]);
    assert_eq!(list.to_text().as_deref(), Some("a 1"));
    let nested = MetadataValue::List(vec![MetadataValue::Opaque("Stream".into())]);
    assert_eq!(nested.to_text(), None);
  }

  #[test]
  fn test_text_string_encoding() {
    let Object::String(ascii, StringFormat::Literal) = encode_text_string("Hawking") else {
      panic!("expected a literal string");
    };
    assert_eq!(ascii, b"Hawking");
    let encoded = encode_text_string("Schrödinger");
    let Object::String(bytes, StringFormat::Hexadecimal) = &encoded else {
      panic!("expected a hexadecimal string, got {encoded:?}");
    };
    assert!(bytes.starts_with(&[0xFE, 0xFF]));
    assert_eq!(decode_text_string(bytes), "Schrödinger");
    assert_eq!(decode_text_string(b"plain"), "plain");
  }

  #[test]
  fn test_pdf_date_format() {
    let Object::String(bytes, _) = pdf_date(Local::now()) else { panic!("not a string") };
    let date = String::from_utf8(bytes).unwrap();
    assert!(date.starts_with("D:"));
    assert_eq!(date.len(), "D:20240101120000+01'00'".len());
  }

  #[test]
  fn test_info_entries_mirror_standard_keys() {
    let entries: BTreeMap<_, _> = info_entries(&hawking()).into_iter().collect();
    assert_eq!(entries["Title"], "Black holes and thermodynamics");
    assert_eq!(entries["Author"], "S. W. Hawking");
    assert_eq!(entries["prem:year"], "1975");
    assert_eq!(entries["dc:format"], "application/pdf");
    assert!(!entries.contains_key("Keywords"));
    assert!(!entries.contains_key("dc:publisher"));
  }

  #[traced_test]
  #[test]
  fn test_read_metadata_and_text() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("paper.pdf");
    write_pdf(&path, &["Black holes and thermodynamics", "second page"], &[
      ("Title", "Draft"),
      ("Subject", "doi:10.1103/PhysRevD.13.191"),
    ]);

    let doc = LopdfEngine::default().open(&path)?;
    assert_eq!(doc.path(), path);
    assert_eq!(doc.page_count(), 2);
    let metadata = doc.metadata()?;
    assert_eq!(metadata["Title"], MetadataValue::Text("Draft".into()));
    assert!(doc.pages_to_text(1).contains("Black holes"));
    assert!(!doc.pages_to_text(1).contains("second"));
    assert!(doc.pages_to_text(10).contains("second page"));
    Ok(())
  }

  #[test]
  fn test_merge_and_save() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("paper.pdf");
    write_pdf(&path, &["page"], &[("Title", "Draft"), ("Creator", "LaTeX")]);

    let mut doc = LopdfEngine::new(true).open(&path)?;
    doc.merge_metadata(&hawking())?;
    let out = dir.path().join("out.pdf");
    doc.save(&out)?;

    let reopened = LopdfEngine::default().open(&out)?;
    let metadata = reopened.metadata()?;
    assert_eq!(metadata["Title"], MetadataValue::Text("Black holes and thermodynamics".into()));
    assert_eq!(metadata["Creator"], MetadataValue::Text("LaTeX".into()));
    assert_eq!(metadata["prem:author"], MetadataValue::Text("Hawking".into()));
    assert_eq!(metadata["dc:identifier"], MetadataValue::Text("doi:10.1103/PhysRevD.13.191".into()));
    assert!(metadata.contains_key("ModDate"));

    let document = Document::load(&out)?;
    let root = document.trailer.get(b"Root")?.as_reference()?;
    let xmp_id = document.get_object(root)?.as_dict()?.get(b"Metadata")?.as_reference()?;
    let stream = document.get_object(xmp_id)?.as_stream()?;
    let packet = String::from_utf8(stream.content.clone())?;
    assert!(packet.contains("<prem:year>1975</prem:year>"));
    Ok(())
  }

  #[test]
  fn test_non_ascii_values_roundtrip() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("paper.pdf");
    write_pdf(&path, &["page"], &[]);

    let mut doc = LopdfEngine::default().open(&path)?;
    let metadata = Metadata { author: "Schrödinger".into(), ..hawking() };
    doc.merge_metadata(&metadata)?;
    doc.save(&path)?;

    let metadata = LopdfEngine::default().open(&path)?.metadata()?;
    assert_eq!(metadata["prem:author"], MetadataValue::Text("Schrödinger".into()));
    Ok(())
  }
}
