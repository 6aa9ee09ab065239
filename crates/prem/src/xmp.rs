//! XMP rendering of normalized metadata.
//!
//! PDF readers increasingly ignore the document information dictionary in favour of the XMP
//! packet referenced from the catalog. The packet written here carries every non-empty field under
//! its own namespace, using the RDF container types XMP prescribes for Dublin Core
//! (`rdf:Alt` for language alternatives, `rdf:Seq` for creators, `rdf:Bag` for unordered sets).

use quick_xml::{
  events::{BytesEnd, BytesStart, BytesText, Event},
  Writer,
};

use super::*;

/// Namespace prefixes and URIs declared on the description element.
pub const NAMESPACES: [(&str, &str); 5] = [
  ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
  ("dc", "http://purl.org/dc/elements/1.1/"),
  ("prism3", "http://prismstandard.org/namespaces/basic/3.0/"),
  ("crossmark", "http://crossref.org/crossmark/1.0/"),
  ("prem", "https://github.com/autoparallel/prem/ns/1.0/"),
];

/// Opening processing instruction of an XMP packet.
const PACKET_BEGIN: &str = "<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>";

/// Closing processing instruction of a writable XMP packet.
const PACKET_END: &str = "<?xpacket end=\"w\"?>";

/// How a field is represented in RDF.
enum Shape {
  /// Plain text property
  Simple(String),
  /// `rdf:Alt` with a single `x-default` entry
  Alt(String),
  /// Ordered or unordered array, with the container element name
  Array(&'static str, Vec<String>),
}

/// The RDF shape of a field of `metadata`, or `None` when the field is empty.
fn shape(metadata: &Metadata, field: Field) -> Option<Shape> {
  let shape = match field {
    Field::Title | Field::Description => Shape::Alt(metadata.get(field)),
    Field::Creator => Shape::Array("rdf:Seq", metadata.creators.clone()),
    Field::Subject => Shape::Array("rdf:Bag", metadata.subjects.iter().cloned().collect()),
    Field::Publisher => Shape::Array("rdf:Bag", vec![metadata.publisher.clone()]),
    _ => Shape::Simple(metadata.get(field)),
  };
  let empty = match &shape {
    Shape::Simple(text) | Shape::Alt(text) => text.is_empty(),
    Shape::Array(_, items) => items.iter().all(String::is_empty),
  };
  (!empty).then_some(shape)
}

/// Renders the XMP packet for `metadata`.
///
/// # Examples
///
/// ```
/// use prem::{metadata::Metadata, xmp};
///
/// let metadata = Metadata { year: "1975".into(), ..Metadata::default() };
/// let packet = xmp::render(&metadata).unwrap();
/// assert!(packet.contains("<prem:year>1975</prem:year>"));
/// ```
pub fn render(metadata: &Metadata) -> Result<String> {
  let mut writer = Writer::new_with_indent(Vec::new(), b' ', 1);

  let mut xmpmeta = BytesStart::new("x:xmpmeta");
  xmpmeta.push_attribute(("xmlns:x", "adobe:ns:meta/"));
  write(&mut writer, Event::Start(xmpmeta))?;

  let mut rdf = BytesStart::new("rdf:RDF");
  rdf.push_attribute(("xmlns:rdf", NAMESPACES[0].1));
  write(&mut writer, Event::Start(rdf))?;

  let mut description = BytesStart::new("rdf:Description");
  description.push_attribute(("rdf:about", ""));
  for (prefix, uri) in &NAMESPACES[1..] {
    description.push_attribute((format!("xmlns:{prefix}").as_str(), *uri));
  }
  write(&mut writer, Event::Start(description))?;

  for field in Field::ALL {
    let Some(shape) = shape(metadata, field) else { continue };
    let key = field.key();
    match shape {
      Shape::Simple(text) => text_element(&mut writer, key, &text)?,
      Shape::Alt(text) => {
        write(&mut writer, Event::Start(BytesStart::new(key)))?;
        write(&mut writer, Event::Start(BytesStart::new("rdf:Alt")))?;
        let mut li = BytesStart::new("rdf:li");
        li.push_attribute(("xml:lang", "x-default"));
        write(&mut writer, Event::Start(li))?;
        write(&mut writer, Event::Text(BytesText::new(&text)))?;
        write(&mut writer, Event::End(BytesEnd::new("rdf:li")))?;
        write(&mut writer, Event::End(BytesEnd::new("rdf:Alt")))?;
        write(&mut writer, Event::End(BytesEnd::new(key)))?;
      },
      Shape::Array(container, items) => {
        write(&mut writer, Event::Start(BytesStart::new(key)))?;
        write(&mut writer, Event::Start(BytesStart::new(container)))?;
        for item in items.iter().filter(|item| !item.is_empty()) {
          text_element(&mut writer, "rdf:li", item)?;
        }
        write(&mut writer, Event::End(BytesEnd::new(container)))?;
        write(&mut writer, Event::End(BytesEnd::new(key)))?;
      },
    }
  }

  write(&mut writer, Event::End(BytesEnd::new("rdf:Description")))?;
  write(&mut writer, Event::End(BytesEnd::new("rdf:RDF")))?;
  write(&mut writer, Event::End(BytesEnd::new("x:xmpmeta")))?;

  let body = String::from_utf8(writer.into_inner()).map_err(|e| PremError::Xmp(e.to_string()))?;
  Ok(format!("{PACKET_BEGIN}\n{body}\n{PACKET_END}"))
}

/// Writes one event, mapping writer failures to [`PremError::Xmp`].
fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
  writer.write_event(event).map_err(|e| PremError::Xmp(e.to_string()))
}

/// Writes `<name>text</name>`.
fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
  write(writer, Event::Start(BytesStart::new(name)))?;
  write(writer, Event::Text(BytesText::new(text)))?;
  write(writer, Event::End(BytesEnd::new(name)))
}
