//! Client for resolving arXiv identifiers through the arXiv Atom API.
//!
//! Lookups go to `http://export.arxiv.org/api/query?id_list={id}` and the single Atom entry is
//! converted to an [`ArxivRecord`] before it is cached under `arxiv:<id>`. arXiv offers no
//! title search prem can use, so [`Registry::query_by_title`] reports
//! [`PremError::QueryUnsupported`].
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use prem::{
//!   cache::MemoryCache,
//!   clients::{ArxivClient, Registry},
//!   http::ReqwestClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArxivClient::new(Arc::new(ReqwestClient::new(None)?), Arc::new(MemoryCache::new()));
//! if let Some(record) = client.fetch_by_identifier("arXiv:2301.07041").await? {
//!   println!("{}", client.normalize(&record)?.title);
//! }
//! # Ok(())
//! # }
//! ```

use quick_xml::de::from_str;

use super::*;
use crate::normalize::{
  self,
  arxiv::{strip_abs_url, ArxivRecord},
};

/// Source name and cache key prefix.
pub const NAME: &str = "arxiv";

/// Base URL of the arXiv query API.
pub const BASE_URL: &str = "http://export.arxiv.org/api/query";

/// Internal representation of the arXiv API's Atom feed response.
#[derive(Debug, Deserialize)]
struct Feed {
  /// Matching entries; empty when the identifier is unknown
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

/// One Atom entry.
#[derive(Debug, Deserialize)]
struct Entry {
  /// Abstract URL, or an `api/errors` URL for error entries
  id:          String,
  /// Title (may contain line breaks)
  #[serde(default)]
  title:       String,
  /// Abstract
  #[serde(default)]
  summary:     String,
  /// Timestamp of the first version
  #[serde(default)]
  published:   String,
  /// Authors in byline order
  #[serde(rename = "author", default)]
  authors:     Vec<Author>,
  /// Categories, primary first
  #[serde(rename = "category", default)]
  categories:  Vec<Category>,
  /// Journal reference supplied by the authors
  #[serde(rename = "journal_ref")]
  journal_ref: Option<String>,
}

/// Internal representation of an author from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Author {
  /// Author's full name
  name: String,
}

/// A `<category term="..."/>` element.
#[derive(Debug, Deserialize)]
struct Category {
  /// Category term, e.g. `cs.CR`
  #[serde(rename = "@term")]
  term: String,
}

impl From<Entry> for ArxivRecord {
  fn from(entry: Entry) -> Self {
    Self {
      id:          entry.id,
      title:       entry.title,
      summary:     entry.summary.trim().to_string(),
      published:   entry.published,
      authors:     entry.authors.into_iter().map(|author| author.name).collect(),
      categories:  entry.categories.into_iter().map(|category| category.term).collect(),
      journal_ref: entry.journal_ref,
    }
  }
}

/// Registry client for arXiv.
pub struct ArxivClient {
  /// HTTP collaborator
  http:     Arc<dyn HttpClient>,
  /// Persistent record cache
  cache:    Arc<dyn Cache>,
  /// Query endpoint, overridable for tests
  base_url: String,
  /// arXiv identifier recognizer
  pattern:  IdentifierPattern,
}

impl ArxivClient {
  /// Creates a client using the public arXiv API.
  pub fn new(http: Arc<dyn HttpClient>, cache: Arc<dyn Cache>) -> Self {
    Self { http, cache, base_url: BASE_URL.to_string(), pattern: IdentifierPattern::arxiv() }
  }

  /// Points the client at a different query endpoint.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Replaces the arXiv identifier recognizer.
  pub fn with_pattern(mut self, pattern: IdentifierPattern) -> Self {
    self.pattern = pattern;
    self
  }
}

/// Strips `arXiv:` and abstract URL prefixes from an identifier.
pub fn bare_arxiv_id(identifier: &str) -> &str {
  let identifier = strip_abs_url(identifier.trim());
  strip_prefix_ignore_case(identifier, "arxiv:").unwrap_or(identifier).trim()
}

/// Extracts the single entry of a feed. Empty feeds and arXiv error entries are "not found".
fn parse_feed(body: &str) -> Result<Option<RawRecord>> {
  let feed: Feed = from_str(body)
    .map_err(|e| PremError::RegistryResponse(format!("Failed to parse arXiv XML: {e}")))?;

  let Some(entry) = feed.entries.into_iter().next() else {
    return Ok(None);
  };
  if entry.id.contains("arxiv.org/api/errors") {
    warn!("arXiv rejected the identifier: {}", entry.summary.trim());
    return Ok(None);
  }

  let record = ArxivRecord::from(entry);
  Ok(Some(RawRecord(serde_json::to_value(record)?)))
}

#[async_trait]
impl Registry for ArxivClient {
  fn name(&self) -> &'static str { NAME }

  fn pattern(&self) -> &IdentifierPattern { &self.pattern }

  async fn fetch_by_identifier(&self, identifier: &str) -> Result<Option<RawRecord>> {
    let id = bare_arxiv_id(identifier);
    let mut url = Url::parse(&self.base_url)?;
    url.query_pairs_mut().append_pair("id_list", id).append_pair("max_results", "1");
    debug!("Fetching {id} from arXiv via {url}");
    let key = format!("{NAME}:{id}");
    fetch_cached(self.http.as_ref(), self.cache.as_ref(), &key, &url, parse_feed).await
  }

  fn normalize(&self, record: &RawRecord) -> Result<Metadata> { normalize::arxiv::normalize(record) }
}

#[cfg(test)]
mod tests {
  use super::{super::mock::*, *};
  use crate::cache::MemoryCache;

  const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <link href="http://arxiv.org/api/query?id_list=2301.07041" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: id_list=2301.07041</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <updated>2023-01-18T00:00:00-05:00</updated>
  <entry>
    <id>http://arxiv.org/abs/2301.07041v2</id>
    <updated>2023-02-01T10:00:00Z</updated>
    <published>2023-01-17T18:59:59Z</published>
    <title>Verifiable Fully Homomorphic
  Encryption</title>
    <summary>  Fully Homomorphic Encryption is seeing increasing real-world deployment.
</summary>
    <author>
      <name>Alexander Viand</name>
    </author>
    <author>
      <name>Christian Knabenhans</name>
    </author>
    <arxiv:journal_ref>IEEE S&amp;P 2024</arxiv:journal_ref>
    <link href="http://arxiv.org/abs/2301.07041v2" rel="alternate" type="text/html"/>
    <arxiv:primary_category term="cs.CR" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CR" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

  const ERROR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query: id_list=1234</title>
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
    <title>Error</title>
    <summary>incorrect id format for 1234</summary>
  </entry>
</feed>"#;

  const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query: id_list=9912.99999</title>
</feed>"#;

  #[test]
  fn test_parse_feed() {
    let record = parse_feed(FEED).unwrap().unwrap();
    let entry: ArxivRecord = serde_json::from_value(record.0.clone()).unwrap();
    assert_eq!(entry.id, "http://arxiv.org/abs/2301.07041v2");
    assert_eq!(entry.authors, ["Alexander Viand", "Christian Knabenhans"]);
    assert_eq!(entry.categories, ["cs.CR", "cs.LG"]);
    assert_eq!(entry.journal_ref.as_deref(), Some("IEEE S&P 2024"));

    let metadata = normalize::arxiv::normalize(&record).unwrap();
    assert_eq!(metadata.title, "Verifiable Fully Homomorphic Encryption");
    assert_eq!(metadata.author, "Viand");
    assert_eq!(metadata.year, "2023");
    assert_eq!(metadata.description, "IEEE S&P 2024");
  }

  #[test]
  fn test_feed_without_journal_ref() {
    let feed = FEED.replace("<arxiv:journal_ref>IEEE S&amp;P 2024</arxiv:journal_ref>", "");
    let record = parse_feed(&feed).unwrap().unwrap();
    assert_eq!(normalize::arxiv::normalize(&record).unwrap().description, "");
  }

  #[test]
  fn test_error_and_empty_feeds_are_not_found() {
    assert_eq!(parse_feed(ERROR_FEED).unwrap(), None);
    assert_eq!(parse_feed(EMPTY_FEED).unwrap(), None);
  }

  #[test]
  fn test_bare_arxiv_id() {
    assert_eq!(bare_arxiv_id("arXiv:2301.07041"), "2301.07041");
    assert_eq!(bare_arxiv_id("https://arxiv.org/abs/2301.07041v2"), "2301.07041v2");
    assert_eq!(bare_arxiv_id("2301.07041"), "2301.07041");
  }

  #[traced_test]
  #[tokio::test]
  async fn test_fetch_is_cached() -> anyhow::Result<()> {
    let http = Arc::new(MockHttp::new().respond(BASE_URL, 200, FEED));
    let client = ArxivClient::new(http.clone(), Arc::new(MemoryCache::new()));

    let first = client.resolve("2301.07041").await?;
    let second = client.resolve("arXiv:2301.07041").await?;
    assert_eq!(first, second);
    assert_eq!(http.calls(), 1);
    assert!(http.urls()[0].contains("id_list=2301.07041"));
    Ok(())
  }

  #[tokio::test]
  async fn test_query_is_unsupported() {
    let client = ArxivClient::new(Arc::new(MockHttp::new()), Arc::new(MemoryCache::new()));
    assert!(!client.supports_query());
    let err = client.query_by_title("homomorphic encryption").await.unwrap_err();
    assert!(matches!(err, PremError::QueryUnsupported(ref name) if name == "arxiv"));
  }
}
