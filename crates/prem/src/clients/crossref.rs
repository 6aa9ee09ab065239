//! Client for resolving DOIs and searching titles through the CrossRef REST API.
//!
//! Uses `https://api.crossref.org/works/{doi}` for lookups and
//! `https://api.crossref.org/works?query.bibliographic=...` for free-text search. Lookups are
//! cached under `crossref:<doi>`; searches are user-initiated and always go to the network.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use prem::{
//!   cache::MemoryCache,
//!   clients::{CrossRefClient, Registry},
//!   http::ReqwestClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CrossRefClient::new(Arc::new(ReqwestClient::new(None)?), Arc::new(MemoryCache::new()));
//! for record in client.query_by_title("black holes and thermodynamics").await? {
//!   if let Ok(metadata) = client.normalize(&record) {
//!     println!("{}", metadata.identifier);
//!   }
//! }
//! # Ok(())
//! # }
//! ```

use super::*;
use crate::normalize;

/// Source name and cache key prefix.
pub const NAME: &str = "crossref";

/// Base URL of the CrossRef works endpoint.
pub const BASE_URL: &str = "https://api.crossref.org/works";

/// Envelope of every CrossRef API response.
#[derive(Debug, Deserialize)]
struct CrossrefResponse<T> {
  /// The payload
  message: T,
}

/// Payload of a search response.
#[derive(Debug, Deserialize)]
struct CrossrefItems {
  /// Matches in rank order
  #[serde(default)]
  items: Vec<serde_json::Value>,
}

/// Registry client for CrossRef.
pub struct CrossRefClient {
  /// HTTP collaborator
  http:     Arc<dyn HttpClient>,
  /// Persistent record cache
  cache:    Arc<dyn Cache>,
  /// Works endpoint, overridable for tests
  base_url: String,
  /// Number of search results requested
  rows:     usize,
  /// DOI recognizer
  pattern:  IdentifierPattern,
}

impl CrossRefClient {
  /// Creates a client using the public CrossRef API.
  pub fn new(http: Arc<dyn HttpClient>, cache: Arc<dyn Cache>) -> Self {
    Self { http, cache, base_url: BASE_URL.to_string(), rows: 20, pattern: IdentifierPattern::doi() }
  }

  /// Points the client at a different works endpoint.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Sets how many search results are requested.
  pub fn with_rows(mut self, rows: usize) -> Self {
    self.rows = rows;
    self
  }

  /// Replaces the DOI recognizer.
  pub fn with_pattern(mut self, pattern: IdentifierPattern) -> Self {
    self.pattern = pattern;
    self
  }

  /// URL of the work with the given DOI. The DOI is a single, percent-encoded path segment.
  fn work_url(&self, doi: &str) -> Result<Url> {
    let mut url = Url::parse(&self.base_url)?;
    url
      .path_segments_mut()
      .map_err(|_| PremError::Config(format!("{} cannot be a base URL", self.base_url)))?
      .push(doi);
    Ok(url)
  }
}

/// Strips `doi:` and resolver URL prefixes from a DOI.
pub fn bare_doi(identifier: &str) -> &str {
  let identifier = identifier.trim();
  ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"]
    .into_iter()
    .find_map(|prefix| strip_prefix_ignore_case(identifier, prefix))
    .unwrap_or(identifier)
    .trim()
}

/// Extracts the work from a `GET /works/{doi}` body.
fn parse_work(body: &str) -> Result<Option<RawRecord>> {
  let response: CrossrefResponse<serde_json::Value> = serde_json::from_str(body)
    .map_err(|e| PremError::RegistryResponse(format!("Failed to parse CrossRef JSON: {e}")))?;
  Ok(Some(RawRecord(response.message)))
}

#[async_trait]
impl Registry for CrossRefClient {
  fn name(&self) -> &'static str { NAME }

  fn pattern(&self) -> &IdentifierPattern { &self.pattern }

  async fn fetch_by_identifier(&self, identifier: &str) -> Result<Option<RawRecord>> {
    let doi = bare_doi(identifier);
    let url = self.work_url(doi)?;
    debug!("Fetching {doi} from CrossRef via {url}");
    let key = format!("{NAME}:{}", doi.to_lowercase());
    fetch_cached(self.http.as_ref(), self.cache.as_ref(), &key, &url, parse_work).await
  }

  fn supports_query(&self) -> bool { true }

  async fn query_by_title(&self, text: &str) -> Result<Vec<RawRecord>> {
    let mut url = Url::parse(&self.base_url)?;
    url
      .query_pairs_mut()
      .append_pair("query.bibliographic", text)
      .append_pair("rows", &self.rows.to_string());
    debug!("Querying CrossRef via {url}");

    let response = self.http.get(&url).await?;
    if !response.is_success() {
      return Err(PremError::QueryFailed { status: response.status, query: text.to_string() });
    }

    let response: CrossrefResponse<CrossrefItems> = serde_json::from_str(&response.body)
      .map_err(|e| PremError::RegistryResponse(format!("Failed to parse CrossRef JSON: {e}")))?;
    info!("CrossRef returned {} matches for {text:?}", response.message.items.len());
    Ok(response.message.items.into_iter().map(RawRecord).collect())
  }

  fn normalize(&self, record: &RawRecord) -> Result<Metadata> { normalize::crossref::normalize(record) }
}
