//! Registry clients for the bibliographic sources prem can resolve against.
//!
//! Each source implements the [`Registry`] capability interface: look a record up by identifier,
//! search by free text (or say explicitly that it cannot), and normalize its own records. The
//! resolution pipeline only ever talks to `dyn Registry`, in the order the sources are configured.
//!
//! # Supported Sources
//!
//! - [`crossref`] - CrossRef's REST API, resolving DOIs and searching by title
//! - [`arxiv`] - arXiv's Atom API, resolving arXiv identifiers
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
//! let arxiv = ArxivClient::new(Arc::new(ReqwestClient::new(None)?), Arc::new(MemoryCache::new()));
//! let metadata = arxiv.resolve("2301.07041").await?;
//! println!("{} - {} - {}", metadata.year, metadata.author, metadata.short_title);
//! # Ok(())
//! # }
//! ```

use url::Url;

use super::*;
use crate::{cache::Cache, http::HttpClient};

pub mod arxiv;
pub mod crossref;

pub use arxiv::ArxivClient;
pub use crossref::CrossRefClient;

/// A registry record exactly as the source returned it, in JSON form.
///
/// For CrossRef this is the `message` object of a work; for arXiv it is the Atom entry converted
/// to JSON. Records are what the cache stores and what diagnostic dumps contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(pub serde_json::Value);

impl RawRecord {
  /// The record as pretty-printed JSON.
  pub fn to_pretty_json(&self) -> Result<String> { Ok(serde_json::to_string_pretty(&self.0)?) }
}

/// Uniform capability interface over bibliographic sources.
#[async_trait]
pub trait Registry: Send + Sync {
  /// Short lowercase source name, also used as the cache key prefix.
  fn name(&self) -> &'static str;

  /// Pattern recognizing the identifiers this source resolves.
  fn pattern(&self) -> &IdentifierPattern;

  /// Scheme of the identifiers this source resolves.
  fn scheme(&self) -> Scheme { self.pattern().scheme() }

  /// Fetches the record for `identifier`.
  ///
  /// Returns `Ok(None)` when the registry has no record (any non-success status). Each distinct
  /// identifier hits the network at most once; later calls are served from the persistent cache.
  async fn fetch_by_identifier(&self, identifier: &str) -> Result<Option<RawRecord>>;

  /// Whether [`Registry::query_by_title`] is implemented.
  fn supports_query(&self) -> bool { false }

  /// Free-text search, returning matches in registry rank order.
  ///
  /// Sources without search return [`PremError::QueryUnsupported`].
  async fn query_by_title(&self, text: &str) -> Result<Vec<RawRecord>> {
    let _ = text;
    Err(PremError::QueryUnsupported(self.name().to_string()))
  }

  /// Maps one of this source's records to [`Metadata`]. Pure.
  fn normalize(&self, record: &RawRecord) -> Result<Metadata>;

  /// Fetches and normalizes in one step. A missing record is [`PremError::NotFound`].
  async fn resolve(&self, identifier: &str) -> Result<Metadata> {
    match self.fetch_by_identifier(identifier).await? {
      Some(record) => self.normalize(&record),
      None => Err(PremError::NotFound(format!("{}:{identifier}", self.scheme().prefix()))),
    }
  }
}

/// Builds the registries named in `sources`, in order.
///
/// Each registry uses the given pattern override for its scheme if one is present.
pub fn build_registries(
  sources: &[String],
  http: Arc<dyn HttpClient>,
  cache: Arc<dyn Cache>,
  patterns: &BTreeMap<Scheme, IdentifierPattern>,
  query_rows: usize,
) -> Result<Vec<Arc<dyn Registry>>> {
  let mut registries: Vec<Arc<dyn Registry>> = Vec::with_capacity(sources.len());
  for source in sources {
    let registry: Arc<dyn Registry> = match source.to_lowercase().as_str() {
      crossref::NAME => {
        let mut client = CrossRefClient::new(http.clone(), cache.clone()).with_rows(query_rows);
        if let Some(pattern) = patterns.get(&Scheme::Doi) {
          client = client.with_pattern(pattern.clone());
        }
        Arc::new(client)
      },
      arxiv::NAME => {
        let mut client = ArxivClient::new(http.clone(), cache.clone());
        if let Some(pattern) = patterns.get(&Scheme::Arxiv) {
          client = client.with_pattern(pattern.clone());
        }
        Arc::new(client)
      },
      other => return Err(PremError::Config(format!("Unknown source: {other}"))),
    };
    registries.push(registry);
  }
  Ok(registries)
}

/// Cache-through identifier lookup shared by the registry clients.
///
/// The cached value is the JSON of `Option<RawRecord>`. Successful records and 404 answers are
/// stored; other non-success statuses are not, so a transient 429 or 5xx is retried next run.
/// `parse` turns a 2xx body into a record and may itself report "not found" with `None`.
pub(crate) async fn fetch_cached<F>(
  http: &dyn HttpClient,
  cache: &dyn Cache,
  key: &str,
  url: &Url,
  parse: F,
) -> Result<Option<RawRecord>>
where
  F: FnOnce(&str) -> Result<Option<RawRecord>> + Send,
{
  if let Some(cached) = cache.get(key).await? {
    debug!("Cache hit for {key}");
    return Ok(serde_json::from_str(&cached)?);
  }

  let response = http.get(url).await?;
  let record = match response.status {
    404 => {
      debug!("{key} is not registered");
      None
    },
    status if !(200..300).contains(&status) => {
      warn!("Registry answered {status} for {key}; not caching");
      return Ok(None);
    },
    _ => parse(&response.body)?,
  };

  cache.put(key, serde_json::to_string(&record)?).await?;
  Ok(record)
}

/// Removes a case-insensitive prefix, if present.
pub(crate) fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
  let head = text.get(..prefix.len())?;
  head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}


#[cfg(test)]
mod tests {
  use super::{mock::MockHttp, *};
  use crate::cache::MemoryCache;

  fn url() -> Url { Url::parse("https://registry.test/works/x").unwrap() }

  #[tokio::test]
  async fn test_fetch_cached_stores_success_and_404() -> anyhow::Result<()> {
    let http = MockHttp::new().respond("https://registry.test/works/x", 200, r#"{"a":1}"#);
    let cache = MemoryCache::new();
    let parse = |body: &str| -> Result<Option<RawRecord>> {
      Ok(Some(RawRecord(serde_json::from_str(body)?)))
    };

    let first = fetch_cached(&http, &cache, "t:x", &url(), parse).await?;
    let second = fetch_cached(&http, &cache, "t:x", &url(), parse).await?;
    assert_eq!(first, second);
    assert_eq!(http.calls(), 1);

    let missing = Url::parse("https://registry.test/works/y")?;
    assert_eq!(fetch_cached(&http, &cache, "t:y", &missing, parse).await?, None);
    assert_eq!(fetch_cached(&http, &cache, "t:y", &missing, parse).await?, None);
    assert_eq!(http.calls(), 2);
    assert_eq!(cache.get("t:y").await?.as_deref(), Some("null"));
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_fetch_cached_skips_transient_failures() -> anyhow::Result<()> {
    let http = MockHttp::new().respond("https://registry.test/", 503, "busy");
    let cache = MemoryCache::new();
    let parse = |_: &str| -> Result<Option<RawRecord>> { Ok(None) };

    assert_eq!(fetch_cached(&http, &cache, "t:x", &url(), parse).await?, None);
    assert_eq!(fetch_cached(&http, &cache, "t:x", &url(), parse).await?, None);
    assert_eq!(http.calls(), 2);
    assert!(cache.is_empty());
    assert!(logs_contain("not caching"));
    Ok(())
  }

  #[test]
  fn test_strip_prefix_ignore_case() {
    assert_eq!(strip_prefix_ignore_case("DOI:10.1/x", "doi:"), Some("10.1/x"));
    assert_eq!(strip_prefix_ignore_case("10.1/x", "doi:"), None);
    assert_eq!(strip_prefix_ignore_case("do", "doi:"), None);
  }

  #[test]
  fn test_build_registries() {
    let http: Arc<dyn HttpClient> = Arc::new(MockHttp::new());
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
    let sources = vec!["crossref".to_string(), "arXiv".to_string()];
    let registries =
      build_registries(&sources, http.clone(), cache.clone(), &BTreeMap::new(), 20).unwrap();
    let names: Vec<_> = registries.iter().map(|r| r.name()).collect();
    assert_eq!(names, ["crossref", "arxiv"]);
    assert!(registries[0].supports_query());
    assert!(!registries[1].supports_query());

    let result = build_registries(&["iacr".into()], http, cache, &BTreeMap::new(), 20);
    assert!(matches!(result, Err(PremError::Config(_))));
  }
}
