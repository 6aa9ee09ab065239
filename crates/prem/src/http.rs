//! The HTTP collaborator used by registry clients.
//!
//! Registry clients only ever issue `GET` requests and inspect the status and body, so the seam is
//! a single method. [`ReqwestClient`] is the production implementation; tests substitute a
//! scripted client to count network calls.

use url::Url;

use super::*;

/// Status and body of a completed `GET` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  /// HTTP status code
  pub status: u16,
  /// Response body decoded as text
  pub body:   String,
}

impl HttpResponse {
  /// Whether the status is in the 2xx range.
  pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

/// Performs single-attempt `GET` requests.
///
/// Implementations must not retry: a registry failure is surfaced immediately and the persistent
/// cache makes re-running cheap.
#[async_trait]
pub trait HttpClient: Send + Sync {
  /// Fetches `url`. Transport failures are [`PremError::RegistryUnavailable`]; any status,
  /// including 4xx and 5xx, is a successful response.
  async fn get(&self, url: &Url) -> Result<HttpResponse>;
}

/// [`HttpClient`] backed by `reqwest`.
pub struct ReqwestClient {
  /// Internal web client used to connect to the registries.
  client: reqwest::Client,
}

impl ReqwestClient {
  /// Creates a client identifying itself to the registries.
  ///
  /// CrossRef routes requests carrying a `mailto:` contact in the user agent to its "polite"
  /// server pool.
  pub fn new(mailto: Option<&str>) -> Result<Self> {
    let user_agent = match mailto {
      Some(mailto) => {
        format!("prem/{} (https://github.com/autoparallel/prem; mailto:{mailto})", env!("CARGO_PKG_VERSION"))
      },
      None => format!("prem/{} (https://github.com/autoparallel/prem)", env!("CARGO_PKG_VERSION")),
    };
    let client = reqwest::Client::builder().user_agent(user_agent).build()?;
    Ok(Self { client })
  }
}

#[async_trait]
impl HttpClient for ReqwestClient {
  async fn get(&self, url: &Url) -> Result<HttpResponse> {
    debug!("GET {url}");
    let response = self.client.get(url.clone()).send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    debug!("{url} answered with status {status}");
    trace!("Response body: {body}");
    Ok(HttpResponse { status, body })
  }
}
