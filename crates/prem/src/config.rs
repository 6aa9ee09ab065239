//! Configuration file and defaults.
//!
//! The configuration is a TOML file. Every key is optional, so a file only needs to name what it
//! changes:
//!
//! ```toml
//! template = "{author} ({year}) {title}.pdf"
//! lowercase = true
//! sources = ["crossref"]
//! mailto = "me@example.org"
//!
//! [patterns]
//! doi = '10\.1103/[A-Za-z0-9.]+'
//! ```

use crate::{
  cache::{Cache, DiskCache},
  clients::{self, Registry},
  http::HttpClient,
  pipeline, template,
};

use super::*;

/// Name of the configuration file inside the configuration directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Directory of the persistent registry cache
  pub cache_dir:   PathBuf,
  /// Number of leading pages scanned for identifiers
  pub pages:       usize,
  /// Filename template
  pub template:    String,
  /// Lower-case rendered filenames; off keeps the registry's casing
  pub lowercase:   bool,
  /// Where raw records are dumped when they cannot be normalized
  pub dump_path:   PathBuf,
  /// Registries, in the order they are tried
  pub sources:     Vec<String>,
  /// Contact address sent to CrossRef
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mailto:      Option<String>,
  /// Number of results requested from a title search
  pub query_rows:  usize,
  /// Fall back to an interactive title search
  pub interactive: bool,
  /// Embed an XMP packet besides the information dictionary
  pub write_xmp:   bool,
  /// Identifier pattern overrides
  pub patterns:    PatternConfig,
}

/// Regular expressions replacing the built-in identifier patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
  /// DOI pattern
  #[serde(skip_serializing_if = "Option::is_none")]
  pub doi:   Option<String>,
  /// arXiv identifier pattern
  #[serde(skip_serializing_if = "Option::is_none")]
  pub arxiv: Option<String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      cache_dir:   DiskCache::default_dir(),
      pages:       pipeline::DEFAULT_PAGES,
      template:    template::DEFAULT_TEMPLATE.to_string(),
      lowercase:   false,
      dump_path:   PathBuf::from("prem.dump"),
      sources:     vec![clients::crossref::NAME.to_string(), clients::arxiv::NAME.to_string()],
      mailto:      None,
      query_rows:  20,
      interactive: true,
      write_xmp:   true,
      patterns:    PatternConfig::default(),
    }
  }
}

impl Config {
  /// `<config dir>/prem/config.toml`, if the platform has a configuration directory.
  pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("prem").join(CONFIG_FILE))
  }

  /// Parses a configuration from TOML text.
  pub fn from_toml(text: &str) -> Result<Self> { Ok(toml::from_str(text)?) }

  /// Loads the configuration.
  ///
  /// An explicit `path` must exist. Without one, the default path is used if it exists, and the
  /// built-in defaults otherwise.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(path) => path.to_path_buf(),
      None => match Self::default_path().filter(|path| path.exists()) {
        Some(path) => path,
        None => {
          debug!("No configuration file, using defaults");
          return Ok(Self::default());
        },
      },
    };
    debug!("Loading configuration from {}", path.display());
    let text = std::fs::read_to_string(&path)
      .map_err(|e| PremError::Config(format!("Cannot read {}: {e}", path.display())))?;
    Self::from_toml(&text)
  }

  /// Compiles the pattern overrides, keyed by scheme.
  pub fn compiled_patterns(&self) -> Result<BTreeMap<Scheme, IdentifierPattern>> {
    let overrides = [(Scheme::Doi, &self.patterns.doi), (Scheme::Arxiv, &self.patterns.arxiv)];
    overrides
      .into_iter()
      .filter_map(|(scheme, pattern)| pattern.as_deref().map(|pattern| (scheme, pattern)))
      .map(|(scheme, pattern)| -> Result<(Scheme, IdentifierPattern)> {
        Ok((scheme, IdentifierPattern::custom(scheme, pattern)?))
      })
      .collect()
  }

  /// Checks everything that can be checked before a file is processed.
  pub fn validate(&self) -> Result<()> {
    template::fields(&self.template)?;
    self.compiled_patterns()?;
    if self.sources.is_empty() {
      return Err(PremError::Config("No sources configured".into()));
    }
    Ok(())
  }

  /// Builds the configured registries, in order.
  pub fn registries(
    &self,
    http: Arc<dyn HttpClient>,
    cache: Arc<dyn Cache>,
  ) -> Result<Vec<Arc<dyn Registry>>> {
    clients::build_registries(&self.sources, http, cache, &self.compiled_patterns()?, self.query_rows)
  }
}
