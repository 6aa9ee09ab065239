//! Per-file driver: open, resolve, rewrite.
//!
//! A [`Session`] processes one file at a time. Errors are reported for the file they occurred in
//! and leave the session usable for the next one.

use crate::{
  cache::DiskCache,
  config::Config,
  http::ReqwestClient,
  interaction::Interaction,
  pdf::{LopdfEngine, PdfEngine},
  pipeline::{Resolution, Resolver},
  rewrite::Rewriter,
};

use super::*;

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// The file was rewritten and now lives at `to`.
  Renamed {
    /// Original path
    from: PathBuf,
    /// New path
    to:   PathBuf,
  },
  /// Dry run: the file would have been rewritten to `to`.
  Planned {
    /// Original path
    from: PathBuf,
    /// Path it would get
    to:   PathBuf,
  },
  /// No metadata was found; the file was left alone.
  Unresolved,
}

/// Resolves and rewrites files.
pub struct Session {
  /// PDF backend
  engine:    Box<dyn PdfEngine>,
  /// Resolution pipeline
  resolver:  Resolver,
  /// Rename and rewrite step
  rewriter:  Rewriter,
  /// Only report what would be done
  dry_run:   bool,
  /// Destination for raw records that could not be normalized
  dump_path: PathBuf,
}

impl Session {
  /// Creates a session that rewrites files and dumps unreadable records to `prem.dump`.
  pub fn new(engine: Box<dyn PdfEngine>, resolver: Resolver, rewriter: Rewriter) -> Self {
    Self { engine, resolver, rewriter, dry_run: false, dump_path: PathBuf::from("prem.dump") }
  }

  /// Builds the production session described by `config`: lopdf, reqwest and the disk cache.
  pub async fn from_config(config: &Config, interaction: Arc<dyn Interaction>) -> Result<Self> {
    config.validate()?;
    let cache = Arc::new(DiskCache::open(&config.cache_dir).await?);
    let http = Arc::new(ReqwestClient::new(config.mailto.as_deref())?);
    let resolver = Resolver::new(config.registries(http, cache)?, interaction)
      .with_pages(config.pages)
      .with_interactive(config.interactive);
    let rewriter = Rewriter::new(config.template.clone(), config.lowercase);
    Ok(
      Self::new(Box::new(LopdfEngine::new(config.write_xmp)), resolver, rewriter)
        .with_dump_path(config.dump_path.clone()),
    )
  }

  /// Only render target names; never modify files.
  pub fn with_dry_run(mut self, dry_run: bool) -> Self {
    self.dry_run = dry_run;
    self
  }

  /// Sets where unreadable records are dumped.
  pub fn with_dump_path(mut self, dump_path: impl Into<PathBuf>) -> Self {
    self.dump_path = dump_path.into();
    self
  }

  /// Processes one file.
  pub async fn process(&self, path: &Path) -> Result<Outcome> {
    info!("Processing {}", path.display());
    let mut doc = self.engine.open(path)?;

    let metadata = match self.resolver.resolve(doc.as_ref()).await {
      Ok(Resolution::Resolved(metadata)) => metadata,
      Ok(Resolution::Unresolved) => {
        info!("No action taken for {}", path.display());
        return Ok(Outcome::Unresolved);
      },
      Err(e @ PremError::MetadataExtraction { .. }) => {
        self.dump(&e).await;
        return Err(e);
      },
      Err(e) => return Err(e),
    };

    let from = path.to_path_buf();
    if self.dry_run {
      let to = self.rewriter.plan(path, &metadata)?;
      return Ok(Outcome::Planned { from, to });
    }
    let to = self.rewriter.apply(doc.as_mut(), &metadata)?;
    info!("Renamed {} to {}", from.display(), to.display());
    Ok(Outcome::Renamed { from, to })
  }

  /// Writes the record carried by a [`PremError::MetadataExtraction`] to the dump file.
  async fn dump(&self, error: &PremError) {
    let PremError::MetadataExtraction { record, .. } = error else { return };
    let written = match record.to_pretty_json() {
      Ok(json) => tokio::fs::write(&self.dump_path, json).await.map_err(PremError::from),
      Err(e) => Err(e),
    };
    match written {
      Ok(()) => warn!("Dumped the unreadable record to {}", self.dump_path.display()),
      Err(e) => warn!("Could not dump the unreadable record to {}: {e}", self.dump_path.display()),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use tempfile::tempdir;

  use super::*;
  use crate::{
    cache::MemoryCache,
    clients::{mock::MockHttp, CrossRefClient, Registry},
    interaction::scripted::ScriptedInteraction,
    pdf::fake::{FakeDocument, FakeEngine},
  };

  const PAGE: &str = "Phys. Rev. D 13, 191 (1976) doi:10.1103/PhysRevD.13.191";
  const WORK_URL: &str = "https://api.crossref.org/works/10.1103%2FPhysRevD.13.191";

  fn session(http: MockHttp, page: &str) -> Session {
    let registries: Vec<Arc<dyn Registry>> =
      vec![Arc::new(CrossRefClient::new(Arc::new(http), Arc::new(MemoryCache::new())))];
    let resolver = Resolver::new(registries, Arc::new(ScriptedInteraction::default()))
      .with_interactive(false);
    Session::new(
      Box::new(FakeEngine(FakeDocument::with_pages(&[page]))),
      resolver,
      Rewriter::new("{year} - {author} - {title}.pdf", true),
    )
  }

  fn hawking() -> MockHttp {
    let body = json!({"status": "ok", "message": {
      "type": "journal-article",
      "title": ["Black holes and thermodynamics"],
      "author": [{"sequence": "first", "family": "Hawking"}],
      "issued": {"date-parts": [[1976, 1, 15]]},
      "DOI": "10.1103/PhysRevD.13.191"
    }});
    MockHttp::new().respond(WORK_URL, 200, &body.to_string())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_process_renames() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("hawking.pdf");
    std::fs::write(&input, b"%PDF")?;

    let outcome = session(hawking(), PAGE).process(&input).await?;
    let expected = dir.path().join("1976 - hawking - black holes and thermodynamics.pdf");
    assert_eq!(outcome, Outcome::Renamed { from: input.clone(), to: expected.clone() });
    assert!(!input.exists());
    assert!(std::fs::read_to_string(expected)?.contains("10.1103/PhysRevD.13.191"));
    Ok(())
  }

  #[tokio::test]
  async fn test_dry_run_leaves_file_alone() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("hawking.pdf");
    std::fs::write(&input, b"%PDF")?;

    let outcome = session(hawking(), PAGE).with_dry_run(true).process(&input).await?;
    let Outcome::Planned { to, .. } = outcome else { panic!("expected a plan") };
    assert!(!to.exists());
    assert_eq!(std::fs::read(&input)?, b"%PDF");
    Ok(())
  }

  #[tokio::test]
  async fn test_unresolved_is_no_action() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("notes.pdf");
    std::fs::write(&input, b"%PDF")?;

    let outcome = session(MockHttp::new(), "meeting notes").process(&input).await?;
    assert_eq!(outcome, Outcome::Unresolved);
    assert_eq!(std::fs::read(&input)?, b"%PDF");
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_unreadable_record_is_dumped() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("broken.pdf");
    let dump = dir.path().join("prem.dump");
    std::fs::write(&input, b"%PDF")?;
    let body = r#"{"status":"ok","message":{"type":"journal-article","DOI":"10.1103/PhysRevD.13.191"}}"#;

    let session = session(MockHttp::new().respond(WORK_URL, 200, body), PAGE).with_dump_path(&dump);
    let err = session.process(&input).await.unwrap_err();
    assert!(matches!(err, PremError::MetadataExtraction { .. }));

    let dumped: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&dump)?)?;
    assert_eq!(dumped["DOI"], "10.1103/PhysRevD.13.191");
    assert!(input.exists());
    assert!(logs_contain("Dumped the unreadable record"));
    Ok(())
  }

  #[tokio::test]
  async fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = session(MockHttp::new(), PAGE).process(&dir.path().join("absent.pdf")).await.unwrap_err();
    assert!(matches!(err, PremError::Io(_)));
  }
}
