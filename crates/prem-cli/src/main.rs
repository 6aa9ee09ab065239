use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use clap::{builder::ArgAction, Parser};
use console::{style, Emoji};
use errors::PremCliError;
use prem::{
  config::Config,
  interaction::{Interaction, Unattended},
  session::{Outcome, Session},
};
use tracing::{debug, warn};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod errors;
pub mod interaction;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

/// Name of the log file in the log directory.
const LOG_FILE: &str = "prem.log";

#[derive(Parser)]
#[command(author, version, about = "Rename academic PDFs and embed their bibliographic metadata")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(short, long, action = ArgAction::Count, help = "Increase logging verbosity")]
  verbose: u8,

  /// Configuration file (default: <config dir>/prem/config.toml)
  #[arg(long, short)]
  config: Option<PathBuf>,

  /// Number of leading pages searched for identifiers
  #[arg(long)]
  pages: Option<usize>,

  /// Filename template, e.g. "{year} - {author} - {title}.pdf"
  #[arg(long, short)]
  template: Option<String>,

  /// Directory of the registry cache
  #[arg(long)]
  cache_dir: Option<PathBuf>,

  /// Directory the log file is written to (default: <data dir>/prem)
  #[arg(long)]
  log_dir: Option<PathBuf>,

  /// Never fall back to an interactive title search
  #[arg(long)]
  no_interactive: bool,

  /// Print the new names without changing any file
  #[arg(long, short = 'n')]
  dry_run: bool,

  /// Lower-case the new filenames
  #[arg(long)]
  lowercase: bool,

  /// PDF files; glob patterns are expanded
  #[arg(required = true)]
  files: Vec<String>,
}

impl Cli {
  /// The configuration file with command line overrides applied.
  fn config(&self) -> Result<Config, PremCliError> {
    let mut config = Config::load(self.config.as_deref())?;
    if let Some(pages) = self.pages {
      config.pages = pages;
    }
    if let Some(template) = &self.template {
      config.template = template.clone();
    }
    if let Some(cache_dir) = &self.cache_dir {
      config.cache_dir = cache_dir.clone();
    }
    if self.no_interactive {
      config.interactive = false;
    }
    if self.lowercase {
      config.lowercase = true;
    }
    config.validate()?;
    debug!("Using config: {config:?}");
    Ok(config)
  }
}

/// Setup logging to stderr with the specified verbosity level, and to the log file.
///
/// The returned guard flushes the log file when dropped.
fn setup_logging(verbosity: u8, log_dir: &Path) -> Result<WorkerGuard, PremCliError> {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  std::fs::create_dir_all(log_dir)?;
  let file_appender = rolling::RollingFileAppender::builder()
    .rotation(rolling::Rotation::NEVER)
    .filename_prefix(LOG_FILE)
    .build(log_dir)?;
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  let file_layer = tracing_subscriber::fmt::layer()
    .with_writer(file_writer)
    .with_ansi(false)
    .with_target(true)
    .with_line_number(true);
  let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true);

  tracing_subscriber::registry().with(filter).with(file_layer).with(stderr_layer).init();
  Ok(guard)
}

/// Default log directory.
fn default_log_dir() -> PathBuf {
  dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("prem")
}

/// Expands glob patterns among the arguments. Plain paths are passed through unchanged.
fn expand(args: &[String]) -> Result<Vec<PathBuf>, PremCliError> {
  let mut files = Vec::new();
  for arg in args {
    if !arg.contains(['*', '?', '[']) {
      files.push(PathBuf::from(arg));
      continue;
    }
    let before = files.len();
    files.extend(glob::glob(arg)?.flatten());
    if files.len() == before {
      warn!("No files match {arg}");
    }
  }
  Ok(files)
}

#[tokio::main]
async fn main() -> Result<(), PremCliError> {
  let cli = Cli::parse();
  let _guard = setup_logging(cli.verbose, &cli.log_dir.clone().unwrap_or_else(default_log_dir))?;

  let config = cli.config()?;
  let interaction: Arc<dyn Interaction> =
    if config.interactive { Arc::new(interaction::Terminal) } else { Arc::new(Unattended) };
  let session = Session::from_config(&config, interaction).await?.with_dry_run(cli.dry_run);

  for file in expand(&cli.files)? {
    println!("{} {}", style(LOOKING_GLASS).cyan(), style(file.display()).yellow());
    match session.process(&file).await {
      Ok(Outcome::Renamed { to, .. }) => {
        println!("   {} {}", style(SUCCESS).green(), style(to.display()).white().bold());
      },
      Ok(Outcome::Planned { to, .. }) => {
        println!(
          "   {} would rename to {}",
          style(PAPER).cyan(),
          style(to.display()).white().bold()
        );
      },
      Ok(Outcome::Unresolved) => {
        println!("   {} no action taken", style(WARNING).yellow());
      },
      Err(e) => {
        println!("   {} {}", style("✖").red(), style(e).red());
      },
    }
  }
  Ok(())
}
