//! A library for identifying academic PDFs, fetching their canonical bibliographic metadata and
//! embedding it back into the file under a standardized name.
//!
//! The flow for a single file is:
//! 1. look for a DOI or arXiv identifier in the PDF's metadata dictionary,
//! 2. then in the text of its first pages,
//! 3. then fall back to an interactive title search,
//! 4. normalize the registry record into [`Metadata`](metadata::Metadata),
//! 5. merge it into the PDF and save it as `"{year} - {author} - {title}.pdf"`.
//!
//! # Example
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use prem::{
//!   cache::DiskCache,
//!   clients::{CrossRefClient, Registry},
//!   config::Config,
//!   http::ReqwestClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let config = Config::default();
//!   let cache = Arc::new(DiskCache::open(&config.cache_dir).await?);
//!   let http = Arc::new(ReqwestClient::new(config.mailto.as_deref())?);
//!   let crossref = CrossRefClient::new(http, cache);
//!
//!   if let Some(record) = crossref.fetch_by_identifier("10.1103/PhysRevD.13.191").await? {
//!     let metadata = crossref.normalize(&record)?;
//!     println!("{}", metadata.title);
//!   }
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  collections::{BTreeMap, BTreeSet},
  path::{Path, PathBuf},
  sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod cache;
pub mod clients;
pub mod config;
pub mod errors;
pub mod format;
pub mod http;
pub mod identifier;
pub mod interaction;
pub mod metadata;
pub mod normalize;
pub mod pdf;
pub mod pipeline;
pub mod rewrite;
pub mod session;
pub mod template;
pub mod xmp;

use errors::{PremError, Result};
use identifier::{IdentifierPattern, Scheme};
use metadata::{Field, Metadata};

/// Common traits and types for ergonomic imports.
pub mod prelude {
  pub use crate::{
    cache::Cache,
    clients::Registry,
    errors::{PremError, Result},
    http::HttpClient,
    interaction::Interaction,
    pdf::{PdfDocument, PdfEngine},
  };
}
