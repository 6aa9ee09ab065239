//! Persistent identifier → record cache.
//!
//! Registries rate-limit, so every identifier is fetched at most once: the registry clients
//! consult a [`Cache`] before going to the network and store what they got afterwards. Keys are
//! `"<source>:<identifier>"` and values are the JSON text of the raw record (`null` for a
//! cached "not found").
//!
//! The store is append-only from the caller's point of view. Two processes sharing a cache
//! directory may race on the first write of a key; the last write wins, which is harmless because a
//! registry record for a given identifier does not change.

use std::{collections::HashMap, sync::Mutex};

use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;

use super::*;

/// File name of the SQLite store inside the cache directory.
pub const CACHE_FILE: &str = "registry.db";

/// A string-keyed, string-valued persistent store.
#[async_trait]
pub trait Cache: Send + Sync {
  /// Returns the stored value for `key`, if any.
  async fn get(&self, key: &str) -> Result<Option<String>>;

  /// Stores `value` under `key`, replacing any previous value.
  async fn put(&self, key: &str, value: String) -> Result<()>;
}

/// [`Cache`] backed by a SQLite database in a directory.
pub struct DiskCache {
  /// Async handle to the database
  conn: Connection,
  /// Location of the database file
  path: PathBuf,
}

impl DiskCache {
  /// Opens (creating if needed) the cache stored in `dir`.
  pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(CACHE_FILE);
    debug!("Opening registry cache at {}", path.display());

    let conn = Connection::open(&path).await?;
    conn
      .call(|conn| {
        conn.execute_batch(
          "CREATE TABLE IF NOT EXISTS records (
             key         TEXT PRIMARY KEY NOT NULL,
             value       TEXT NOT NULL,
             inserted_at TEXT NOT NULL
           );",
        )?;
        Ok(())
      })
      .await?;

    Ok(Self { conn, path })
  }

  /// Default cache directory in the user's cache dir.
  pub fn default_dir() -> PathBuf {
    dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join("prem")
  }

  /// Location of the database file.
  pub fn path(&self) -> &Path { &self.path }

  /// Number of stored records.
  pub async fn len(&self) -> Result<usize> {
    let count = self
      .conn
      .call(|conn| {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count)
      })
      .await?;
    Ok(count as usize)
  }

  /// Whether the cache holds no records.
  pub async fn is_empty(&self) -> Result<bool> { Ok(self.len().await? == 0) }
}

#[async_trait]
impl Cache for DiskCache {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_string();
    let value = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached("SELECT value FROM records WHERE key = ?1")?;
        let value = stmt.query_row(params![key], |row| row.get::<_, String>(0)).optional()?;
        Ok(value)
      })
      .await?;
    Ok(value)
  }

  async fn put(&self, key: &str, value: String) -> Result<()> {
    let key = key.to_string();
    let inserted_at = chrono::Utc::now().to_rfc3339();
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "INSERT OR REPLACE INTO records (key, value, inserted_at) VALUES (?1, ?2, ?3)",
        )?;
        stmt.execute(params![key, value, inserted_at])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// In-process [`Cache`], for tests and for runs that must not touch the disk.
#[derive(Debug, Default)]
pub struct MemoryCache {
  /// Stored records
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
  /// Creates an empty cache.
  pub fn new() -> Self { Self::default() }

  /// Number of stored records.
  pub fn len(&self) -> usize { self.entries.lock().unwrap_or_else(|e| e.into_inner()).len() }

  /// Whether the cache holds no records.
  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[async_trait]
impl Cache for MemoryCache {
  async fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
  }

  async fn put(&self, key: &str, value: String) -> Result<()> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner()).insert(key.to_string(), value);
    Ok(())
  }
}
