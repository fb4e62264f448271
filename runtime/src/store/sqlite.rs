//! SQLite-backed result store.
//!
//! One connection behind a mutex serializes writers. Blocking SQLite calls
//! run on the blocking pool so async callers are never stalled.

use super::ResultStore;
use crate::error::PersistenceError;
use crate::model::{Candidate, SearchResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS search_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        keyword TEXT NOT NULL CHECK (length(keyword) > 0),
        url TEXT NOT NULL CHECK (length(url) > 0),
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_search_results_created_at
        ON search_results (created_at);
";

/// Result store on a single SQLite database.
#[derive(Clone)]
pub struct SqliteResultStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteResultStore {
    /// Open or create a store at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Connection::open(path)?;
        Self::with_connection(db)
    }

    /// Store on a private in-memory database.
    pub fn in_memory() -> Result<Self, PersistenceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self, PersistenceError> {
        db.execute_batch(SCHEMA)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    /// Total number of stored rows.
    pub async fn count(&self) -> Result<u64, PersistenceError> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<u64, PersistenceError> {
            let db = db.lock().map_err(|_| PersistenceError::Poisoned)?;
            let n: i64 = db.query_row("SELECT COUNT(*) FROM search_results", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await?
    }
}

/// Fixed-width UTC encoding so lexical order matches chronological order.
fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(value: String) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| PersistenceError::Timestamp { value, source })
}

fn insert_batch(
    db: &mut Connection,
    candidates: Vec<Candidate>,
) -> Result<Vec<SearchResult>, PersistenceError> {
    let now = Utc::now();
    let tx = db.transaction()?;
    let mut saved = Vec::with_capacity(candidates.len());
    {
        let mut stmt = tx.prepare(
            "INSERT INTO search_results (keyword, url, created_at) VALUES (?1, ?2, ?3)",
        )?;
        for candidate in candidates {
            let created_at = candidate.created_at.unwrap_or(now).trunc_subsecs(6);
            stmt.execute(rusqlite::params![
                candidate.keyword,
                candidate.url,
                encode_timestamp(&created_at)
            ])?;
            saved.push(SearchResult {
                id: tx.last_insert_rowid(),
                keyword: candidate.keyword,
                url: candidate.url,
                created_at,
            });
        }
    }
    // Dropping an uncommitted transaction rolls it back, so an early `?`
    // above leaves nothing behind.
    tx.commit()?;
    Ok(saved)
}

fn select_recent(db: &Connection, limit: Option<usize>) -> Result<Vec<SearchResult>, PersistenceError> {
    let limit = limit.map(|n| n as i64).unwrap_or(-1);
    let mut stmt = db.prepare(
        "SELECT id, keyword, url, created_at FROM search_results
         ORDER BY created_at DESC, id DESC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, keyword, url, created_at)| {
            Ok(SearchResult {
                id,
                keyword,
                url,
                created_at: decode_timestamp(created_at)?,
            })
        })
        .collect()
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn save(&self, candidates: Vec<Candidate>) -> Result<Vec<SearchResult>, PersistenceError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let db = Arc::clone(&self.db);
        let saved = tokio::task::spawn_blocking(move || -> Result<_, PersistenceError> {
            let mut db = db.lock().map_err(|_| PersistenceError::Poisoned)?;
            insert_batch(&mut db, candidates)
        })
        .await??;
        debug!(rows = saved.len(), "saved result batch");
        Ok(saved)
    }

    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<SearchResult>, PersistenceError> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || -> Result<_, PersistenceError> {
            let db = db.lock().map_err(|_| PersistenceError::Poisoned)?;
            select_recent(&db, limit)
        })
        .await?
    }
}
