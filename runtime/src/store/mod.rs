//! Append-only persistence for search results.

pub mod sqlite;

use crate::error::PersistenceError;
use crate::model::{Candidate, SearchResult};
use async_trait::async_trait;

pub use sqlite::SqliteResultStore;

/// Storage for harvested results.
///
/// Implementations must be safe under concurrent writers and must write a
/// batch all-or-nothing.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persist a batch, assigning `created_at` where the candidate has none.
    ///
    /// An empty batch is a no-op returning an empty vector.
    async fn save(&self, candidates: Vec<Candidate>) -> Result<Vec<SearchResult>, PersistenceError>;

    /// Records newest first. `None` returns everything.
    async fn list_recent(&self, limit: Option<usize>) -> Result<Vec<SearchResult>, PersistenceError>;
}
