//! Ticket history persistence

use async_trait::async_trait;

use crate::error::Result;
use crate::types::HistoryEntry;

/// Bounded, newest-first log of generated tickets.
///
/// Built-in backends: `InMemoryHistory` and `FileHistory`.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record an entry at the front; the oldest entries beyond the cap are dropped.
    async fn append(&self, entry: HistoryEntry) -> Result<()>;
    /// Entries, newest first.
    async fn list(&self) -> Result<Vec<HistoryEntry>>;
    /// Remove a single entry. Returns `false` when no entry had that id.
    async fn remove(&self, id: &str) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
}
