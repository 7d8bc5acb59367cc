//! Ticket history backends

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::debug;

use intake_core::{HistoryEntry, HistoryStore, Result};

pub const DEFAULT_MAX_ITEMS: usize = 30;

fn push_front(entries: &mut Vec<HistoryEntry>, entry: HistoryEntry, max_items: usize) {
    entries.insert(0, entry);
    entries.truncate(max_items);
}

pub struct InMemoryHistory {
    entries: RwLock<Vec<HistoryEntry>>,
    max_items: usize,
}

impl InMemoryHistory {
    pub fn new(max_items: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            max_items,
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        push_front(&mut self.entries.write(), entry, self.max_items);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries.read().clone())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        Ok(entries.len() != before)
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}

/// History kept as a JSON array in a single file.
///
/// Writes are read-modify-write under an async lock.
pub struct FileHistory {
    path: PathBuf,
    max_items: usize,
    lock: Mutex<()>,
}

impl FileHistory {
    pub fn new(path: impl AsRef<Path>, max_items: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_items,
            lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = tokio::fs::read_to_string(&self.path).await?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    async fn write(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FileHistory {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        debug!(id = %entry.id, "Appending history entry");
        push_front(&mut entries, entry, self.max_items);
        self.write(&entries).await
    }

    async fn list(&self) -> Result<Vec<HistoryEntry>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        entries.truncate(self.max_items);
        Ok(entries)
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries).await?;
        Ok(true)
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        if self.path.exists() {
            tokio::fs::remove_file(&self.path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry::new(format!("## Задача {}", n), "Разработка", Some("Задача".into()))
    }

    #[tokio::test]
    async fn test_in_memory_newest_first_and_capped() {
        let history = InMemoryHistory::new(3);
        for n in 0..5 {
            history.append(entry(n)).await.unwrap();
        }
        let entries = history.list().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].text, "## Задача 4");
        assert_eq!(entries[2].text, "## Задача 2");
    }

    #[tokio::test]
    async fn test_in_memory_remove_and_clear() {
        let history = InMemoryHistory::default();
        history.append(entry(1)).await.unwrap();
        history.append(entry(2)).await.unwrap();
        let id = history.list().await.unwrap()[1].id.clone();

        assert!(history.remove(&id).await.unwrap());
        assert!(!history.remove(&id).await.unwrap());
        assert_eq!(history.list().await.unwrap().len(), 1);

        history.clear().await.unwrap();
        assert!(history.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_history_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data/history.json");

        let history = FileHistory::new(&path, DEFAULT_MAX_ITEMS);
        assert!(history.list().await.unwrap().is_empty());
        for n in 0..(DEFAULT_MAX_ITEMS + 2) {
            history.append(entry(n)).await.unwrap();
        }

        let reopened = FileHistory::new(&path, DEFAULT_MAX_ITEMS);
        let entries = reopened.list().await.unwrap();
        assert_eq!(entries.len(), DEFAULT_MAX_ITEMS);
        assert_eq!(entries[0].text, format!("## Задача {}", DEFAULT_MAX_ITEMS + 1));
        assert_eq!(entries[0].subtype.as_deref(), Some("Задача"));

        let id = entries[0].id.clone();
        assert!(reopened.remove(&id).await.unwrap());
        assert_eq!(history.list().await.unwrap().len(), DEFAULT_MAX_ITEMS - 1);

        reopened.clear().await.unwrap();
        assert!(!path.exists());
        assert!(history.list().await.unwrap().is_empty());
    }
}
