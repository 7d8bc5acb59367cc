//! Storage backends for the task intake assistant

mod file;
mod history;

#[cfg(feature = "redis-storage")]
mod redis;

pub use file::FileConversationStore;
pub use history::{DEFAULT_MAX_ITEMS, FileHistory, InMemoryHistory};
pub use intake_core::{HistoryStore, IntakeError, Result};
pub use intake_state::{ConversationStore, InMemoryConversationStore};

#[cfg(feature = "redis-storage")]
pub use redis::RedisConversationStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where conversation state lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StorageConfig {
    #[default]
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "file")]
    File { path: String },
    #[serde(rename = "redis")]
    Redis {
        url: String,
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        ttl_seconds: Option<u64>,
    },
}

/// Where the ticket history lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HistoryConfig {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "memory")]
    Memory {
        #[serde(default = "default_max_items")]
        max_items: usize,
    },
    #[serde(rename = "file")]
    File {
        path: String,
        #[serde(default = "default_max_items")]
        max_items: usize,
    },
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig::Memory {
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

pub fn create_conversation_store(config: &StorageConfig) -> Result<Arc<dyn ConversationStore>> {
    match config {
        StorageConfig::Memory => Ok(Arc::new(InMemoryConversationStore::new())),
        StorageConfig::File { path } => Ok(Arc::new(FileConversationStore::new(path))),

        #[cfg(feature = "redis-storage")]
        StorageConfig::Redis {
            url,
            prefix,
            ttl_seconds,
        } => {
            let mut store = RedisConversationStore::new(url)?;
            if let Some(p) = prefix {
                store = store.with_prefix(p);
            }
            if let Some(ttl) = ttl_seconds {
                store = store.with_ttl(*ttl);
            }
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "redis-storage"))]
        StorageConfig::Redis { .. } => Err(IntakeError::Config(
            "Redis storage requires 'redis-storage' feature".into(),
        )),
    }
}

pub fn create_history_store(config: &HistoryConfig) -> Option<Arc<dyn HistoryStore>> {
    match config {
        HistoryConfig::None => None,
        HistoryConfig::Memory { max_items } => Some(Arc::new(InMemoryHistory::new(*max_items))),
        HistoryConfig::File { path, max_items } => {
            Some(Arc::new(FileHistory::new(path, *max_items)))
        }
    }
}
