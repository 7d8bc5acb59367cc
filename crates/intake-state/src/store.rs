//! Conversation state persistence

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use intake_core::Result;

use crate::state::ConversationState;

/// Key-value store for per-conversation state.
///
/// Built-in backends: [`InMemoryConversationStore`] here, file and Redis stores in
/// `intake-storage`.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load state. Returns `None` for a conversation never seen (or reset).
    async fn get(&self, key: &str) -> Result<Option<ConversationState>>;
    async fn set(&self, key: &str, state: &ConversationState) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    states: RwLock<HashMap<String, ConversationState>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.read().is_empty()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, key: &str) -> Result<Option<ConversationState>> {
        Ok(self.states.read().get(key).cloned())
    }

    async fn set(&self, key: &str, state: &ConversationState) -> Result<()> {
        self.states.write().insert(key.to_string(), state.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.states.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Phase;

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let store = InMemoryConversationStore::new();
        assert!(store.get("chat:1").await.unwrap().is_none());

        let state = ConversationState::default().enter(Phase::AwaitingTeamChoice {
            source_text: "Сделать отчёт".into(),
        });
        store.set("chat:1", &state).await.unwrap();
        assert_eq!(store.get("chat:1").await.unwrap(), Some(state));
        assert!(store.get("chat:2").await.unwrap().is_none());

        store.delete("chat:1").await.unwrap();
        assert!(store.is_empty());
    }
}
