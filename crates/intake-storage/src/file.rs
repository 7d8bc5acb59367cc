//! JSON-file conversation store, one file per conversation key

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use intake_core::Result;
use intake_state::{ConversationState, ConversationStore};

pub struct FileConversationStore {
    base_path: PathBuf,
}

impl FileConversationStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Keys like `telegram:123` become `telegram_123.json`.
    fn state_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.json", name))
    }
}

#[async_trait]
impl ConversationStore for FileConversationStore {
    async fn get(&self, key: &str) -> Result<Option<ConversationState>> {
        let path = self.state_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(path).await?;
        let state = serde_json::from_str(&json)?;
        Ok(Some(state))
    }

    async fn set(&self, key: &str, state: &ConversationState) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(self.state_path(key), json).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.state_path(key);
        if path.exists() {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::SelectedTeam;
    use intake_state::{Phase, TaskCycle};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(temp_dir.path().join("states"));

        assert!(store.get("telegram:1").await.unwrap().is_none());

        let state = ConversationState::default().enter(Phase::AwaitingSingleAnswer {
            cycle: TaskCycle::new("Кнопка", SelectedTeam::with_subtype("development", "task")),
            questions: vec!["Где?".into()],
            answers: vec![],
        });
        store.set("telegram:1", &state).await.unwrap();
        assert!(temp_dir.path().join("states/telegram_1.json").exists());
        assert_eq!(store.get("telegram:1").await.unwrap(), Some(state));

        store.delete("telegram:1").await.unwrap();
        assert!(store.get("telegram:1").await.unwrap().is_none());
        // deleting twice is fine
        store.delete("telegram:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileConversationStore::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("web_x.json"), "{not json").unwrap();
        assert!(store.get("web:x").await.is_err());
    }
}
