//! Redis conversation store

use async_trait::async_trait;

use intake_core::{IntakeError, Result};
use intake_state::{ConversationState, ConversationStore};

pub struct RedisConversationStore {
    client: redis::Client,
    prefix: String,
    default_ttl: Option<u64>,
}

fn map_redis_err(e: redis::RedisError) -> IntakeError {
    IntakeError::Persistence(e.to_string())
}

impl RedisConversationStore {
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_err)?;
        Ok(Self {
            client,
            prefix: "intake:".to_string(),
            default_ttl: None,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Expire idle conversations after `ttl_seconds`; every save refreshes the TTL.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.default_ttl = Some(ttl_seconds);
        self
    }

    fn state_key(&self, key: &str) -> String {
        format!("{}conversation:{}", self.prefix, key)
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_err)
    }
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn get(&self, key: &str) -> Result<Option<ConversationState>> {
        let mut conn = self.get_connection().await?;
        let data: Option<String> = redis::cmd("GET")
            .arg(self.state_key(key))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_err)?;

        match data {
            Some(ref json) => {
                let state = serde_json::from_str(json)
                    .map_err(|e| IntakeError::Persistence(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, state: &ConversationState) -> Result<()> {
        let mut conn = self.get_connection().await?;
        let data =
            serde_json::to_string(state).map_err(|e| IntakeError::Persistence(e.to_string()))?;

        let state_key = self.state_key(key);
        let mut cmd = match self.default_ttl {
            Some(ttl) => {
                let mut cmd = redis::cmd("SETEX");
                cmd.arg(&state_key).arg(ttl);
                cmd
            }
            None => {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&state_key);
                cmd
            }
        };
        cmd.arg(&data)
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;
        redis::cmd("DEL")
            .arg(self.state_key(key))
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let store = RedisConversationStore::new("redis://127.0.0.1/")
            .unwrap()
            .with_prefix("bot:")
            .with_ttl(3600);
        assert_eq!(store.state_key("telegram:7"), "bot:conversation:telegram:7");
        assert_eq!(store.default_ttl, Some(3600));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_roundtrip_against_server() {
        let store = RedisConversationStore::new("redis://127.0.0.1/")
            .unwrap()
            .with_prefix("intake-test:");
        let state = ConversationState::default();
        store.set("k", &state).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(state));
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
