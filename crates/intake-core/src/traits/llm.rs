//! LLM provider trait

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::message::ChatMessage;
use crate::types::{LLMConfig, LLMResponse};

/// Chat-completion provider
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, LLMError>;

    fn provider_name(&self) -> &str;
}

/// LLM error types
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {message}")]
    API {
        message: String,
        status: Option<u16>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limit exceeded: {retry_after:?}")]
    RateLimit { retry_after: Option<Duration> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider returned no content")]
    EmptyResponse,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl LLMError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } | Self::EmptyResponse => {
                true
            }
            Self::API { status, .. } => status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        LLMError::Serialization(err.to_string())
    }
}
