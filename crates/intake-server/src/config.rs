//! Application configuration, loaded from one YAML file

use std::path::Path;

use serde::{Deserialize, Serialize};

use intake_core::{IntakeError, Result};
use intake_llm::OpenRouterConfig;
use intake_ops::OperationsConfig;
use intake_state::ConversationConfig;
use intake_storage::{HistoryConfig, StorageConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub llm: OpenRouterConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub operations: OperationsConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub speech: SpeechConfig,
}

impl AppConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| IntakeError::Config(format!("Invalid config: {}", e)))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Template catalog sources. Without `path` the embedded catalog is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Edited templates are persisted here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Environment variable with the webhook secret; unset disables the check
    #[serde(default = "default_webhook_secret_env")]
    pub webhook_secret_env: String,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Entries shown by /history
    #[serde(default = "default_history_items")]
    pub history_items: usize,
}

fn default_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_webhook_secret_env() -> String {
    "TELEGRAM_WEBHOOK_SECRET".to_string()
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_history_items() -> usize {
    5
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_env: default_token_env(),
            webhook_secret_env: default_webhook_secret_env(),
            api_base: default_telegram_api_base(),
            history_items: default_history_items(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_speech_url")]
    pub base_url: String,

    #[serde(default = "default_speech_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_speech_model")]
    pub model: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_speech_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_speech_url() -> String {
    "https://api.deepgram.com/v1/listen".to_string()
}

fn default_speech_key_env() -> String {
    "DEEPGRAM_API_KEY".to_string()
}

fn default_speech_model() -> String {
    "nova-2".to_string()
}

fn default_language() -> String {
    "ru".to_string()
}

fn default_speech_timeout() -> u64 {
    60
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_speech_url(),
            api_key_env: default_speech_key_env(),
            model: default_speech_model(),
            language: default_language(),
            timeout_secs: default_speech_timeout(),
        }
    }
}
