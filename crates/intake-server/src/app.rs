//! Wiring: config to engine, stores and front-ends

use std::sync::Arc;

use tracing::{info, warn};

use intake_catalog::TeamCatalog;
use intake_core::{IntakeError, Result, TemplateCatalog, Transcriber};
use intake_llm::LLMRegistry;
use intake_ops::TaskOperations;
use intake_state::ConversationEngine;
use intake_storage::{create_conversation_store, create_history_store};

use crate::config::{AppConfig, CatalogConfig, SpeechConfig, TelegramConfig};
use crate::speech::DeepgramTranscriber;
use crate::telegram::{TelegramApi, TelegramBot};

/// Shared by every request handler
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub catalog: Arc<TeamCatalog>,
    pub telegram: Option<Arc<TelegramBot>>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(engine: Arc<ConversationEngine>, catalog: Arc<TeamCatalog>) -> Self {
        Self {
            engine,
            catalog,
            telegram: None,
        }
    }

    pub fn with_telegram(mut self, bot: TelegramBot) -> Self {
        self.telegram = Some(Arc::new(bot));
        self
    }

    /// Build everything from config around an already resolved LLM registry.
    pub fn build(config: &AppConfig, llm_registry: Arc<LLMRegistry>) -> Result<Self> {
        let catalog = load_catalog(&config.catalog)?;
        let transcriber = load_transcriber(&config.speech);
        let engine = Arc::new(build_engine(config, llm_registry, catalog.clone(), transcriber)?);

        let state = Self::new(engine.clone(), catalog);
        match load_telegram(&config.telegram, engine)? {
            Some(bot) => Ok(state.with_telegram(bot)),
            None => Ok(state),
        }
    }
}

pub fn load_catalog(config: &CatalogConfig) -> Result<Arc<TeamCatalog>> {
    let catalog = match &config.path {
        Some(path) => TeamCatalog::from_file(path)?,
        None => TeamCatalog::embedded()?,
    };
    let catalog = match &config.overrides_path {
        Some(path) => catalog.with_overrides_file(path)?,
        None => catalog,
    };
    info!(teams = catalog.teams().len(), "Team catalog loaded");
    Ok(Arc::new(catalog))
}

pub fn build_engine(
    config: &AppConfig,
    llm_registry: Arc<LLMRegistry>,
    catalog: Arc<TeamCatalog>,
    transcriber: Option<Arc<dyn Transcriber>>,
) -> Result<ConversationEngine> {
    let catalog: Arc<dyn TemplateCatalog> = catalog;
    let ops = TaskOperations::new(&config.operations, llm_registry, catalog.clone())?;
    let store = create_conversation_store(&config.storage)?;

    let mut engine =
        ConversationEngine::new(Arc::new(ops), catalog, store, config.conversation.clone());
    if let Some(history) = create_history_store(&config.history) {
        engine = engine.with_history(history);
    }
    if let Some(transcriber) = transcriber {
        engine = engine.with_transcriber(transcriber);
    }
    Ok(engine)
}

/// Speech-to-text is optional: a missing key only disables voice input.
fn load_transcriber(config: &SpeechConfig) -> Option<Arc<dyn Transcriber>> {
    if !config.enabled {
        return None;
    }
    match DeepgramTranscriber::from_env(config.clone()) {
        Ok(transcriber) => {
            info!(model = %config.model, language = %config.language, "Speech-to-text enabled");
            Some(Arc::new(transcriber))
        }
        Err(e) => {
            warn!(error = %e, "Speech-to-text disabled");
            None
        }
    }
}

fn load_telegram(
    config: &TelegramConfig,
    engine: Arc<ConversationEngine>,
) -> Result<Option<TelegramBot>> {
    if !config.enabled {
        return Ok(None);
    }
    let token = std::env::var(&config.token_env).map_err(|_| {
        IntakeError::Config(format!(
            "Telegram is enabled but {} is not set",
            config.token_env
        ))
    })?;

    let mut bot = TelegramBot::new(
        TelegramApi::new(&config.api_base, token),
        engine,
        config.history_items,
    );
    match std::env::var(&config.webhook_secret_env) {
        Ok(secret) if !secret.is_empty() => bot = bot.with_webhook_secret(secret),
        _ => warn!("Telegram webhook secret not set, accepting unauthenticated updates"),
    }
    info!("Telegram bot enabled");
    Ok(Some(bot))
}
