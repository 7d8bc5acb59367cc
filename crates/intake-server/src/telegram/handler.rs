//! Update dispatch: commands, text, voice and button presses

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use intake_core::AudioClip;
use intake_state::{ConversationEngine, Input};

use super::api::TelegramApi;
use super::render::{self, Callback};
use super::types::{CallbackQuery, Message, Outgoing, Update};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Teams,
    History,
}

fn parse_command(text: &str) -> Option<Command> {
    let word = text.trim().split_whitespace().next()?;
    let name = word.strip_prefix('/')?;
    // "/help@my_bot" in group chats
    let name = name.split('@').next().unwrap_or(name);
    match name {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "teams" => Some(Command::Teams),
        "history" => Some(Command::History),
        _ => None,
    }
}

pub fn session_key(chat_id: i64) -> String {
    format!("telegram:{}", chat_id)
}

pub struct TelegramBot {
    api: TelegramApi,
    engine: Arc<ConversationEngine>,
    webhook_secret: Option<String>,
    history_items: usize,
}

impl TelegramBot {
    pub fn new(api: TelegramApi, engine: Arc<ConversationEngine>, history_items: usize) -> Self {
        Self {
            api,
            engine,
            webhook_secret: None,
            history_items,
        }
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// `true` when no secret is configured or the header matches it.
    pub fn verify_secret(&self, header: Option<&str>) -> bool {
        match &self.webhook_secret {
            Some(secret) => header == Some(secret.as_str()),
            None => true,
        }
    }

    pub async fn handle_update(&self, update: Update) {
        debug!(update_id = update.update_id, "Telegram update");
        if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        } else if let Some(message) = update.message {
            self.handle_message(message).await;
        }
    }

    async fn handle_message(&self, message: Message) {
        let chat_id = message.chat.id;

        if let Some(voice) = message.voice {
            if !self.engine.can_transcribe() {
                self.send(chat_id, Outgoing::text(render::VOICE_UNAVAILABLE)).await;
                return;
            }
            let bytes = match self.api.download_file(&voice.file_id).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(chat_id, error = %e, "Voice download failed");
                    self.send(
                        chat_id,
                        Outgoing::text("❌ Не удалось получить голосовое сообщение. Попробуйте ещё раз."),
                    )
                    .await;
                    return;
                }
            };
            let clip = AudioClip {
                bytes,
                mime_type: voice.mime_type.unwrap_or_else(|| "audio/ogg".to_string()),
            };
            self.run(chat_id, Input::Voice(clip)).await;
            return;
        }

        let Some(text) = message.text else {
            return;
        };

        match parse_command(&text) {
            Some(command) => self.handle_command(chat_id, command).await,
            None => self.run(chat_id, Input::Text(text)).await,
        }
    }

    async fn handle_command(&self, chat_id: i64, command: Command) {
        info!(chat_id, command = ?command, "Telegram command");
        let text = match command {
            Command::Start => {
                if let Err(e) = self.engine.reset(&session_key(chat_id)).await {
                    warn!(chat_id, error = %e, "Failed to reset conversation");
                }
                render::start_text().to_string()
            }
            Command::Help => render::help_text().to_string(),
            Command::Teams => render::teams_text(&self.engine.catalog().teams()),
            Command::History => match self.engine.history() {
                Some(history) => match history.list().await {
                    Ok(entries) => render::history_text(&entries, self.history_items),
                    Err(e) => {
                        warn!(chat_id, error = %e, "Failed to read history");
                        render::error_text(&e)
                    }
                },
                None => "История задач отключена.".to_string(),
            },
        };
        for chunk in render::into_chunks(Outgoing::text(text)) {
            self.send(chat_id, chunk).await;
        }
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        let data = query.data.as_deref().unwrap_or_default();
        let parsed = render::parse_callback(data);

        let toast = matches!(parsed, Some(Callback::Copy)).then_some(render::COPY_TOAST);
        if let Err(e) = self.api.answer_callback_query(&query.id, toast).await {
            warn!(error = %e, "Failed to answer callback query");
        }

        let Some(chat_id) = query.message.as_ref().map(|m| m.chat.id) else {
            return;
        };
        match parsed {
            Some(Callback::Action(action)) => self.run(chat_id, Input::Action(action)).await,
            Some(Callback::Copy) => {}
            None => warn!(chat_id, data, "Unknown callback data"),
        }
    }

    async fn run(&self, chat_id: i64, input: Input) {
        let key = session_key(chat_id);
        let messages = match self.engine.handle(&key, input).await {
            Ok(outcome) => render::render_outcome(&outcome),
            Err(e) => vec![Outgoing::text(render::error_text(&e))],
        };
        for message in messages {
            self.send(chat_id, message).await;
        }
    }

    async fn send(&self, chat_id: i64, message: Outgoing) {
        if let Err(e) = self.api.send_message(chat_id, &message).await {
            error!(chat_id, error = %e, "Failed to send Telegram message");
        }
    }
}
