//! Front-ends for the task intake assistant: JSON API, Telegram webhook and
//! Deepgram speech-to-text, all driving one shared [`ConversationEngine`].
//!
//! [`ConversationEngine`]: intake_state::ConversationEngine

pub mod app;
pub mod config;
pub mod speech;
pub mod telegram;
pub mod web;

pub use app::{AppState, SharedState};
pub use config::AppConfig;
pub use speech::DeepgramTranscriber;
pub use web::router;
