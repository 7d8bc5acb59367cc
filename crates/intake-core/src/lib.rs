//! Core types and traits for the task intake assistant

pub mod error;
pub mod message;
pub mod traits;
pub mod types;

pub use error::{IntakeError, Result};
pub use message::{ChatMessage, Role};
pub use traits::catalog::TemplateCatalog;
pub use traits::history::HistoryStore;
pub use traits::llm::{LLMError, LLMProvider};
pub use traits::speech::{AudioClip, Transcriber};
pub use types::{
    FinishReason, HistoryEntry, InputModality, LLMConfig, LLMResponse, SelectedTeam, Team,
    TeamSubtype, TokenUsage,
};
