//! Conversation behaviour settings

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Recorded for questions the user skipped or left unanswered
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// These replies skip the question. In batch mode they apply only when
    /// the reply is not also an accept phrase.
    #[serde(default = "default_skip_phrases")]
    pub skip_phrases: Vec<String>,

    /// Batch mode: these replies (whole or per segment) keep the suggested answer
    #[serde(default = "default_accept_phrases")]
    pub accept_phrases: Vec<String>,

    /// Show reconciled batch answers for confirmation before generating
    #[serde(default)]
    pub confirm_batch_answers: bool,

    /// Append generated tickets to the history store
    #[serde(default = "default_true")]
    pub record_history: bool,
}

fn default_placeholder() -> String {
    "[не указано]".to_string()
}

fn default_skip_phrases() -> Vec<String> {
    to_strings(&[
        "не знаю",
        "незнаю",
        "-",
        "пропустить",
        "skip",
        "пропуск",
        "нет",
        "нет ответа",
    ])
}

fn default_accept_phrases() -> Vec<String> {
    to_strings(&[
        "ok",
        "ок",
        "окей",
        "да",
        "+",
        "accept",
        "согласен",
        "подходит",
        "верно",
        "не знаю",
        "незнаю",
        "-",
        "пропустить",
        "skip",
        "хз",
        "без понятия",
    ])
}

fn default_true() -> bool {
    true
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            skip_phrases: default_skip_phrases(),
            accept_phrases: default_accept_phrases(),
            confirm_batch_answers: false,
            record_history: true,
        }
    }
}
