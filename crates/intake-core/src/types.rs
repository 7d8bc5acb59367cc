//! Shared value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-call overrides for an LLM request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LLMConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Other,
}

impl FinishReason {
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" => Self::Stop,
            "length" | "max_tokens" => Self::Length,
            "content_filter" => Self::ContentFilter,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl LLMResponse {
    pub fn new(content: impl Into<String>, finish_reason: FinishReason) -> Self {
        Self {
            content: content.into(),
            finish_reason,
            usage: None,
            model: None,
        }
    }
}

/// Team (and optional subtype) a ticket is routed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTeam {
    pub team_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype_id: Option<String>,
}

impl SelectedTeam {
    pub fn new(team_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            subtype_id: None,
        }
    }

    pub fn with_subtype(team_id: impl Into<String>, subtype_id: impl Into<String>) -> Self {
        Self {
            team_id: team_id.into(),
            subtype_id: Some(subtype_id.into()),
        }
    }
}

impl std::fmt::Display for SelectedTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subtype_id {
            Some(subtype) => write!(f, "{}/{}", self.team_id, subtype),
            None => write!(f, "{}", self.team_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSubtype {
    pub id: String,
    pub name: String,
    pub template: String,
}

/// Catalog entry. A team carries either a direct template or a non-empty subtype list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtypes: Vec<TeamSubtype>,
}

impl Team {
    pub fn has_subtypes(&self) -> bool {
        !self.subtypes.is_empty()
    }

    pub fn subtype(&self, subtype_id: &str) -> Option<&TeamSubtype> {
        self.subtypes.iter().find(|s| s.id == subtype_id)
    }

    pub fn default_subtype(&self) -> Option<&TeamSubtype> {
        self.subtypes.first()
    }

    pub fn is_valid(&self) -> bool {
        self.template.is_some() || self.has_subtypes()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputModality {
    #[default]
    Text,
    Voice,
}

/// A generated ticket as recorded in the history store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub text: String,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(text: impl Into<String>, team: impl Into<String>, subtype: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            team: team.into(),
            subtype,
            created_at: Utc::now(),
        }
    }
}
