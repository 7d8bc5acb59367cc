//! Error types shared by every intake crate

use thiserror::Error;

use crate::traits::llm::LLMError;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(#[from] LLMError),

    #[error("Malformed {operation} response: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },

    #[error("No template for team '{team_id}'{}", subtype_suffix(.subtype_id))]
    TemplateNotFound {
        team_id: String,
        subtype_id: Option<String>,
    },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Transcription produced no text")]
    EmptyTranscript,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntakeError {
    pub fn malformed(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation,
            reason: reason.into(),
        }
    }

    /// Failures worth retrying from the user's side: the request itself was fine.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Llm(err) => err.is_transient(),
            Self::Transcription(_) | Self::Persistence(_) | Self::Io(_) => true,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Llm(LLMError::Timeout(_)))
    }
}

fn subtype_suffix(subtype_id: &Option<String>) -> String {
    subtype_id
        .as_deref()
        .map(|s| format!(" / '{}'", s))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, IntakeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_template_not_found_message() {
        let err = IntakeError::TemplateNotFound {
            team_id: "analytics".into(),
            subtype_id: Some("export".into()),
        };
        assert_eq!(
            err.to_string(),
            "No template for team 'analytics' / 'export'"
        );

        let err = IntakeError::TemplateNotFound {
            team_id: "design".into(),
            subtype_id: None,
        };
        assert_eq!(err.to_string(), "No template for team 'design'");
    }

    #[test]
    fn test_transient_classification() {
        assert!(IntakeError::from(LLMError::Timeout(Duration::from_secs(30))).is_transient());
        assert!(IntakeError::from(LLMError::Network("refused".into())).is_transient());
        assert!(!IntakeError::from(LLMError::Config("no key".into())).is_transient());
        assert!(!IntakeError::malformed("classify", "no json").is_transient());
        assert!(IntakeError::from(LLMError::Timeout(Duration::from_secs(1))).is_timeout());
    }
}
