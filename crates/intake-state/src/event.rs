//! Inputs accepted by the conversation engine

use serde::{Deserialize, Serialize};

use intake_core::{AudioClip, InputModality, SelectedTeam};

/// Named actions from buttons or API calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserAction {
    NewTask,
    SelectTeam {
        #[serde(rename = "teamId")]
        team_id: String,
        #[serde(default, rename = "subtypeId", skip_serializing_if = "Option::is_none")]
        subtype_id: Option<String>,
    },
    SkipQuestion,
    SkipAllQuestions,
    ConfirmAnswers,
    Edit,
    CancelEdit,
    Regenerate,
}

/// One turn of user input as delivered by a front-end
#[derive(Debug, Clone)]
pub enum Input {
    /// Typed text
    Text(String),
    /// Voice already converted to text
    Transcript(String),
    /// Raw voice, transcribed by the engine
    Voice(AudioClip),
    Action(UserAction),
    /// Single-shot start of a new task, optionally with the team already chosen
    Submit {
        text: String,
        modality: InputModality,
        team: Option<SelectedTeam>,
    },
}

/// Input after transcription: what the transition table routes on
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Message {
        text: String,
        modality: InputModality,
    },
    Submit {
        text: String,
        modality: InputModality,
        team: Option<SelectedTeam>,
    },
    Action(UserAction),
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Message {
            text: text.into(),
            modality: InputModality::Text,
        }
    }

    pub fn voice(text: impl Into<String>) -> Self {
        Self::Message {
            text: text.into(),
            modality: InputModality::Voice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        let action: UserAction =
            serde_json::from_str(r#"{"type": "select_team", "teamId": "analytics"}"#).unwrap();
        assert_eq!(
            action,
            UserAction::SelectTeam {
                team_id: "analytics".into(),
                subtype_id: None
            }
        );

        let action: UserAction = serde_json::from_str(r#"{"type": "skip_all_questions"}"#).unwrap();
        assert_eq!(action, UserAction::SkipAllQuestions);
    }
}
