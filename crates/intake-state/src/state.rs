//! Per-conversation state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use intake_core::{InputModality, SelectedTeam};
use intake_ops::SuggestedAnswer;

/// Description and team fixed for one task cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCycle {
    pub source_text: String,
    pub team: SelectedTeam,
}

impl TaskCycle {
    pub fn new(source_text: impl Into<String>, team: SelectedTeam) -> Self {
        Self {
            source_text: source_text.into(),
            team,
        }
    }
}

/// Most recent ticket, kept for editing and regeneration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedTicket {
    pub body: String,
    pub team: SelectedTeam,
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Where the conversation is, with the data that phase needs.
///
/// `questions`, `answers` and `suggestions` are index-aligned. In
/// `AwaitingSingleAnswer` the current question index is `answers.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingTeamChoice {
        source_text: String,
    },
    AwaitingSingleAnswer {
        cycle: TaskCycle,
        questions: Vec<String>,
        answers: Vec<String>,
    },
    AwaitingBatchAnswers {
        cycle: TaskCycle,
        questions: Vec<String>,
        suggestions: Vec<SuggestedAnswer>,
    },
    AwaitingAnswerConfirmation {
        cycle: TaskCycle,
        questions: Vec<String>,
        suggestions: Vec<SuggestedAnswer>,
        answers: Vec<String>,
    },
    AwaitingEditInstruction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Idle,
    AwaitingTeamChoice,
    AwaitingSingleAnswer,
    AwaitingBatchAnswers,
    AwaitingAnswerConfirmation,
    AwaitingEditInstruction,
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingTeamChoice => "awaiting_team_choice",
            Self::AwaitingSingleAnswer => "awaiting_single_answer",
            Self::AwaitingBatchAnswers => "awaiting_batch_answers",
            Self::AwaitingAnswerConfirmation => "awaiting_answer_confirmation",
            Self::AwaitingEditInstruction => "awaiting_edit_instruction",
        };
        f.write_str(name)
    }
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::Idle => PhaseKind::Idle,
            Self::AwaitingTeamChoice { .. } => PhaseKind::AwaitingTeamChoice,
            Self::AwaitingSingleAnswer { .. } => PhaseKind::AwaitingSingleAnswer,
            Self::AwaitingBatchAnswers { .. } => PhaseKind::AwaitingBatchAnswers,
            Self::AwaitingAnswerConfirmation { .. } => PhaseKind::AwaitingAnswerConfirmation,
            Self::AwaitingEditInstruction => PhaseKind::AwaitingEditInstruction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub phase: Phase,
    #[serde(default)]
    pub modality: InputModality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ticket: Option<GeneratedTicket>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            modality: InputModality::Text,
            last_ticket: None,
            updated_at: Utc::now(),
        }
    }
}

impl ConversationState {
    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// Move to `phase`, stamping the update time.
    pub fn enter(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self.updated_at = Utc::now();
        self
    }

    /// Finish a cycle with a fresh ticket.
    pub fn complete(self, ticket: GeneratedTicket) -> Self {
        let mut state = self.enter(Phase::Idle);
        state.last_ticket = Some(ticket);
        state
    }

    /// Awaiting an edit requires a ticket to edit.
    pub fn is_consistent(&self) -> bool {
        !matches!(self.phase, Phase::AwaitingEditInstruction) || self.last_ticket.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle() -> TaskCycle {
        TaskCycle::new("Кнопка", SelectedTeam::with_subtype("development", "task"))
    }

    #[test]
    fn test_phase_serialization_is_tagged() {
        let state = ConversationState::default().enter(Phase::AwaitingSingleAnswer {
            cycle: cycle(),
            questions: vec!["Где?".into(), "Когда?".into()],
            answers: vec!["Каталог".into()],
        });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["phase"]["phase"], "awaiting_single_answer");
        assert_eq!(json["phase"]["cycle"]["team"]["teamId"], "development");

        let back: ConversationState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_complete_retains_ticket_and_returns_to_idle() {
        let state = ConversationState::default().enter(Phase::AwaitingBatchAnswers {
            cycle: cycle(),
            questions: vec![],
            suggestions: vec![],
        });
        let ticket = GeneratedTicket {
            body: "## Описание".into(),
            team: cycle().team,
            source_text: "Кнопка".into(),
            additional_info: None,
            created_at: Utc::now(),
        };
        let state = state.complete(ticket.clone());
        assert_eq!(state.kind(), PhaseKind::Idle);
        assert_eq!(state.last_ticket, Some(ticket));
    }

    #[test]
    fn test_edit_phase_requires_ticket() {
        let state = ConversationState::default().enter(Phase::AwaitingEditInstruction);
        assert!(!state.is_consistent());
        assert!(ConversationState::default().is_consistent());
    }

    #[test]
    fn test_phase_kind_display() {
        assert_eq!(PhaseKind::AwaitingBatchAnswers.to_string(), "awaiting_batch_answers");
    }
}
