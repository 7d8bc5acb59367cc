//! What the engine tells a front-end after a turn

use serde::{Deserialize, Serialize};

use intake_core::{SelectedTeam, Team};
use intake_ops::SuggestedAnswer;

use crate::state::PhaseKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketOrigin {
    Generated,
    Regenerated,
    Edited,
    /// Editor reply was unusable; the ticket is unchanged
    EditFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    Reset,
    EditCancelled,
    NothingToEdit,
    NothingToRegenerate,
    UnknownTeam,
    NotExpected,
    EmptyInput,
}

/// One message for the user. Front-ends decide how to render each variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Transcribed {
        text: String,
    },
    TeamDetected {
        team: SelectedTeam,
        label: String,
    },
    ChooseTeam {
        teams: Vec<Team>,
    },
    /// Single mode: one question at a time, `index` is zero-based
    Question {
        index: usize,
        total: usize,
        question: String,
    },
    /// Batch mode: every question with its suggestion
    Questions {
        suggestions: Vec<SuggestedAnswer>,
    },
    ConfirmAnswers {
        questions: Vec<String>,
        answers: Vec<String>,
    },
    Ticket {
        body: String,
        team: SelectedTeam,
        label: String,
        origin: TicketOrigin,
    },
    EditRequested,
    Notice {
        notice: Notice,
    },
}

impl Reply {
    pub fn notice(notice: Notice) -> Self {
        Self::Notice { notice }
    }
}

/// Result of one handled input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub phase: PhaseKind,
    pub replies: Vec<Reply>,
}

impl TurnOutcome {
    pub fn ticket(&self) -> Option<&str> {
        self.replies.iter().rev().find_map(|r| match r {
            Reply::Ticket { body, .. } => Some(body.as_str()),
            _ => None,
        })
    }
}
