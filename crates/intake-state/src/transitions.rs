//! Transition table: (phase, event) -> step

use crate::event::{Event, UserAction};
use crate::state::PhaseKind;

/// What the engine does for an event in a given phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Treat the text as a new task description (classify, then check)
    StartTask,
    /// Resolve a team from text or a selection action
    ChooseTeam,
    AnswerQuestion,
    SkipQuestion,
    SkipAllQuestions,
    ReconcileBatch,
    /// Accept phrase confirms, anything else revises the answers
    ConfirmOrRevise,
    ConfirmAnswers,
    BeginEdit,
    ApplyEdit,
    CancelEdit,
    Regenerate,
    /// Full reset: the stored conversation is dropped
    Reset,
    /// Not valid here; state is left unchanged
    Reject,
}

pub fn route(phase: PhaseKind, event: &Event) -> Step {
    use PhaseKind::*;

    let action = match event {
        Event::Submit { .. } => return Step::StartTask,
        Event::Action(UserAction::NewTask) => return Step::Reset,
        Event::Message { .. } => {
            return match phase {
                Idle => Step::StartTask,
                AwaitingTeamChoice => Step::ChooseTeam,
                AwaitingSingleAnswer => Step::AnswerQuestion,
                AwaitingBatchAnswers => Step::ReconcileBatch,
                AwaitingAnswerConfirmation => Step::ConfirmOrRevise,
                AwaitingEditInstruction => Step::ApplyEdit,
            };
        }
        Event::Action(action) => action,
    };

    match (phase, action) {
        (AwaitingTeamChoice, UserAction::SelectTeam { .. }) => Step::ChooseTeam,

        (AwaitingSingleAnswer, UserAction::SkipQuestion) => Step::SkipQuestion,
        (
            AwaitingSingleAnswer | AwaitingBatchAnswers | AwaitingAnswerConfirmation,
            UserAction::SkipAllQuestions,
        ) => Step::SkipAllQuestions,
        (AwaitingAnswerConfirmation, UserAction::ConfirmAnswers) => Step::ConfirmAnswers,

        (Idle, UserAction::Edit) => Step::BeginEdit,
        (Idle, UserAction::Regenerate) => Step::Regenerate,
        (AwaitingEditInstruction, UserAction::CancelEdit) => Step::CancelEdit,

        _ => Step::Reject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_core::InputModality;

    const ALL: [PhaseKind; 6] = [
        PhaseKind::Idle,
        PhaseKind::AwaitingTeamChoice,
        PhaseKind::AwaitingSingleAnswer,
        PhaseKind::AwaitingBatchAnswers,
        PhaseKind::AwaitingAnswerConfirmation,
        PhaseKind::AwaitingEditInstruction,
    ];

    #[test]
    fn test_messages_follow_phase() {
        let msg = Event::text("что-то");
        assert_eq!(route(PhaseKind::Idle, &msg), Step::StartTask);
        assert_eq!(route(PhaseKind::AwaitingTeamChoice, &msg), Step::ChooseTeam);
        assert_eq!(route(PhaseKind::AwaitingSingleAnswer, &msg), Step::AnswerQuestion);
        assert_eq!(route(PhaseKind::AwaitingBatchAnswers, &msg), Step::ReconcileBatch);
        assert_eq!(
            route(PhaseKind::AwaitingAnswerConfirmation, &msg),
            Step::ConfirmOrRevise
        );
        assert_eq!(route(PhaseKind::AwaitingEditInstruction, &Event::voice("x")), Step::ApplyEdit);
    }

    #[test]
    fn test_new_task_and_submit_from_any_phase() {
        let submit = Event::Submit {
            text: "x".into(),
            modality: InputModality::Text,
            team: None,
        };
        for phase in ALL {
            assert_eq!(route(phase, &Event::Action(UserAction::NewTask)), Step::Reset);
            assert_eq!(route(phase, &submit), Step::StartTask);
        }
    }

    #[test]
    fn test_actions_outside_their_phase_are_rejected() {
        let edit = Event::Action(UserAction::Edit);
        assert_eq!(route(PhaseKind::Idle, &edit), Step::BeginEdit);
        assert_eq!(route(PhaseKind::AwaitingSingleAnswer, &edit), Step::Reject);

        let skip = Event::Action(UserAction::SkipQuestion);
        assert_eq!(route(PhaseKind::AwaitingSingleAnswer, &skip), Step::SkipQuestion);
        assert_eq!(route(PhaseKind::AwaitingBatchAnswers, &skip), Step::Reject);
        assert_eq!(route(PhaseKind::Idle, &skip), Step::Reject);

        let select = Event::Action(UserAction::SelectTeam {
            team_id: "design".into(),
            subtype_id: None,
        });
        assert_eq!(route(PhaseKind::AwaitingTeamChoice, &select), Step::ChooseTeam);
        assert_eq!(route(PhaseKind::Idle, &select), Step::Reject);

        let cancel = Event::Action(UserAction::CancelEdit);
        assert_eq!(route(PhaseKind::AwaitingEditInstruction, &cancel), Step::CancelEdit);
        assert_eq!(route(PhaseKind::Idle, &cancel), Step::Reject);

        let confirm = Event::Action(UserAction::ConfirmAnswers);
        assert_eq!(
            route(PhaseKind::AwaitingAnswerConfirmation, &confirm),
            Step::ConfirmAnswers
        );
        assert_eq!(route(PhaseKind::AwaitingBatchAnswers, &confirm), Step::Reject);
    }
}
