//! Conversation engine: load state, route the event, run the step, save

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use intake_core::{
    AudioClip, HistoryEntry, HistoryStore, InputModality, IntakeError, Result, SelectedTeam,
    TemplateCatalog, Transcriber,
};
use intake_ops::{TaskOperations, format_additional_info};

use crate::config::ConversationConfig;
use crate::event::{Event, Input, UserAction};
use crate::reconciler::AnswerReconciler;
use crate::reply::{Notice, Reply, TicketOrigin, TurnOutcome};
use crate::state::{ConversationState, GeneratedTicket, Phase, TaskCycle};
use crate::store::ConversationStore;
use crate::transitions::{Step, route};

/// What to do with the stored state after a step
enum Commit {
    Save(ConversationState),
    Delete,
    Keep,
}

/// Drives every conversation through the phase machine.
///
/// One `handle` call is one turn: load, compute, save. A turn that fails leaves
/// the stored state untouched.
pub struct ConversationEngine {
    ops: Arc<TaskOperations>,
    catalog: Arc<dyn TemplateCatalog>,
    store: Arc<dyn ConversationStore>,
    history: Option<Arc<dyn HistoryStore>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    config: ConversationConfig,
}

impl ConversationEngine {
    pub fn new(
        ops: Arc<TaskOperations>,
        catalog: Arc<dyn TemplateCatalog>,
        store: Arc<dyn ConversationStore>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            ops,
            catalog,
            store,
            history: None,
            transcriber: None,
            config,
        }
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn operations(&self) -> &TaskOperations {
        &self.ops
    }

    pub fn catalog(&self) -> &Arc<dyn TemplateCatalog> {
        &self.catalog
    }

    pub fn history(&self) -> Option<&Arc<dyn HistoryStore>> {
        self.history.as_ref()
    }

    pub fn can_transcribe(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Current state, or a fresh `Idle` state for an unknown key.
    pub async fn state(&self, key: &str) -> Result<ConversationState> {
        let state = self.store.get(key).await?.unwrap_or_default();
        if !state.is_consistent() {
            warn!(session = %key, phase = %state.kind(), "Stored conversation has no ticket to edit, starting over");
            return Ok(ConversationState {
                modality: state.modality,
                ..ConversationState::default()
            });
        }
        Ok(state)
    }

    pub async fn reset(&self, key: &str) -> Result<()> {
        info!(session = %key, "Conversation reset");
        self.store.delete(key).await
    }

    pub async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or_else(|| IntakeError::Config("speech-to-text is not configured".into()))?;
        let text = transcriber.transcribe(clip).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(IntakeError::EmptyTranscript);
        }
        Ok(text.to_string())
    }

    pub async fn handle(&self, key: &str, input: Input) -> Result<TurnOutcome> {
        let mut replies = Vec::new();

        let event = match input {
            Input::Text(text) => Event::text(text),
            Input::Transcript(text) => Event::voice(text),
            Input::Voice(clip) => {
                let text = self.transcribe(&clip).await?;
                replies.push(Reply::Transcribed { text: text.clone() });
                Event::voice(text)
            }
            Input::Action(action) => Event::Action(action),
            Input::Submit {
                text,
                modality,
                team,
            } => Event::Submit {
                text,
                modality,
                team,
            },
        };

        let state = self.state(key).await?;
        let from = state.kind();
        let step = route(from, &event);
        debug!(session = %key, phase = %from, step = ?step, "Routing event");

        let commit = match self.run(step, state, event, &mut replies).await {
            Ok(commit) => commit,
            Err(e) => {
                error!(session = %key, phase = %from, step = ?step, error = %e, "Turn failed");
                return Err(e);
            }
        };

        let phase = match commit {
            Commit::Save(state) => {
                debug_assert!(state.is_consistent(), "edit phase without a ticket");
                let to = state.kind();
                self.store.set(key, &state).await?;
                if to != from {
                    info!(session = %key, from = %from, to = %to, "Phase changed");
                }
                to
            }
            Commit::Delete => {
                self.store.delete(key).await?;
                info!(session = %key, "Conversation reset");
                ConversationState::default().kind()
            }
            Commit::Keep => from,
        };

        Ok(TurnOutcome { phase, replies })
    }

    async fn run(
        &self,
        step: Step,
        state: ConversationState,
        event: Event,
        replies: &mut Vec<Reply>,
    ) -> Result<Commit> {
        let (text, modality, team) = match event {
            Event::Message { text, modality } => (text, modality, None),
            Event::Submit {
                text,
                modality,
                team,
            } => (text, modality, team),
            Event::Action(UserAction::SelectTeam {
                team_id,
                subtype_id,
            }) => (
                String::new(),
                state.modality,
                Some(SelectedTeam {
                    team_id,
                    subtype_id,
                }),
            ),
            Event::Action(_) => (String::new(), state.modality, None),
        };

        let needs_text = matches!(
            step,
            Step::StartTask
                | Step::AnswerQuestion
                | Step::ReconcileBatch
                | Step::ConfirmOrRevise
                | Step::ApplyEdit
        );
        if needs_text && text.trim().is_empty() {
            replies.push(Reply::notice(Notice::EmptyInput));
            return Ok(Commit::Keep);
        }

        let next = match step {
            Step::StartTask => self.start_task(state, text, modality, team, replies).await?,
            Step::ChooseTeam => {
                let Some(next) = self.choose_team(state, &text, team, replies).await? else {
                    return Ok(Commit::Keep);
                };
                next
            }
            Step::AnswerQuestion => {
                let reconciler = self.reconciler();
                let answer = reconciler.single_answer(&text);
                self.record_answer(state, answer, replies).await?
            }
            Step::SkipQuestion => {
                let answer = self.config.placeholder.clone();
                self.record_answer(state, answer, replies).await?
            }
            Step::SkipAllQuestions => self.skip_all(state, replies).await?,
            Step::ReconcileBatch => self.reconcile_batch(state, &text, replies).await?,
            Step::ConfirmOrRevise => self.confirm_or_revise(state, &text, replies).await?,
            Step::ConfirmAnswers => self.confirm_answers(state, replies).await?,
            Step::BeginEdit => {
                if state.last_ticket.is_none() {
                    replies.push(Reply::notice(Notice::NothingToEdit));
                    return Ok(Commit::Keep);
                }
                replies.push(Reply::EditRequested);
                state.enter(Phase::AwaitingEditInstruction)
            }
            Step::ApplyEdit => self.apply_edit(state, &text, replies).await?,
            Step::CancelEdit => {
                replies.push(Reply::notice(Notice::EditCancelled));
                state.enter(Phase::Idle)
            }
            Step::Regenerate => {
                let Some(next) = self.regenerate(state, replies).await? else {
                    return Ok(Commit::Keep);
                };
                next
            }
            Step::Reset => {
                replies.push(Reply::notice(Notice::Reset));
                return Ok(Commit::Delete);
            }
            Step::Reject => {
                replies.push(Reply::notice(Notice::NotExpected));
                return Ok(Commit::Keep);
            }
        };
        Ok(Commit::Save(next))
    }

    fn reconciler(&self) -> AnswerReconciler<'_> {
        AnswerReconciler::new(&self.config, &self.ops.corrector)
    }

    async fn start_task(
        &self,
        mut state: ConversationState,
        text: String,
        modality: InputModality,
        team: Option<SelectedTeam>,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        state.modality = modality;
        let text = text.trim().to_string();

        let team = match team {
            Some(requested) => Some(
                self.catalog
                    .select(&requested.team_id, requested.subtype_id.as_deref())
                    .ok_or_else(|| IntakeError::UnknownTeam(requested.to_string()))?,
            ),
            None => {
                let detected = self.ops.classifier.classify(&text).await?;
                if let Some(team) = &detected {
                    replies.push(Reply::TeamDetected {
                        team: team.clone(),
                        label: self.catalog.display_name(team),
                    });
                }
                detected
            }
        };

        match team {
            Some(team) => self.proceed_with_team(state, TaskCycle::new(text, team), replies).await,
            None => {
                replies.push(Reply::ChooseTeam {
                    teams: self.catalog.teams(),
                });
                Ok(state.enter(Phase::AwaitingTeamChoice { source_text: text }))
            }
        }
    }

    /// `None` when the selection names no known team; the choice is offered again.
    async fn choose_team(
        &self,
        state: ConversationState,
        text: &str,
        selection: Option<SelectedTeam>,
        replies: &mut Vec<Reply>,
    ) -> Result<Option<ConversationState>> {
        let Phase::AwaitingTeamChoice { source_text } = &state.phase else {
            replies.push(Reply::notice(Notice::NotExpected));
            return Ok(None);
        };
        let source_text = source_text.clone();

        let team = match selection {
            Some(requested) => self
                .catalog
                .select(&requested.team_id, requested.subtype_id.as_deref()),
            None => self.catalog.find_by_text(text),
        };
        let Some(team) = team else {
            replies.push(Reply::notice(Notice::UnknownTeam));
            replies.push(Reply::ChooseTeam {
                teams: self.catalog.teams(),
            });
            return Ok(None);
        };

        info!(team = %team, "Team chosen");
        let next = self
            .proceed_with_team(state, TaskCycle::new(source_text, team), replies)
            .await?;
        Ok(Some(next))
    }

    fn template_for(&self, team: &SelectedTeam) -> Result<String> {
        self.catalog
            .template(&team.team_id, team.subtype_id.as_deref())
            .ok_or_else(|| IntakeError::TemplateNotFound {
                team_id: team.team_id.clone(),
                subtype_id: team.subtype_id.clone(),
            })
    }

    async fn proceed_with_team(
        &self,
        state: ConversationState,
        cycle: TaskCycle,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        let template = self.template_for(&cycle.team)?;
        let report = self
            .ops
            .sufficiency
            .check(&cycle.source_text, &template)
            .await?;

        if report.sufficient {
            return self
                .generate(state, cycle, None, TicketOrigin::Generated, replies)
                .await;
        }

        let questions = report.questions;
        match state.modality {
            InputModality::Voice => {
                let suggestions = self
                    .ops
                    .suggester
                    .suggest(&cycle.source_text, &questions)
                    .await;
                replies.push(Reply::Questions {
                    suggestions: suggestions.clone(),
                });
                Ok(state.enter(Phase::AwaitingBatchAnswers {
                    cycle,
                    questions,
                    suggestions,
                }))
            }
            InputModality::Text => {
                replies.push(Reply::Question {
                    index: 0,
                    total: questions.len(),
                    question: questions[0].clone(),
                });
                Ok(state.enter(Phase::AwaitingSingleAnswer {
                    cycle,
                    questions,
                    answers: Vec::new(),
                }))
            }
        }
    }

    async fn record_answer(
        &self,
        state: ConversationState,
        answer: String,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        let Phase::AwaitingSingleAnswer {
            cycle,
            questions,
            mut answers,
        } = state.phase.clone()
        else {
            return Err(IntakeError::InvalidInput(
                "no question is pending".into(),
            ));
        };

        answers.push(answer);
        if answers.len() < questions.len() {
            let index = answers.len();
            replies.push(Reply::Question {
                index,
                total: questions.len(),
                question: questions[index].clone(),
            });
            return Ok(state.enter(Phase::AwaitingSingleAnswer {
                cycle,
                questions,
                answers,
            }));
        }

        let info = format_additional_info(&questions, &answers);
        self.generate(state, cycle, Some(info), TicketOrigin::Generated, replies)
            .await
    }

    async fn skip_all(
        &self,
        state: ConversationState,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        let reconciler = self.reconciler();
        let (cycle, questions, answers) = match state.phase.clone() {
            Phase::AwaitingSingleAnswer {
                cycle,
                questions,
                mut answers,
            } => {
                let remaining = questions.len().saturating_sub(answers.len());
                answers.extend(reconciler.placeholders(remaining));
                (cycle, questions, answers)
            }
            Phase::AwaitingBatchAnswers {
                cycle, questions, ..
            }
            | Phase::AwaitingAnswerConfirmation {
                cycle, questions, ..
            } => {
                let answers = reconciler.placeholders(questions.len());
                (cycle, questions, answers)
            }
            _ => {
                return Err(IntakeError::InvalidInput(
                    "no questions to skip".into(),
                ));
            }
        };

        debug!(questions = questions.len(), "Skipping remaining questions");
        let info = format_additional_info(&questions, &answers);
        self.generate(state, cycle, Some(info), TicketOrigin::Generated, replies)
            .await
    }

    async fn reconcile_batch(
        &self,
        state: ConversationState,
        reply: &str,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        let Phase::AwaitingBatchAnswers {
            cycle,
            questions,
            suggestions,
        } = state.phase.clone()
        else {
            return Err(IntakeError::InvalidInput(
                "no batch answers are pending".into(),
            ));
        };

        let answers = self
            .reconciler()
            .reconcile(&questions, &suggestions, reply)
            .await;

        if self.config.confirm_batch_answers {
            replies.push(Reply::ConfirmAnswers {
                questions: questions.clone(),
                answers: answers.clone(),
            });
            return Ok(state.enter(Phase::AwaitingAnswerConfirmation {
                cycle,
                questions,
                suggestions,
                answers,
            }));
        }

        let info = format_additional_info(&questions, &answers);
        self.generate(state, cycle, Some(info), TicketOrigin::Generated, replies)
            .await
    }

    async fn confirm_or_revise(
        &self,
        state: ConversationState,
        reply: &str,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        let reconciler = self.reconciler();
        if reconciler.is_accept(reply) {
            return self.confirm_answers(state, replies).await;
        }

        let Phase::AwaitingAnswerConfirmation {
            cycle,
            questions,
            suggestions,
            answers,
        } = state.phase.clone()
        else {
            return Err(IntakeError::InvalidInput(
                "no answers await confirmation".into(),
            ));
        };

        let answers = reconciler.revise(&questions, &answers, reply).await;
        replies.push(Reply::ConfirmAnswers {
            questions: questions.clone(),
            answers: answers.clone(),
        });
        Ok(state.enter(Phase::AwaitingAnswerConfirmation {
            cycle,
            questions,
            suggestions,
            answers,
        }))
    }

    async fn confirm_answers(
        &self,
        state: ConversationState,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        let Phase::AwaitingAnswerConfirmation {
            cycle,
            questions,
            answers,
            ..
        } = state.phase.clone()
        else {
            return Err(IntakeError::InvalidInput(
                "no answers await confirmation".into(),
            ));
        };
        let info = format_additional_info(&questions, &answers);
        self.generate(state, cycle, Some(info), TicketOrigin::Generated, replies)
            .await
    }

    async fn apply_edit(
        &self,
        state: ConversationState,
        instruction: &str,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        let Some(ticket) = state.last_ticket.clone() else {
            replies.push(Reply::notice(Notice::NothingToEdit));
            return Ok(state.enter(Phase::Idle));
        };

        let outcome = self
            .ops
            .editor
            .edit(&ticket.body, instruction, &ticket.team)
            .await?;

        let origin = if outcome.applied {
            TicketOrigin::Edited
        } else {
            TicketOrigin::EditFallback
        };
        let edited = GeneratedTicket {
            body: outcome.edited_task,
            team: outcome.new_team.unwrap_or(ticket.team),
            created_at: Utc::now(),
            ..ticket
        };
        replies.push(self.ticket_reply(&edited, origin));
        Ok(state.complete(edited))
    }

    /// `None` when there is no ticket to regenerate.
    async fn regenerate(
        &self,
        state: ConversationState,
        replies: &mut Vec<Reply>,
    ) -> Result<Option<ConversationState>> {
        let Some(ticket) = state.last_ticket.clone() else {
            replies.push(Reply::notice(Notice::NothingToRegenerate));
            return Ok(None);
        };
        let cycle = TaskCycle::new(ticket.source_text, ticket.team);
        let next = self
            .generate(
                state,
                cycle,
                ticket.additional_info,
                TicketOrigin::Regenerated,
                replies,
            )
            .await?;
        Ok(Some(next))
    }

    async fn generate(
        &self,
        state: ConversationState,
        cycle: TaskCycle,
        additional_info: Option<String>,
        origin: TicketOrigin,
        replies: &mut Vec<Reply>,
    ) -> Result<ConversationState> {
        let template = self.template_for(&cycle.team)?;
        let additional_info = additional_info.filter(|info| !info.trim().is_empty());
        let body = self
            .ops
            .generator
            .generate(&cycle.source_text, &template, additional_info.as_deref())
            .await?;

        let ticket = GeneratedTicket {
            body,
            team: cycle.team,
            source_text: cycle.source_text,
            additional_info,
            created_at: Utc::now(),
        };
        replies.push(self.ticket_reply(&ticket, origin));
        self.record_history(&ticket).await;
        Ok(state.complete(ticket))
    }

    fn ticket_reply(&self, ticket: &GeneratedTicket, origin: TicketOrigin) -> Reply {
        Reply::Ticket {
            body: ticket.body.clone(),
            team: ticket.team.clone(),
            label: self.catalog.display_name(&ticket.team),
            origin,
        }
    }

    async fn record_history(&self, ticket: &GeneratedTicket) {
        if !self.config.record_history {
            return;
        }
        let Some(history) = &self.history else {
            return;
        };
        let (team, subtype) = self.catalog.names(&ticket.team);
        let entry = HistoryEntry::new(&ticket.body, team, subtype);
        if let Err(e) = history.append(entry).await {
            warn!(error = %e, "Failed to record ticket in history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use intake_catalog::TeamCatalog;
    use intake_llm::{LLMRegistry, MockLLMProvider};
    use intake_ops::OperationsConfig;

    use crate::state::PhaseKind;
    use crate::store::InMemoryConversationStore;

    const KEY: &str = "chat:42";
    const INSUFFICIENT: &str =
        r#"{"sufficient": false, "questions": ["Где кнопка?", "Какой срок?", "Платформы?"]}"#;
    const TICKET: &str = "## Описание\nКнопка сортировки";

    #[derive(Default)]
    struct RecordingHistory {
        entries: Mutex<Vec<HistoryEntry>>,
    }

    #[async_trait]
    impl HistoryStore for RecordingHistory {
        async fn append(&self, entry: HistoryEntry) -> Result<()> {
            self.entries.lock().insert(0, entry);
            Ok(())
        }
        async fn list(&self) -> Result<Vec<HistoryEntry>> {
            Ok(self.entries.lock().clone())
        }
        async fn remove(&self, id: &str) -> Result<bool> {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|e| e.id != id);
            Ok(entries.len() != before)
        }
        async fn clear(&self) -> Result<()> {
            self.entries.lock().clear();
            Ok(())
        }
    }

    struct FixedTranscriber(&'static str);

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, _clip: &AudioClip) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Fixture {
        mock: MockLLMProvider,
        store: Arc<InMemoryConversationStore>,
        history: Arc<RecordingHistory>,
        engine: ConversationEngine,
    }

    fn fixture(config: ConversationConfig) -> Fixture {
        let mock = MockLLMProvider::new("test");
        let registry = Arc::new(LLMRegistry::single(Arc::new(mock.clone())));
        let catalog: Arc<dyn TemplateCatalog> = Arc::new(TeamCatalog::embedded().unwrap());
        let ops = TaskOperations::new(&OperationsConfig::default(), registry, catalog.clone())
            .unwrap();
        let store = Arc::new(InMemoryConversationStore::new());
        let history = Arc::new(RecordingHistory::default());
        let engine = ConversationEngine::new(Arc::new(ops), catalog, store.clone(), config)
            .with_history(history.clone())
            .with_transcriber(Arc::new(FixedTranscriber("Разработка: кнопка экспорта")));
        Fixture {
            mock,
            store,
            history,
            engine,
        }
    }

    fn text(s: &str) -> Input {
        Input::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_edit_phase_without_ticket_starts_over() {
        let f = fixture(ConversationConfig::default());
        let stale = ConversationState {
            modality: InputModality::Voice,
            ..ConversationState::default()
        }
        .enter(Phase::AwaitingEditInstruction);
        f.store.set(KEY, &stale).await.unwrap();

        let state = f.engine.state(KEY).await.unwrap();
        assert_eq!(state.kind(), PhaseKind::Idle);
        assert_eq!(state.modality, InputModality::Voice);

        f.mock.set_responses(
            vec![r#"{"sufficient": true, "questions": []}"#.into(), TICKET.into()],
            false,
        );
        let outcome = f
            .engine
            .handle(KEY, text("Разработка: добавить кнопку экспорта"))
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
        assert!(f.engine.state(KEY).await.unwrap().last_ticket.is_some());
    }

    #[tokio::test]
    async fn test_keyword_team_sufficient_generates_directly() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(
            vec![r#"{"sufficient": true, "questions": []}"#.into(), TICKET.into()],
            false,
        );

        let outcome = f
            .engine
            .handle(KEY, text("Разработка: добавить кнопку сортировки"))
            .await
            .unwrap();

        // sufficiency + generation only, no classification call
        assert_eq!(f.mock.call_count(), 2);
        assert_eq!(outcome.phase, PhaseKind::Idle);
        assert!(matches!(
            &outcome.replies[0],
            Reply::TeamDetected { team, label }
                if *team == SelectedTeam::with_subtype("development", "task")
                    && label == "Разработка - Задача"
        ));
        assert_eq!(outcome.ticket(), Some(TICKET));

        let state = f.engine.state(KEY).await.unwrap();
        let ticket = state.last_ticket.unwrap();
        assert_eq!(ticket.team, SelectedTeam::with_subtype("development", "task"));
        assert_eq!(ticket.additional_info, None);
        assert_eq!(f.history.entries.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_text_single_mode_flow() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(vec![INSUFFICIENT.into(), TICKET.into()], false);

        let outcome = f
            .engine
            .handle(KEY, text("Разработка: добавить кнопку сортировки"))
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::AwaitingSingleAnswer);
        assert!(matches!(
            outcome.replies.last(),
            Some(Reply::Question { index: 0, total: 3, question }) if question == "Где кнопка?"
        ));

        let outcome = f.engine.handle(KEY, text("В каталоге")).await.unwrap();
        assert!(matches!(outcome.replies[0], Reply::Question { index: 1, .. }));
        let outcome = f.engine.handle(KEY, text("К пятнице")).await.unwrap();
        assert!(matches!(outcome.replies[0], Reply::Question { index: 2, .. }));
        assert_eq!(f.mock.call_count(), 1);

        let outcome = f.engine.handle(KEY, text("iOS")).await.unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
        assert_eq!(f.mock.call_count(), 2);

        let call = f.mock.last_call().unwrap();
        let prompt = call.user_prompt();
        assert!(prompt.contains("Где кнопка?\nВ каталоге"));
        assert!(prompt.contains("Какой срок?\nК пятнице"));
        assert!(prompt.contains("Платформы?\niOS"));
    }

    #[tokio::test]
    async fn test_skip_phrases_record_placeholder_without_llm() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(vec![INSUFFICIENT.into(), TICKET.into()], false);

        f.engine
            .handle(KEY, text("Разработка: добавить кнопку"))
            .await
            .unwrap();
        f.engine.handle(KEY, text("не знаю")).await.unwrap();
        f.engine.handle(KEY, text("-")).await.unwrap();
        assert_eq!(f.mock.call_count(), 1);

        match f.engine.state(KEY).await.unwrap().phase {
            Phase::AwaitingSingleAnswer { answers, .. } => {
                assert_eq!(answers, vec!["[не указано]", "[не указано]"]);
            }
            other => panic!("unexpected phase {:?}", other),
        }

        f.engine
            .handle(KEY, Input::Action(UserAction::SkipQuestion))
            .await
            .unwrap();
        let call = f.mock.last_call().unwrap();
        assert!(call.user_prompt().contains("Платформы?\n[не указано]"));
    }

    #[tokio::test]
    async fn test_voice_batch_flow() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(
            vec![
                INSUFFICIENT.into(),
                r#"{"answers": [{"suggestedAnswer": "В каталоге"}, "не указано", "iOS и Android"]}"#
                    .into(),
                TICKET.into(),
            ],
            false,
        );

        let outcome = f
            .engine
            .handle(KEY, Input::Voice(AudioClip::ogg(vec![1, 2, 3])))
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::AwaitingBatchAnswers);
        assert!(matches!(&outcome.replies[0], Reply::Transcribed { text } if text.starts_with("Разработка")));
        let Some(Reply::Questions { suggestions }) = outcome.replies.last() else {
            panic!("expected questions");
        };
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions[1].fallback);

        let outcome = f
            .engine
            .handle(KEY, Input::Transcript("1. да 2. следующий спринт 3. только iOS".into()))
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
        let call = f.mock.last_call().unwrap();
        let prompt = call.user_prompt();
        assert!(prompt.contains("Где кнопка?\nВ каталоге"));
        assert!(prompt.contains("Какой срок?\nследующий спринт"));
        assert!(prompt.contains("Платформы?\nтолько iOS"));
    }

    #[tokio::test]
    async fn test_batch_confirmation_when_enabled() {
        let config = ConversationConfig {
            confirm_batch_answers: true,
            ..Default::default()
        };
        let f = fixture(config);
        f.mock.set_responses(
            vec![
                INSUFFICIENT.into(),
                r#"{"answers": ["В каталоге", "Пятница", "iOS"]}"#.into(),
                r#"{"answers": ["В каталоге", "Пятница", "Android"]}"#.into(),
                TICKET.into(),
            ],
            false,
        );

        f.engine
            .handle(
                KEY,
                Input::Submit {
                    text: "Разработка: кнопка".into(),
                    modality: InputModality::Voice,
                    team: None,
                },
            )
            .await
            .unwrap();
        let outcome = f.engine.handle(KEY, Input::Transcript("ок".into())).await.unwrap();
        assert_eq!(outcome.phase, PhaseKind::AwaitingAnswerConfirmation);
        assert!(matches!(
            &outcome.replies[0],
            Reply::ConfirmAnswers { answers, .. } if answers[2] == "iOS"
        ));

        let outcome = f
            .engine
            .handle(KEY, Input::Transcript("поменяй платформу на Android".into()))
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::AwaitingAnswerConfirmation);
        assert!(matches!(
            &outcome.replies[0],
            Reply::ConfirmAnswers { answers, .. } if answers[2] == "Android"
        ));

        let outcome = f
            .engine
            .handle(KEY, Input::Action(UserAction::ConfirmAnswers))
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
        assert!(f.mock.last_call().unwrap().user_prompt().contains("Платформы?\nAndroid"));
    }

    #[tokio::test]
    async fn test_team_choice_when_unclassified() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(
            vec![
                r#"{"teamId": null, "subtypeId": null}"#.into(),
                r#"{"sufficient": true}"#.into(),
                TICKET.into(),
            ],
            false,
        );

        let outcome = f.engine.handle(KEY, text("Нужно что-то сделать")).await.unwrap();
        assert_eq!(outcome.phase, PhaseKind::AwaitingTeamChoice);
        assert!(matches!(&outcome.replies[0], Reply::ChooseTeam { teams } if !teams.is_empty()));

        let outcome = f.engine.handle(KEY, text("бухгалтерия")).await.unwrap();
        assert_eq!(outcome.phase, PhaseKind::AwaitingTeamChoice);
        assert_eq!(outcome.replies[0], Reply::notice(Notice::UnknownTeam));

        let outcome = f
            .engine
            .handle(
                KEY,
                Input::Action(UserAction::SelectTeam {
                    team_id: "analytics".into(),
                    subtype_id: None,
                }),
            )
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
        let ticket = f.engine.state(KEY).await.unwrap().last_ticket.unwrap();
        assert_eq!(ticket.team, SelectedTeam::with_subtype("analytics", "export"));
        assert_eq!(ticket.source_text, "Нужно что-то сделать");
    }

    #[tokio::test]
    async fn test_edit_flow_and_fallback() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(
            vec![
                r#"{"sufficient": true}"#.into(),
                TICKET.into(),
                "не JSON вовсе".into(),
                r###"{"editedTask": "## Описание\nДругое", "newTeamId": "design", "newSubtypeId": null}"###
                    .into(),
            ],
            false,
        );
        f.engine
            .handle(KEY, text("Разработка: кнопка сортировки"))
            .await
            .unwrap();

        let outcome = f.engine.handle(KEY, Input::Action(UserAction::Edit)).await.unwrap();
        assert_eq!(outcome.phase, PhaseKind::AwaitingEditInstruction);
        assert_eq!(outcome.replies, vec![Reply::EditRequested]);

        let outcome = f.engine.handle(KEY, text("сделай короче")).await.unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
        assert!(matches!(
            &outcome.replies[0],
            Reply::Ticket { body, origin: TicketOrigin::EditFallback, .. } if body == TICKET
        ));

        f.engine.handle(KEY, Input::Action(UserAction::Edit)).await.unwrap();
        let outcome = f.engine.handle(KEY, text("отдай дизайнерам")).await.unwrap();
        assert!(matches!(
            &outcome.replies[0],
            Reply::Ticket { origin: TicketOrigin::Edited, label, .. } if label == "Дизайн"
        ));
        let ticket = f.engine.state(KEY).await.unwrap().last_ticket.unwrap();
        assert_eq!(ticket.team, SelectedTeam::new("design"));
        assert_eq!(ticket.body, "## Описание\nДругое");
        // edits are not recorded
        assert_eq!(f.history.entries.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_edit_and_nothing_to_edit() {
        let f = fixture(ConversationConfig::default());
        let outcome = f.engine.handle(KEY, Input::Action(UserAction::Edit)).await.unwrap();
        assert_eq!(outcome.replies, vec![Reply::notice(Notice::NothingToEdit)]);
        assert_eq!(outcome.phase, PhaseKind::Idle);

        f.mock.set_responses(vec![r#"{"sufficient": true}"#.into(), TICKET.into()], false);
        f.engine.handle(KEY, text("Разработка: кнопка")).await.unwrap();
        f.engine.handle(KEY, Input::Action(UserAction::Edit)).await.unwrap();
        let outcome = f
            .engine
            .handle(KEY, Input::Action(UserAction::CancelEdit))
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
        assert!(f.engine.state(KEY).await.unwrap().last_ticket.is_some());
    }

    #[tokio::test]
    async fn test_regenerate_reuses_answers() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(
            vec![INSUFFICIENT.into(), TICKET.into(), "## Описание\nВторая версия".into()],
            false,
        );
        f.engine.handle(KEY, text("Разработка: кнопка")).await.unwrap();
        f.engine
            .handle(KEY, Input::Action(UserAction::SkipAllQuestions))
            .await
            .unwrap();

        let outcome = f
            .engine
            .handle(KEY, Input::Action(UserAction::Regenerate))
            .await
            .unwrap();
        assert!(matches!(
            &outcome.replies[0],
            Reply::Ticket { origin: TicketOrigin::Regenerated, body, .. } if body.contains("Вторая")
        ));
        let calls = f.mock.call_history();
        assert_eq!(calls[1].user_prompt(), calls[2].user_prompt());
        assert!(calls[2].user_prompt().contains("Где кнопка?\n[не указано]"));
    }

    #[tokio::test]
    async fn test_new_task_is_full_reset() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(vec![r#"{"sufficient": true}"#.into(), TICKET.into()], false);
        f.engine.handle(KEY, text("Разработка: кнопка")).await.unwrap();
        f.engine.handle(KEY, Input::Action(UserAction::Edit)).await.unwrap();

        let outcome = f
            .engine
            .handle(KEY, Input::Action(UserAction::NewTask))
            .await
            .unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
        assert_eq!(outcome.replies, vec![Reply::notice(Notice::Reset)]);
        assert!(f.store.is_empty());
        assert!(f.engine.state(KEY).await.unwrap().last_ticket.is_none());
    }

    #[tokio::test]
    async fn test_failure_leaves_state_unchanged() {
        let f = fixture(ConversationConfig::default());
        f.mock.set_responses(vec![INSUFFICIENT.into()], false);
        f.engine.handle(KEY, text("Разработка: кнопка")).await.unwrap();
        f.engine.handle(KEY, text("В каталоге")).await.unwrap();
        f.engine.handle(KEY, text("Завтра")).await.unwrap();
        let before = f.engine.state(KEY).await.unwrap();

        f.mock.set_timeout();
        let err = f.engine.handle(KEY, text("iOS")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(f.engine.state(KEY).await.unwrap(), before);

        f.mock.clear_error();
        f.mock.set_response(TICKET);
        let outcome = f.engine.handle(KEY, text("iOS")).await.unwrap();
        assert_eq!(outcome.phase, PhaseKind::Idle);
    }

    #[tokio::test]
    async fn test_unexpected_action_is_rejected() {
        let f = fixture(ConversationConfig::default());
        let outcome = f
            .engine
            .handle(KEY, Input::Action(UserAction::SkipQuestion))
            .await
            .unwrap();
        assert_eq!(outcome.replies, vec![Reply::notice(Notice::NotExpected)]);
        assert!(f.store.is_empty());

        let outcome = f.engine.handle(KEY, text("   ")).await.unwrap();
        assert_eq!(outcome.replies, vec![Reply::notice(Notice::EmptyInput)]);
        assert_eq!(f.mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_with_unknown_team_fails() {
        let f = fixture(ConversationConfig::default());
        let err = f
            .engine
            .handle(
                KEY,
                Input::Submit {
                    text: "что-то".into(),
                    modality: InputModality::Text,
                    team: Some(SelectedTeam::new("finance")),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::UnknownTeam(_)));
        assert_eq!(f.mock.call_count(), 0);
    }
}
