//! Merge user replies with pending questions and suggested answers

use tracing::{debug, warn};

use intake_ops::{AnswerCorrector, SuggestedAnswer};

use crate::answers::{matches_phrase, segment};
use crate::config::ConversationConfig;

pub struct AnswerReconciler<'a> {
    config: &'a ConversationConfig,
    corrector: &'a AnswerCorrector,
}

impl<'a> AnswerReconciler<'a> {
    pub fn new(config: &'a ConversationConfig, corrector: &'a AnswerCorrector) -> Self {
        Self { config, corrector }
    }

    /// Answer for the current question in single mode. A skip phrase records the
    /// placeholder without any LLM call.
    pub fn single_answer(&self, reply: &str) -> String {
        let reply = reply.trim();
        if reply.is_empty() || self.is_skip(reply) {
            return self.config.placeholder.clone();
        }
        reply.to_string()
    }

    /// The suggestion when it is a real proposal, else the placeholder.
    pub fn default_answer(&self, suggestion: Option<&SuggestedAnswer>) -> String {
        suggestion
            .and_then(SuggestedAnswer::proposal)
            .map(String::from)
            .unwrap_or_else(|| self.config.placeholder.clone())
    }

    pub fn default_answers(&self, questions: &[String], suggestions: &[SuggestedAnswer]) -> Vec<String> {
        (0..questions.len())
            .map(|i| self.default_answer(suggestions.get(i)))
            .collect()
    }

    pub fn placeholders(&self, count: usize) -> Vec<String> {
        vec![self.config.placeholder.clone(); count]
    }

    pub fn is_accept(&self, reply: &str) -> bool {
        matches_phrase(reply, &self.config.accept_phrases)
    }

    pub fn is_skip(&self, reply: &str) -> bool {
        matches_phrase(reply, &self.config.skip_phrases)
    }

    /// Reconcile a batch reply into one answer per question. Never fails.
    pub async fn reconcile(
        &self,
        questions: &[String],
        suggestions: &[SuggestedAnswer],
        reply: &str,
    ) -> Vec<String> {
        let count = questions.len();
        if count == 0 {
            return Vec::new();
        }
        let reply = reply.trim();
        if reply.is_empty() || self.is_accept(reply) {
            debug!(questions = count, "Batch reply accepts suggestions");
            return self.default_answers(questions, suggestions);
        }
        if self.is_skip(reply) {
            debug!(questions = count, "Batch reply skips every question");
            return self.placeholders(count);
        }

        if let Some(segments) = segment(reply, count) {
            debug!(questions = count, "Batch reply segmented");
            return segments
                .iter()
                .enumerate()
                .map(|(i, part)| self.resolve_segment(part, suggestions.get(i)))
                .collect();
        }

        let has_proposals = suggestions.iter().any(|s| s.proposal().is_some());
        if count > 1 && has_proposals {
            let current = self.default_answers(questions, suggestions);
            return self.revise(questions, &current, reply).await;
        }

        debug!(questions = count, "Whole batch reply used for every question");
        vec![reply.to_string(); count]
    }

    /// Free-text correction of existing answers through the LLM. On failure the
    /// current answers are kept.
    pub async fn revise(&self, questions: &[String], current: &[String], reply: &str) -> Vec<String> {
        match self.corrector.correct(questions, current, reply).await {
            Ok(answers) => answers,
            Err(e) => {
                warn!(error = %e, "Answer correction failed, keeping current answers");
                current.to_vec()
            }
        }
    }

    fn resolve_segment(&self, segment: &str, suggestion: Option<&SuggestedAnswer>) -> String {
        let segment = segment.trim();
        if segment.is_empty() || self.is_accept(segment) {
            return self.default_answer(suggestion);
        }
        if self.is_skip(segment) {
            return self.config.placeholder.clone();
        }
        segment.to_string()
    }
}
