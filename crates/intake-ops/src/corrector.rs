//! Free-text corrections of suggested answers ("поменяй второй ответ на ...")

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use intake_core::{IntakeError, Result};
use intake_llm::{Envelope, LLMRegistry, parse_envelope};
use minijinja::context;

use crate::config::CallConfig;
use crate::prompts::{PromptKind, PromptRenderer};
use crate::util::complete;

#[derive(Debug, Deserialize)]
struct CorrectionEnvelope {
    answers: Vec<String>,
}

impl Envelope for CorrectionEnvelope {}

#[derive(Debug, Serialize)]
struct CorrectionItem<'a> {
    question: &'a str,
    answer: &'a str,
}

pub struct AnswerCorrector {
    config: CallConfig,
    llm_registry: Arc<LLMRegistry>,
    prompts: Arc<PromptRenderer>,
}

impl AnswerCorrector {
    pub fn new(config: CallConfig, llm_registry: Arc<LLMRegistry>, prompts: Arc<PromptRenderer>) -> Self {
        Self {
            config,
            llm_registry,
            prompts,
        }
    }

    /// Merge the user's reply into the current answers.
    ///
    /// `questions` and `answers` are index-aligned. The result has the same length or
    /// the call fails; callers keep their current answers on failure.
    pub async fn correct(
        &self,
        questions: &[String],
        answers: &[String],
        reply: &str,
    ) -> Result<Vec<String>> {
        let items: Vec<CorrectionItem<'_>> = questions
            .iter()
            .zip(answers)
            .map(|(question, answer)| CorrectionItem { question, answer })
            .collect();

        let prompt = self.prompts.render(
            PromptKind::Correct,
            context! { items => items, reply => reply },
        )?;
        let content = complete(
            &self.llm_registry,
            &self.config,
            "Ты сопоставляешь ответ пользователя с вопросами. Отвечай только валидным JSON."
                .to_string(),
            prompt,
            "correct",
        )
        .await?;

        let envelope: CorrectionEnvelope = parse_envelope(&content)
            .map_err(|e| IntakeError::malformed("correction", e.to_string()))?;
        if envelope.answers.len() != questions.len() {
            return Err(IntakeError::malformed(
                "correction",
                format!(
                    "expected {} answers, got {}",
                    questions.len(),
                    envelope.answers.len()
                ),
            ));
        }

        info!(answers = envelope.answers.len(), "Answers corrected");
        Ok(envelope
            .answers
            .into_iter()
            .map(|a| a.trim().to_string())
            .collect())
    }
}
