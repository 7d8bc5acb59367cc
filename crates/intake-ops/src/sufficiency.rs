//! Sufficiency check: does the description cover the template?

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use intake_core::{IntakeError, Result};
use intake_llm::{Envelope, LLMRegistry, parse_envelope};
use minijinja::context;

use crate::config::SufficiencyConfig;
use crate::prompts::{PromptKind, PromptRenderer};
use crate::types::SufficiencyReport;
use crate::util::complete;

#[derive(Debug, Deserialize)]
struct SufficiencyEnvelope {
    sufficient: bool,
    #[serde(default)]
    questions: Vec<String>,
}

impl Envelope for SufficiencyEnvelope {}

pub struct SufficiencyChecker {
    config: SufficiencyConfig,
    llm_registry: Arc<LLMRegistry>,
    prompts: Arc<PromptRenderer>,
}

impl SufficiencyChecker {
    pub fn new(
        config: SufficiencyConfig,
        llm_registry: Arc<LLMRegistry>,
        prompts: Arc<PromptRenderer>,
    ) -> Self {
        Self {
            config,
            llm_registry,
            prompts,
        }
    }

    /// Ask whether `text` is enough to fill `template`.
    ///
    /// Transport and parse failures are errors; a failed check is never treated as
    /// sufficient.
    pub async fn check(&self, text: &str, template: &str) -> Result<SufficiencyReport> {
        let prompt = self.prompts.render(
            PromptKind::Sufficiency,
            context! {
                text => text,
                template => template,
                max_questions => self.config.max_questions,
            },
        )?;
        let content = complete(
            &self.llm_registry,
            &self.config.call,
            "Ты проверяешь полноту описания задачи. Отвечай только валидным JSON.".to_string(),
            prompt,
            "sufficiency",
        )
        .await?;

        let envelope: SufficiencyEnvelope = parse_envelope(&content)
            .map_err(|e| IntakeError::malformed("sufficiency", e.to_string()))?;

        let report = if envelope.sufficient {
            SufficiencyReport::sufficient()
        } else {
            SufficiencyReport::with_questions(envelope.questions, self.config.max_questions)
        };
        info!(
            sufficient = report.sufficient,
            questions = report.total_questions,
            "Sufficiency checked"
        );
        Ok(report)
    }
}
