//! Ticket generation from description, template and collected answers

use std::sync::Arc;
use tracing::info;

use intake_core::{IntakeError, Result};
use intake_llm::LLMRegistry;
use minijinja::context;

use crate::config::CallConfig;
use crate::prompts::{PromptKind, PromptRenderer};
use crate::util::{complete, strip_code_fence};

pub struct TicketGenerator {
    config: CallConfig,
    llm_registry: Arc<LLMRegistry>,
    prompts: Arc<PromptRenderer>,
}

impl TicketGenerator {
    pub fn new(config: CallConfig, llm_registry: Arc<LLMRegistry>, prompts: Arc<PromptRenderer>) -> Self {
        Self {
            config,
            llm_registry,
            prompts,
        }
    }

    /// Fill `template` from `text` and the optional answers block. No retry.
    pub async fn generate(
        &self,
        text: &str,
        template: &str,
        additional_info: Option<&str>,
    ) -> Result<String> {
        let prompt = self.prompts.render(
            PromptKind::Generate,
            context! {
                text => text,
                template => template,
                additional_info => additional_info.unwrap_or_default(),
            },
        )?;
        let content = complete(
            &self.llm_registry,
            &self.config,
            self.prompts.system()?,
            prompt,
            "generate",
        )
        .await?;

        let ticket = strip_code_fence(&content);
        if ticket.is_empty() {
            return Err(IntakeError::malformed("generation", "empty ticket"));
        }
        info!(chars = ticket.len(), "Ticket generated");
        Ok(ticket.to_string())
    }
}

/// Question/answer pairs as one block, in question order.
pub fn format_additional_info(questions: &[String], answers: &[String]) -> String {
    questions
        .iter()
        .zip(answers)
        .map(|(question, answer)| format!("{}\n{}", question, answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::registry;
    use intake_llm::MockLLMProvider;

    fn generator(mock: &MockLLMProvider) -> TicketGenerator {
        TicketGenerator::new(CallConfig::default(), registry(mock), Arc::new(PromptRenderer::new()))
    }

    #[tokio::test]
    async fn test_generate_passes_everything_to_llm() {
        let mock = MockLLMProvider::new("test");
        mock.set_response("## Описание\nКнопка сортировки\n\n## Сроки\n[уточнить: срок]");

        let info = format_additional_info(
            &["Где?".to_string(), "Когда?".to_string()],
            &["В каталоге".to_string(), "[не указано]".to_string()],
        );
        let ticket = generator(&mock)
            .generate("Добавить кнопку сортировки", "## Описание\n## Сроки", Some(&info))
            .await
            .unwrap();
        assert!(ticket.starts_with("## Описание"));

        let call = mock.last_call().unwrap();
        assert!(call.messages[0].content.contains("[уточнить: что именно]"));
        let prompt = call.user_prompt();
        assert!(prompt.contains("Добавить кнопку сортировки"));
        assert!(prompt.contains("Дополнительная информация:\nГде?\nВ каталоге\n\nКогда?\n[не указано]"));
    }

    #[tokio::test]
    async fn test_generate_is_deterministic_with_stub() {
        let mock = MockLLMProvider::new("test");
        mock.set_response("```markdown\n## Описание\nОдинаково\n```");
        let generator = generator(&mock);

        let first = generator.generate("Текст", "## Описание", None).await.unwrap();
        let second = generator.generate("Текст", "## Описание", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "## Описание\nОдинаково");
        assert_eq!(
            mock.call_history()[0].user_prompt(),
            mock.call_history()[1].user_prompt()
        );
    }

    #[tokio::test]
    async fn test_generate_errors() {
        let mock = MockLLMProvider::new("test");
        let generator = generator(&mock);

        mock.set_response("   ");
        assert!(matches!(
            generator.generate("Текст", "## A", None).await,
            Err(IntakeError::MalformedResponse { .. })
        ));

        mock.set_timeout();
        let err = generator.generate("Текст", "## A", None).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(mock.call_count(), 2);
    }
}
