//! Suggested answers for clarifying questions

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use intake_core::{IntakeError, Result};
use intake_llm::{Envelope, LLMRegistry, parse_envelope};
use minijinja::context;

use crate::config::SuggesterConfig;
use crate::prompts::{PromptKind, PromptRenderer};
use crate::types::SuggestedAnswer;
use crate::util::complete;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SuggestionItem {
    Pair {
        #[serde(default, rename = "suggestedAnswer", alias = "answer")]
        suggested_answer: Option<String>,
    },
    Plain(String),
}

impl SuggestionItem {
    fn into_answer(self) -> Option<String> {
        match self {
            Self::Pair { suggested_answer } => suggested_answer,
            Self::Plain(answer) => Some(answer),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SuggestionEnvelope {
    answers: Vec<SuggestionItem>,
}

impl Envelope for SuggestionEnvelope {}

pub struct AnswerSuggester {
    config: SuggesterConfig,
    llm_registry: Arc<LLMRegistry>,
    prompts: Arc<PromptRenderer>,
}

impl AnswerSuggester {
    pub fn new(
        config: SuggesterConfig,
        llm_registry: Arc<LLMRegistry>,
        prompts: Arc<PromptRenderer>,
    ) -> Self {
        Self {
            config,
            llm_registry,
            prompts,
        }
    }

    pub fn fallback_answer(&self) -> &str {
        &self.config.fallback_answer
    }

    /// One suggestion per question, in order. Never fails: any problem with the LLM
    /// call yields the fallback prompt for every question.
    pub async fn suggest(&self, text: &str, questions: &[String]) -> Vec<SuggestedAnswer> {
        if questions.is_empty() {
            return Vec::new();
        }

        match self.request(text, questions).await {
            Ok(answers) => self.align(questions, answers),
            Err(e) => {
                warn!(error = %e, "Suggestion failed, using fallback answers");
                self.all_fallback(questions)
            }
        }
    }

    async fn request(&self, text: &str, questions: &[String]) -> Result<Vec<Option<String>>> {
        let prompt = self.prompts.render(
            PromptKind::Suggest,
            context! { text => text, questions => questions },
        )?;
        let content = complete(
            &self.llm_registry,
            &self.config.call,
            "Ты предлагаешь конкретные ответы на уточняющие вопросы. Отвечай только валидным JSON."
                .to_string(),
            prompt,
            "suggest",
        )
        .await?;

        let envelope: SuggestionEnvelope = parse_envelope(&content)
            .map_err(|e| IntakeError::malformed("suggestion", e.to_string()))?;
        Ok(envelope
            .answers
            .into_iter()
            .map(SuggestionItem::into_answer)
            .collect())
    }

    fn align(&self, questions: &[String], answers: Vec<Option<String>>) -> Vec<SuggestedAnswer> {
        let mut answers = answers.into_iter();
        questions
            .iter()
            .map(|question| match answers.next().flatten() {
                Some(answer) if self.is_acceptable(&answer) => {
                    SuggestedAnswer::new(question, answer.trim())
                }
                other => {
                    debug!(question = %question, answer = ?other, "Replacing suggestion with fallback");
                    SuggestedAnswer::fallback(question, &self.config.fallback_answer)
                }
            })
            .collect()
    }

    fn all_fallback(&self, questions: &[String]) -> Vec<SuggestedAnswer> {
        questions
            .iter()
            .map(|q| SuggestedAnswer::fallback(q, &self.config.fallback_answer))
            .collect()
    }

    /// Non-empty and free of placeholder phrases (case-insensitive).
    pub fn is_acceptable(&self, answer: &str) -> bool {
        let lower = answer.trim().to_lowercase();
        !lower.is_empty()
            && !self
                .config
                .banned_phrases
                .iter()
                .any(|phrase| lower.contains(&phrase.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::registry;
    use intake_llm::MockLLMProvider;

    fn suggester(mock: &MockLLMProvider) -> AnswerSuggester {
        AnswerSuggester::new(
            SuggesterConfig::default(),
            registry(mock),
            Arc::new(PromptRenderer::new()),
        )
    }

    fn questions() -> Vec<String> {
        vec![
            "Где находится кнопка?".into(),
            "Какие платформы?".into(),
            "Когда нужно?".into(),
        ]
    }

    #[tokio::test]
    async fn test_suggestions_aligned_and_sanitized() {
        let mock = MockLLMProvider::new("test");
        mock.set_response(
            r#"{"answers": [
                {"question": "Где находится кнопка?", "suggestedAnswer": "В каталоге товаров"},
                {"question": "Какие платформы?", "suggestedAnswer": "Требует Уточнения"},
                {"question": "Когда нужно?", "suggestedAnswer": "[уточнить: срок]"}
            ]}"#,
        );

        let suggestions = suggester(&mock).suggest("Кнопка сортировки", &questions()).await;
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].suggested_answer, "В каталоге товаров");
        assert!(!suggestions[0].fallback);
        assert_eq!(suggestions[1].suggested_answer, "Предложите ваш вариант");
        assert!(suggestions[1].fallback);
        assert!(suggestions[2].fallback);
        assert_eq!(suggestions[2].question, "Когда нужно?");

        let config = mock.last_call().unwrap().config.unwrap();
        assert_eq!(config.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_no_banned_phrase_survives() {
        let mock = MockLLMProvider::new("test");
        mock.set_response(
            r#"{"answers": ["Не указано", "unknown yet", "iOS и Android"]}"#,
        );
        let suggester = suggester(&mock);

        let suggestions = suggester.suggest("Кнопка", &questions()).await;
        for s in &suggestions {
            let lower = s.suggested_answer.to_lowercase();
            for banned in ["требует уточнения", "не указано", "неизвестно", "unknown", "[", "]"] {
                assert!(!lower.contains(banned), "{} contains {}", s.suggested_answer, banned);
            }
        }
        assert_eq!(suggestions[2].suggested_answer, "iOS и Android");
    }

    #[tokio::test]
    async fn test_short_reply_pads_with_fallback() {
        let mock = MockLLMProvider::new("test");
        mock.set_response(r#"{"answers": [{"suggestedAnswer": "Москва"}]}"#);

        let suggestions = suggester(&mock).suggest("Кнопка", &questions()).await;
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].suggested_answer, "Москва");
        assert!(suggestions[1].fallback && suggestions[2].fallback);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_fallback() {
        let mock = MockLLMProvider::new("test");
        mock.set_error("boom");

        let suggestions = suggester(&mock).suggest("Кнопка", &questions()).await;
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions.iter().all(|s| s.fallback));

        mock.clear_error();
        mock.set_response("not json");
        let suggestions = suggester(&mock).suggest("Кнопка", &questions()).await;
        assert!(suggestions.iter().all(|s| s.fallback));
    }

    #[tokio::test]
    async fn test_no_questions_no_call() {
        let mock = MockLLMProvider::new("test");
        assert!(suggester(&mock).suggest("Кнопка", &[]).await.is_empty());
        assert_eq!(mock.call_count(), 0);
    }
}
