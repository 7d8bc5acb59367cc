//! LLM-backed operations of the task intake flow
//!
//! Each operation is independent: [`TeamClassifier`], [`SufficiencyChecker`],
//! [`AnswerSuggester`], [`TicketGenerator`], [`TicketEditor`] and [`AnswerCorrector`].
//! [`TaskOperations`] wires them from one [`OperationsConfig`].

pub mod classifier;
pub mod config;
pub mod corrector;
pub mod editor;
pub mod generator;
pub mod prompts;
pub mod sufficiency;
pub mod suggester;
pub mod types;
mod util;

use std::sync::Arc;

use intake_core::{Result, TemplateCatalog};
use intake_llm::LLMRegistry;

pub use classifier::TeamClassifier;
pub use config::{
    CallConfig, ClassifierConfig, KeywordRule, OperationsConfig, SufficiencyConfig,
    SuggesterConfig,
};
pub use corrector::AnswerCorrector;
pub use editor::TicketEditor;
pub use generator::{TicketGenerator, format_additional_info};
pub use prompts::{PromptKind, PromptRenderer};
pub use sufficiency::SufficiencyChecker;
pub use suggester::AnswerSuggester;
pub use types::{EditOutcome, SufficiencyReport, SuggestedAnswer};

/// All operations sharing one registry, catalog and prompt set
pub struct TaskOperations {
    pub classifier: TeamClassifier,
    pub sufficiency: SufficiencyChecker,
    pub suggester: AnswerSuggester,
    pub generator: TicketGenerator,
    pub editor: TicketEditor,
    pub corrector: AnswerCorrector,
}

impl TaskOperations {
    pub fn new(
        config: &OperationsConfig,
        llm_registry: Arc<LLMRegistry>,
        catalog: Arc<dyn TemplateCatalog>,
    ) -> Result<Self> {
        let prompts = Arc::new(PromptRenderer::with_overrides(&config.prompts)?);

        Ok(Self {
            classifier: TeamClassifier::new(
                config.classifier.clone(),
                llm_registry.clone(),
                catalog.clone(),
                prompts.clone(),
            ),
            sufficiency: SufficiencyChecker::new(
                config.sufficiency.clone(),
                llm_registry.clone(),
                prompts.clone(),
            ),
            suggester: AnswerSuggester::new(
                config.suggester.clone(),
                llm_registry.clone(),
                prompts.clone(),
            ),
            generator: TicketGenerator::new(
                config.generator.clone(),
                llm_registry.clone(),
                prompts.clone(),
            ),
            editor: TicketEditor::new(
                config.editor.clone(),
                llm_registry.clone(),
                catalog,
                prompts.clone(),
            ),
            corrector: AnswerCorrector::new(config.corrector.clone(), llm_registry, prompts),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use intake_catalog::TeamCatalog;
    use intake_core::TemplateCatalog;
    use intake_llm::{LLMRegistry, MockLLMProvider};

    pub fn registry(mock: &MockLLMProvider) -> Arc<LLMRegistry> {
        Arc::new(LLMRegistry::single(Arc::new(mock.clone())))
    }

    pub fn catalog() -> Arc<dyn TemplateCatalog> {
        Arc::new(TeamCatalog::embedded().unwrap())
    }
}
