//! Seams between the intake core and its collaborators

pub mod catalog;
pub mod history;
pub mod llm;
pub mod speech;

pub use catalog::TemplateCatalog;
pub use history::HistoryStore;
pub use llm::LLMProvider;
pub use speech::Transcriber;
