//! LLM providers and response parsing for the task intake assistant

pub mod envelope;
pub mod mock;
pub mod openrouter;
pub mod registry;

pub use envelope::{Envelope, EnvelopeError, extract_json, optional_id, parse_envelope};
pub use intake_core::{
    ChatMessage, FinishReason, LLMConfig, LLMError, LLMProvider, LLMResponse, Role, TokenUsage,
};
pub use mock::MockLLMProvider;
pub use openrouter::{OpenRouterConfig, OpenRouterProvider};
pub use registry::LLMRegistry;
