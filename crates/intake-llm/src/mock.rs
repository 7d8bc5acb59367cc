use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use intake_core::{ChatMessage, FinishReason, LLMConfig, LLMError, LLMProvider, LLMResponse, TokenUsage};

/// Scripted LLM provider for tests.
///
/// Clones share state, so a test can hand one clone to the code under test and keep
/// another to script responses and inspect calls.
#[derive(Clone)]
pub struct MockLLMProvider {
    inner: Arc<RwLock<MockInner>>,
}

struct MockInner {
    name: String,
    responses: Vec<String>,
    response_index: usize,
    cycle_responses: bool,
    call_history: Vec<MockCall>,
    error: Option<MockFailure>,
    latency_ms: u64,
}

#[derive(Debug, Clone)]
enum MockFailure {
    Message(String),
    Timeout,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub messages: Vec<ChatMessage>,
    pub config: Option<LLMConfig>,
    pub timestamp: std::time::Instant,
}

impl MockCall {
    /// Content of the last user message in the call.
    pub fn user_prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == intake_core::Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

impl MockLLMProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MockInner {
                name: name.into(),
                responses: Vec::new(),
                response_index: 0,
                cycle_responses: false,
                call_history: Vec::new(),
                error: None,
                latency_ms: 0,
            })),
        }
    }

    pub fn set_response(&self, response: impl Into<String>) {
        self.set_responses(vec![response.into()], false);
    }

    /// Queue responses in order. Without `cycle` the last one repeats.
    pub fn set_responses(&self, responses: Vec<String>, cycle: bool) {
        let mut inner = self.inner.write();
        inner.responses = responses;
        inner.response_index = 0;
        inner.cycle_responses = cycle;
    }

    pub fn set_error(&self, error_message: impl Into<String>) {
        self.inner.write().error = Some(MockFailure::Message(error_message.into()));
    }

    pub fn set_timeout(&self) {
        self.inner.write().error = Some(MockFailure::Timeout);
    }

    pub fn clear_error(&self) {
        self.inner.write().error = None;
    }

    pub fn set_latency(&self, latency_ms: u64) {
        self.inner.write().latency_ms = latency_ms;
    }

    pub fn call_count(&self) -> usize {
        self.inner.read().call_history.len()
    }

    pub fn call_history(&self) -> Vec<MockCall> {
        self.inner.read().call_history.clone()
    }

    pub fn last_call(&self) -> Option<MockCall> {
        self.inner.read().call_history.last().cloned()
    }

    pub fn clear_history(&self) {
        self.inner.write().call_history.clear();
    }

    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.responses.clear();
        inner.response_index = 0;
        inner.cycle_responses = false;
        inner.call_history.clear();
        inner.error = None;
        inner.latency_ms = 0;
    }

    fn next_content(&self) -> String {
        let mut inner = self.inner.write();
        if inner.responses.is_empty() {
            return "Mock response".to_string();
        }

        let content = inner.responses[inner.response_index].clone();
        if inner.cycle_responses {
            inner.response_index = (inner.response_index + 1) % inner.responses.len();
        } else if inner.response_index < inner.responses.len() - 1 {
            inner.response_index += 1;
        }
        content
    }

    fn record_call(&self, messages: &[ChatMessage], config: Option<&LLMConfig>) {
        self.inner.write().call_history.push(MockCall {
            messages: messages.to_vec(),
            config: config.cloned(),
            timestamp: std::time::Instant::now(),
        });
    }

    fn estimate_tokens(text_len: usize) -> u32 {
        (text_len / 4) as u32
    }
}

impl Default for MockLLMProvider {
    fn default() -> Self {
        Self::new("default")
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, LLMError> {
        self.record_call(messages, config);

        let latency_ms = self.inner.read().latency_ms;
        if latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(latency_ms)).await;
        }

        let failure = self.inner.read().error.clone();
        match failure {
            Some(MockFailure::Message(message)) => return Err(LLMError::Other(message)),
            Some(MockFailure::Timeout) => {
                return Err(LLMError::Timeout(std::time::Duration::from_secs(30)));
            }
            None => {}
        }

        let content = self.next_content();
        let prompt_len: usize = messages.iter().map(|m| m.content.len()).sum();
        let mut response = LLMResponse::new(content, FinishReason::Stop);
        response.usage = Some(TokenUsage::new(
            Self::estimate_tokens(prompt_len),
            Self::estimate_tokens(response.content.len()),
        ));
        response.model = Some("mock-model".to_string());
        Ok(response)
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

impl std::fmt::Debug for MockLLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MockLLMProvider")
            .field("name", &inner.name)
            .field("responses", &inner.responses.len())
            .field("calls", &inner.call_history.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_basic() {
        let mock = MockLLMProvider::new("test");
        mock.set_response("{\"sufficient\": true}");

        let messages = vec![ChatMessage::user("Hello")];
        let response = mock.complete(&messages, None).await.unwrap();
        assert_eq!(response.content, "{\"sufficient\": true}");
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_multiple_responses_repeat_last() {
        let mock = MockLLMProvider::new("test");
        mock.set_responses(vec!["First".into(), "Second".into()], false);
        let messages = vec![ChatMessage::user("Hello")];

        assert_eq!(mock.complete(&messages, None).await.unwrap().content, "First");
        assert_eq!(mock.complete(&messages, None).await.unwrap().content, "Second");
        assert_eq!(mock.complete(&messages, None).await.unwrap().content, "Second");
    }

    #[tokio::test]
    async fn test_cycle_responses() {
        let mock = MockLLMProvider::new("test");
        mock.set_responses(vec!["A".into(), "B".into()], true);
        let messages = vec![ChatMessage::user("Hello")];

        assert_eq!(mock.complete(&messages, None).await.unwrap().content, "A");
        assert_eq!(mock.complete(&messages, None).await.unwrap().content, "B");
        assert_eq!(mock.complete(&messages, None).await.unwrap().content, "A");
    }

    #[tokio::test]
    async fn test_error_and_timeout() {
        let mock = MockLLMProvider::new("test");
        let messages = vec![ChatMessage::user("Hello")];

        mock.set_error("Test error");
        let err = mock.complete(&messages, None).await.unwrap_err();
        assert!(err.to_string().contains("Test error"));

        mock.set_timeout();
        let err = mock.complete(&messages, None).await.unwrap_err();
        assert!(matches!(err, LLMError::Timeout(_)));

        mock.clear_error();
        assert!(mock.complete(&messages, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_shared_history_across_clones() {
        let mock = MockLLMProvider::new("test");
        let handle: Arc<dyn LLMProvider> = Arc::new(mock.clone());

        handle
            .complete(&[ChatMessage::system("sys"), ChatMessage::user("First")], None)
            .await
            .unwrap();
        handle
            .complete(&[ChatMessage::user("Second")], None)
            .await
            .unwrap();

        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.call_history()[0].user_prompt(), "First");
        assert_eq!(mock.last_call().unwrap().user_prompt(), "Second");

        mock.reset();
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_token_estimation() {
        let mock = MockLLMProvider::new("test");
        mock.set_response("test response");
        let response = mock
            .complete(&[ChatMessage::user("Hello world, hello")], None)
            .await
            .unwrap();

        let usage = response.usage.unwrap();
        assert!(usage.prompt_tokens > 0);
        assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);
    }
}
