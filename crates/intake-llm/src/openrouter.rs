//! OpenRouter chat-completions client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use intake_core::{
    ChatMessage, FinishReason, LLMConfig, LLMError, LLMProvider, LLMResponse, Role, TokenUsage,
};

/// Connection settings for an OpenRouter-compatible endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_referer")]
    pub referer: String,

    #[serde(default = "default_title")]
    pub title: String,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "google/gemini-2.0-flash-001".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_referer() -> String {
    "http://localhost:3000".to_string()
}

fn default_title() -> String {
    "Jira Task Creator".to_string()
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            referer: default_referer(),
            title: default_title(),
        }
    }
}

impl OpenRouterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    code: Option<u16>,
}

pub struct OpenRouterProvider {
    client: reqwest::Client,
    config: OpenRouterConfig,
    api_key: String,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("model", &self.config.model)
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig, api_key: impl Into<String>) -> Result<Self, LLMError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LLMError::Config("OpenRouter API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LLMError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Read the API key from the environment variable named in the config.
    pub fn from_env(config: OpenRouterConfig) -> Result<Self, LLMError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            LLMError::Config(format!(
                "API key not found in environment variable {}",
                config.api_key_env
            ))
        })?;
        Self::new(config, api_key)
    }

    pub fn model_name(&self) -> &str {
        &self.config.model
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        config: Option<&'a LLMConfig>,
    ) -> CompletionRequest<'a> {
        CompletionRequest {
            model: config
                .and_then(|c| c.model.as_deref())
                .unwrap_or(&self.config.model),
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: config.and_then(|c| c.max_tokens),
            temperature: config.and_then(|c| c.temperature),
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> LLMError {
        if err.is_timeout() {
            LLMError::Timeout(self.config.timeout())
        } else {
            LLMError::Network(err.to_string())
        }
    }
}

fn parse_completion(body: CompletionResponse) -> Result<LLMResponse, LLMError> {
    if let Some(error) = body.error {
        return Err(LLMError::API {
            message: error.message,
            status: error.code,
        });
    }

    let choice = body.choices.into_iter().next().ok_or(LLMError::EmptyResponse)?;
    let content = choice
        .message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or(LLMError::EmptyResponse)?;

    let mut response = LLMResponse::new(
        content,
        choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_wire)
            .unwrap_or(FinishReason::Stop),
    );
    response.usage = body
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));
    response.model = body.model;
    Ok(response)
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: Option<&LLMConfig>,
    ) -> Result<LLMResponse, LLMError> {
        let request = self.build_request(messages, config);
        debug!(
            model = request.model,
            messages = request.messages.len(),
            "Sending chat completion"
        );

        let response = self
            .client
            .post(self.config.completions_url())
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.config.referer)
            .header("X-Title", &self.config.title)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LLMError::RateLimit {
                retry_after: retry_after(response.headers()),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "OpenRouter request failed");
            return Err(LLMError::API {
                message,
                status: Some(status.as_u16()),
            });
        }

        let body: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LLMError::Timeout(self.config.timeout())
            } else {
                LLMError::Serialization(e.to_string())
            }
        })?;
        parse_completion(body)
    }

    fn provider_name(&self) -> &str {
        "openrouter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenRouterProvider {
        OpenRouterProvider::new(OpenRouterConfig::default(), "sk-test").unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let provider = provider();
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("text")];
        let config = LLMConfig::new().with_temperature(0.7).with_max_tokens(2000);

        let body = serde_json::to_value(provider.build_request(&messages, Some(&config))).unwrap();
        assert_eq!(body["model"], "google/gemini-2.0-flash-001");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "text");
        assert_eq!(body["max_tokens"], 2000);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);

        let body = serde_json::to_value(provider.build_request(&messages, None)).unwrap();
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_model_override() {
        let provider = provider();
        let messages = vec![ChatMessage::user("text")];
        let config = LLMConfig::new().with_model("openai/gpt-4o-mini");
        let request = provider.build_request(&messages, Some(&config));
        assert_eq!(request.model, "openai/gpt-4o-mini");
    }

    #[test]
    fn test_parse_completion() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"model":"google/gemini-2.0-flash-001","choices":[{"message":{"role":"assistant","content":"{\"teamId\":\"design\"}"},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        )
        .unwrap();
        let response = parse_completion(body).unwrap();
        assert_eq!(response.content, r#"{"teamId":"design"}"#);
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_completion_errors() {
        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(parse_completion(empty), Err(LLMError::EmptyResponse)));

        let blank: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        assert!(matches!(parse_completion(blank), Err(LLMError::EmptyResponse)));

        let error: CompletionResponse =
            serde_json::from_str(r#"{"error":{"message":"No credits","code":402}}"#).unwrap();
        match parse_completion(error) {
            Err(LLMError::API { message, status }) => {
                assert_eq!(message, "No credits");
                assert_eq!(status, Some(402));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = OpenRouterConfig {
            api_key_env: "INTAKE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..OpenRouterConfig::default()
        };
        let err = OpenRouterProvider::from_env(config).unwrap_err();
        assert!(matches!(err, LLMError::Config(_)));
        assert!(err.to_string().contains("INTAKE_TEST_KEY_THAT_IS_NEVER_SET"));

        let err = OpenRouterProvider::new(OpenRouterConfig::default(), " ").unwrap_err();
        assert!(matches!(err, LLMError::Config(_)));
    }

    #[tokio::test]
    async fn test_silent_endpoint_times_out() {
        // connections queue in the backlog and never get a response
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = OpenRouterConfig {
            base_url: format!("http://{}/api/v1", listener.local_addr().unwrap()),
            timeout_secs: 1,
            ..OpenRouterConfig::default()
        };
        let provider = OpenRouterProvider::new(config, "sk-test").unwrap();

        let err = provider
            .complete(&[ChatMessage::user("text")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::Timeout(d) if d == Duration::from_secs(1)));
        assert!(err.is_transient());
        drop(listener);
    }

    #[test]
    fn test_completions_url() {
        let config = OpenRouterConfig {
            base_url: "http://localhost:8080/v1/".into(),
            ..OpenRouterConfig::default()
        };
        assert_eq!(config.completions_url(), "http://localhost:8080/v1/chat/completions");
    }
}
