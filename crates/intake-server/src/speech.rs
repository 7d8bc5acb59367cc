//! Deepgram speech-to-text

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use intake_core::{AudioClip, IntakeError, Result, Transcriber};

use crate::config::SpeechConfig;

#[derive(Debug, Deserialize)]
struct ListenResponse {
    #[serde(default)]
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

/// Transcript of the first alternative of the first channel; empty when absent.
fn parse_transcript(body: &str) -> Result<String> {
    let response: ListenResponse = serde_json::from_str(body)
        .map_err(|e| IntakeError::Transcription(format!("Invalid Deepgram response: {}", e)))?;
    Ok(response
        .results
        .and_then(|r| r.channels.into_iter().next())
        .and_then(|c| c.alternatives.into_iter().next())
        .map(|a| a.transcript.trim().to_string())
        .unwrap_or_default())
}

pub struct DeepgramTranscriber {
    client: reqwest::Client,
    config: SpeechConfig,
    api_key: String,
}

impl DeepgramTranscriber {
    pub fn new(config: SpeechConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(IntakeError::Config("Deepgram API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IntakeError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    pub fn from_env(config: SpeechConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            IntakeError::Config(format!(
                "API key not found in environment variable {}",
                config.api_key_env
            ))
        })?;
        Self::new(config, api_key)
    }

    fn query(&self) -> [(&'static str, &str); 4] {
        [
            ("language", self.config.language.as_str()),
            ("model", self.config.model.as_str()),
            ("smart_format", "true"),
            ("punctuate", "true"),
        ]
    }
}

#[async_trait]
impl Transcriber for DeepgramTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String> {
        debug!(bytes = clip.bytes.len(), mime = %clip.mime_type, "Sending audio to Deepgram");

        let response = self
            .client
            .post(&self.config.base_url)
            .query(&self.query())
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", &clip.mime_type)
            .body(clip.bytes.clone())
            .send()
            .await
            .map_err(|e| IntakeError::Transcription(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IntakeError::Transcription(e.to_string()))?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Deepgram request failed");
            return Err(IntakeError::Transcription(format!(
                "Deepgram returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let transcript = parse_transcript(&body)?;
        if transcript.is_empty() {
            return Err(IntakeError::EmptyTranscript);
        }
        debug!(chars = transcript.len(), "Transcribed");
        Ok(transcript)
    }
}
