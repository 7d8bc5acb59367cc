//! Bot API client over reqwest

use anyhow::{Context, anyhow, bail};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use super::types::{ApiResponse, File, Outgoing};

pub struct TelegramApi {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApi")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TelegramApi {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> anyhow::Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Telegram {} request failed", method))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Telegram {} returned HTTP {}: {}", method, status.as_u16(), text);
        }

        let parsed: ApiResponse<T> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid Telegram {} response", method))?;
        if !parsed.ok {
            bail!(
                "Telegram {} failed: {}",
                method,
                parsed.description.unwrap_or_default()
            );
        }
        parsed
            .result
            .ok_or_else(|| anyhow!("Telegram {} returned no result", method))
    }

    pub async fn send_message(&self, chat_id: i64, message: &Outgoing) -> anyhow::Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": message.text,
        });
        if let Some(mode) = message.parse_mode {
            body["parse_mode"] = serde_json::to_value(mode)?;
        }
        if let Some(keyboard) = &message.keyboard {
            body["reply_markup"] = serde_json::to_value(keyboard)?;
        }
        let _: Value = self.call("sendMessage", body).await?;
        debug!(chat_id, chars = message.text.chars().count(), "Message sent");
        Ok(())
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut body = json!({ "callback_query_id": callback_query_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: Value = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }

    /// Resolve `file_id` and download the file contents.
    pub async fn download_file(&self, file_id: &str) -> anyhow::Result<Vec<u8>> {
        let file: File = self.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| anyhow!("Telegram file {} has no path", file.file_id))?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .context("Telegram file download failed")?;
        if !response.status().is_success() {
            bail!("Telegram file download returned HTTP {}", response.status().as_u16());
        }
        let bytes = response.bytes().await.context("Failed to read Telegram file")?;
        debug!(file_id, bytes = bytes.len(), "File downloaded");
        Ok(bytes.to_vec())
    }
}
