use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;

use super::{NotificationSender, SenderError};
use crate::config::TelegramConfig;

/// A sender for pushing notifications via the Telegram Bot API.
pub struct TelegramSender {
    client: Client,
    config: TelegramConfig,
}

impl TelegramSender {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.config.bot_token, method)
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn notify(&self, message: &str) -> Result<(), SenderError> {
        let payload = SendMessage {
            chat_id: &self.config.chat_id,
            text: message,
        };

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;
        ensure_success(response).await
    }

    async fn deliver(&self, file: &Path, caption: &str) -> Result<(), SenderError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|source| SenderError::Document {
                path: file.to_path_buf(),
                source,
            })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let form = multipart::Form::new()
            .text("chat_id", self.config.chat_id.clone())
            .text("caption", caption.to_string())
            .part("document", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<(), SenderError> {
    let status = response.status();
    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        return Err(SenderError::SendFailed(format!(
            "Telegram API returned non-success status: {status}. Body: {error_body}"
        )));
    }
    Ok(())
}
