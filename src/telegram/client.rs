//! Minimal Bot API client: long polling and plain text replies.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use super::{ReplySink, Update};

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            _ => anyhow::bail!(
                "Telegram {} failed: {}",
                method,
                self.description.unwrap_or_else(|| "no description".to_string())
            ),
        }
    }
}

#[derive(Serialize, Debug)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Serialize, Debug)]
struct GetUpdatesPayload {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, poll_timeout_secs: u64) -> Result<Self> {
        // The HTTP timeout must outlast the long-poll timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            poll_timeout_secs,
        })
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let payload = GetUpdatesPayload {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: ["message"],
        };

        let response: ApiResponse<Vec<Update>> = self
            .client
            .post(format!("{}/getUpdates", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("getUpdates request failed")?
            .json()
            .await
            .context("Failed to decode getUpdates response")?;

        let updates = response.into_result("getUpdates")?;
        debug!("Received {} updates", updates.len());
        Ok(updates)
    }
}

#[async_trait]
impl ReplySink for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&SendMessagePayload { chat_id, text })
            .send()
            .await
            .context("sendMessage request failed")?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            error!("Failed to send Telegram message: {}", error_text);
            anyhow::bail!("sendMessage failed: {}", error_text);
        }

        Ok(())
    }
}
