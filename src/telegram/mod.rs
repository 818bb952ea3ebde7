//! Telegram Bot API transport.
//!
//! The bot is a thin request/response shell: updates are mapped to
//! [`crate::service::NearbyService`] calls and the outcome is sent back as
//! plain text messages.

mod client;
mod handler;

use async_trait::async_trait;
use serde::Deserialize;

pub use client::TelegramClient;
pub use handler::{handle_update, replies};

/// Delivers text messages to a chat.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub first_name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}
