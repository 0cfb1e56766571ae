//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChannelError;

/// A message received from a user on some channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Name of the channel it arrived on.
    pub channel: String,
    /// Channel-specific sender id. Numeric for every channel this bot runs.
    pub user_id: String,
    pub user_name: Option<String>,
    pub content: String,
    pub received_at: DateTime<Utc>,
    /// Channel routing data (e.g. Telegram `chat_id`).
    pub metadata: serde_json::Value,
}

impl IncomingMessage {
    pub fn new(
        channel: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id: user_id.into(),
            user_name: None,
            content: content.into(),
            received_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    /// The sender as a bot user id, if it is numeric.
    pub fn numeric_user_id(&self) -> Option<i64> {
        self.user_id.trim().parse().ok()
    }
}

/// A reply to send back on the channel a message came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    /// Quick-reply buttons. Empty means any previous keyboard is removed.
    pub buttons: Vec<String>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<String>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Transient progress shown while a reply is being computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Work in progress (Telegram shows "typing").
    Thinking(String),
    /// Informational notice.
    Status(String),
}

pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A transport the bot talks to users through.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a reply for `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    /// Show a status indicator. Channels without one ignore it.
    async fn send_status(
        &self,
        _status: StatusUpdate,
        _metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_user_id_parses_telegram_ids() {
        let msg = IncomingMessage::new("telegram", "123456789", "hi");
        assert_eq!(msg.numeric_user_id(), Some(123456789));

        let msg = IncomingMessage::new("telegram", "alice", "hi");
        assert_eq!(msg.numeric_user_id(), None);
    }

    #[test]
    fn builders_set_fields() {
        let msg = IncomingMessage::new("cli", "1", "/start")
            .with_user_name("Анна")
            .with_metadata(serde_json::json!({ "chat_id": "1" }));
        assert_eq!(msg.user_name.as_deref(), Some("Анна"));
        assert_eq!(msg.metadata["chat_id"], "1");
        assert_eq!(msg.channel, "cli");

        let resp = OutgoingResponse::text("ok").with_buttons(vec!["a".into()]);
        assert_eq!(resp.content, "ok");
        assert_eq!(resp.buttons, vec!["a"]);
    }
}
