//! Telegram channel: long-polls the Bot API for updates.
//!
//! Native Rust Telegram Bot API implementation on top of the Channel trait
//! (MessageStream, respond, send_status).

use async_trait::async_trait;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API, in characters.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel: connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
    api_base: String,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Point the channel at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    /// Fetch the bot's own username via `getMe`.
    pub async fn get_me(&self) -> anyhow::Result<String> {
        let resp = self.client.get(self.api_url("getMe")).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("Telegram getMe returned {}", resp.status());
        }
        let data: serde_json::Value = resp.json().await?;
        data.pointer("/result/username")
            .and_then(serde_json::Value::as_str)
            .map(String::from)
            .ok_or_else(|| anyhow::anyhow!("Telegram getMe response has no username"))
    }

    /// Send a text message, trying Markdown first with plain text fallback.
    /// Splits long messages that exceed Telegram's 4096 char limit; the
    /// keyboard goes with the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[String],
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let markup = (i == last).then(|| reply_markup(buttons));
            self.send_message_chunk(chat_id, chunk, markup).await?;
        }
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        markup: Option<serde_json::Value>,
    ) -> Result<(), ChannelError> {
        let mut plain_body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = markup {
            plain_body["reply_markup"] = markup;
        }
        let mut markdown_body = plain_body.clone();
        markdown_body["parse_mode"] = serde_json::json!("Markdown");

        let markdown_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&markdown_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if markdown_resp.status().is_success() {
            return Ok(());
        }

        let markdown_status = markdown_resp.status();
        tracing::warn!(
            status = ?markdown_status,
            "Telegram sendMessage with Markdown failed; retrying without parse_mode"
        );

        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (markdown: {}, plain: {})",
                    markdown_status, plain_err
                ),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        match self.get_me().await {
            Ok(username) => tracing::info!(bot = %username, "Telegram bot authenticated"),
            Err(e) => {
                return Err(ChannelError::StartupFailed {
                    name: "telegram".into(),
                    reason: e.to_string(),
                });
            }
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(serde_json::Value::as_array)
                else {
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(serde_json::Value::as_i64)
                    {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        self.send_message(chat_id, &response.content, &response.buttons)
            .await
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        if let Some(chat_id) = metadata.get("chat_id").and_then(|v| v.as_str()) {
            match status {
                StatusUpdate::Thinking(_) => {
                    // Send "typing" indicator
                    let _ = self
                        .client
                        .post(self.api_url("sendChatAction"))
                        .json(&serde_json::json!({
                            "chat_id": chat_id,
                            "action": "typing"
                        }))
                        .send()
                        .await;
                }
                StatusUpdate::Status(ref msg) if !msg.is_empty() => {
                    let _ = self
                        .send_message(chat_id, &format!("ℹ️ {msg}"), &[])
                        .await;
                }
                StatusUpdate::Status(_) => {}
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        self.get_me()
            .await
            .map(|_| ())
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Turn one `getUpdates` entry into an IncomingMessage.
///
/// Returns `None` for non-text updates and for senders not on the allowlist.
fn parse_update(update: &serde_json::Value, allowed_users: &[String]) -> Option<IncomingMessage> {
    let message = update.get("message")?;
    let text = message.get("text").and_then(serde_json::Value::as_str)?;

    let from = message.get("from");
    let username = from
        .and_then(|f| f.get("username"))
        .and_then(|u| u.as_str())
        .unwrap_or("unknown");
    let user_id_str = from
        .and_then(|f| f.get("id"))
        .and_then(serde_json::Value::as_i64)
        .map(|id| id.to_string());

    // Check allowlist against both username and numeric ID
    let mut identities = vec![username];
    if let Some(ref id) = user_id_str {
        identities.push(id.as_str());
    }
    if !check_user_allowed(allowed_users, identities.iter().copied()) {
        tracing::warn!(
            "Telegram: ignoring message from unauthorized user: \
             username={username}, user_id={}",
            user_id_str.as_deref().unwrap_or("unknown")
        );
        return None;
    }

    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(serde_json::Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default();

    let first_name = from
        .and_then(|f| f.get("first_name"))
        .and_then(|n| n.as_str());

    let incoming = IncomingMessage::new(
        "telegram",
        user_id_str.as_deref().unwrap_or(username),
        text,
    )
    .with_metadata(serde_json::json!({
        "chat_id": chat_id,
        "username": username,
    }))
    .with_user_name(first_name.unwrap_or(username));

    Some(incoming)
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// One-time reply keyboard with one button per row, or a keyboard removal
/// when there are no buttons.
fn reply_markup(buttons: &[String]) -> serde_json::Value {
    if buttons.is_empty() {
        return serde_json::json!({ "remove_keyboard": true });
    }
    let rows: Vec<serde_json::Value> = buttons
        .iter()
        .map(|b| serde_json::json!([{ "text": b }]))
        .collect();
    serde_json::json!({
        "keyboard": rows,
        "one_time_keyboard": true,
        "resize_keyboard": true,
    })
}

/// Split a message into chunks of at most `max_chars` characters.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        // Byte offset of the first char past the limit.
        let Some((limit, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
