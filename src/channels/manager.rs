//! ChannelManager: starts every channel and routes replies back.

use futures::stream::select_all;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;

/// Owns all configured channels.
#[derive(Default)]
pub struct ChannelManager {
    channels: Vec<Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: Box<dyn Channel>) {
        tracing::debug!(channel = channel.name(), "Channel registered");
        self.channels.push(channel);
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    fn get(&self, name: &str) -> Result<&dyn Channel, ChannelError> {
        self.channels
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
            .ok_or_else(|| ChannelError::UnknownChannel(name.to_string()))
    }

    /// Start every channel and merge their streams.
    ///
    /// A channel that fails to start is logged and skipped; it is an error
    /// only if none start.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::new();
        for channel in &self.channels {
            match channel.start().await {
                Ok(stream) => {
                    tracing::info!(channel = channel.name(), "Channel started");
                    streams.push(stream);
                }
                Err(e) => {
                    tracing::error!(channel = channel.name(), error = %e, "Channel failed to start");
                }
            }
        }

        if streams.is_empty() {
            return Err(ChannelError::StartupFailed {
                name: "all".into(),
                reason: "no channel could be started".into(),
            });
        }

        Ok(Box::pin(select_all(streams)))
    }

    /// Reply on the channel the message came from.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.get(&msg.channel)?.respond(msg, response).await
    }

    pub async fn send_status(
        &self,
        channel: &str,
        status: StatusUpdate,
        metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        self.get(channel)?.send_status(status, metadata).await
    }

    pub async fn shutdown_all(&self) -> Result<(), ChannelError> {
        for channel in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = channel.name(), error = %e, "Channel shutdown failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use futures::StreamExt;

    /// Channel fed from a vector, recording everything sent to it.
    pub(crate) struct ScriptedChannel {
        pub name: String,
        pub inbox: Mutex<Vec<IncomingMessage>>,
        pub sent: std::sync::Arc<Mutex<Vec<(String, OutgoingResponse)>>>,
    }

    impl ScriptedChannel {
        pub(crate) fn new(name: &str, inbox: Vec<IncomingMessage>) -> Self {
            Self {
                name: name.to_string(),
                inbox: Mutex::new(inbox),
                sent: Default::default(),
            }
        }
    }

    #[async_trait]
    impl Channel for ScriptedChannel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let messages = std::mem::take(&mut *self.inbox.lock().unwrap());
            Ok(Box::pin(futures::stream::iter(messages)))
        }

        async fn respond(
            &self,
            msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push((msg.user_id.clone(), response));
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn start_all_merges_streams() {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(ScriptedChannel::new(
            "a",
            vec![IncomingMessage::new("a", "1", "x")],
        )));
        manager.add(Box::new(ScriptedChannel::new(
            "b",
            vec![
                IncomingMessage::new("b", "2", "y"),
                IncomingMessage::new("b", "2", "z"),
            ],
        )));

        let stream = manager.start_all().await.unwrap();
        let all: Vec<IncomingMessage> = stream.collect().await;
        assert_eq!(all.len(), 3);
        assert_eq!(manager.names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn respond_routes_by_channel_name() {
        let channel = ScriptedChannel::new("a", vec![]);
        let sent = channel.sent.clone();
        let mut manager = ChannelManager::new();
        manager.add(Box::new(channel));

        let msg = IncomingMessage::new("a", "7", "hi");
        manager
            .respond(&msg, OutgoingResponse::text("hello"))
            .await
            .unwrap();
        assert_eq!(sent.lock().unwrap()[0].1.content, "hello");

        let stray = IncomingMessage::new("nope", "7", "hi");
        let err = manager
            .respond(&stray, OutgoingResponse::text("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::UnknownChannel(name) if name == "nope"));
    }

    #[tokio::test]
    async fn start_all_with_no_channels_fails() {
        let manager = ChannelManager::new();
        assert!(manager.start_all().await.is_err());
    }
}
