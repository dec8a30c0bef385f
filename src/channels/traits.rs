use crate::error::TransportError;
use async_trait::async_trait;

/// An inbound chat message.
///
/// `author` identifies the user; `channel_id` the channel the message was
/// posted in.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub channel_id: String,
    pub author: String,
    pub text: String,
}

/// Outbound half of a chat transport.
///
/// Implementations must be callable from spawned fetch-completion tasks,
/// hence `Send + Sync`.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Emit a message into the given channel.
    async fn notify(&self, channel_id: &str, text: &str) -> Result<(), TransportError>;
}
