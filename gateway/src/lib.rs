//! Chat-platform side effects: roles, direct messages, interaction replies.
//!
//! Pure I/O with no decisions. [`RoleGateway`] acts on guild members;
//! [`Responder`] answers one specific command invocation.

pub mod discord;
pub mod error;
pub mod webhook;

use std::fmt;

use async_trait::async_trait;
use mintgate_types::UserId;
use serde::{Deserialize, Serialize};

pub use discord::DiscordGateway;
pub use error::GatewayError;
pub use webhook::WebhookResponder;

/// A text channel (guild channel or DM channel).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait RoleGateway: Send + Sync {
    /// Give the community role to `user`.
    async fn grant_role(&self, user: &UserId) -> Result<(), GatewayError>;

    /// Take the community role away from `user`.
    async fn remove_role(&self, user: &UserId) -> Result<(), GatewayError>;

    /// Open (or reuse) the DM channel with `user`.
    async fn open_direct_channel(&self, user: &UserId) -> Result<ChannelId, GatewayError>;

    /// Post plain text to a channel.
    async fn send_channel_message(
        &self,
        channel: &ChannelId,
        text: &str,
    ) -> Result<(), GatewayError>;

    /// DM `user`. Callers treat failures here as advisory.
    async fn send_direct_message(&self, user: &UserId, text: &str) -> Result<(), GatewayError> {
        let channel = self.open_direct_channel(user).await?;
        self.send_channel_message(&channel, text).await
    }
}

/// Replies to a single deferred command invocation.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Replace the deferred "thinking" placeholder.
    async fn edit_original(&self, text: &str) -> Result<(), GatewayError>;

    /// Post an additional message after the original.
    async fn follow_up(&self, text: &str) -> Result<(), GatewayError>;
}
