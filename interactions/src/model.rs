//! Wire types for interaction requests and responses.

use mintgate_types::UserId;
use serde::{Deserialize, Serialize};

pub const PING: u8 = 1;
pub const APPLICATION_COMMAND: u8 = 2;

const PONG: u8 = 1;
const CHANNEL_MESSAGE: u8 = 4;
const DEFERRED_CHANNEL_MESSAGE: u8 = 5;

/// Message flag: only the invoking user sees the reply.
pub const EPHEMERAL: u64 = 1 << 6;

#[derive(Clone, Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Present for guild invocations.
    #[serde(default)]
    pub member: Option<Member>,
    /// Present for DM invocations.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub data: Option<CommandData>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Member {
    pub user: User,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

impl Interaction {
    /// The invoking user, whether in a guild or a DM.
    pub fn invoker(&self) -> Option<UserId> {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
            .map(|u| UserId::new(u.id.clone()))
    }

    pub fn in_guild(&self) -> bool {
        self.guild_id.is_some() || self.member.is_some()
    }

    pub fn command_name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.name.as_str())
    }

    pub fn string_option(&self, name: &str) -> Option<&str> {
        self.data
            .as_ref()?
            .options
            .iter()
            .find(|o| o.name == name)?
            .value
            .as_ref()?
            .as_str()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub flags: u64,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: PONG,
            data: None,
        }
    }

    /// "Bot is thinking"; the reply is edited later.
    pub fn deferred(ephemeral: bool) -> Self {
        Self {
            kind: DEFERRED_CHANNEL_MESSAGE,
            data: Some(ResponseData {
                content: None,
                flags: if ephemeral { EPHEMERAL } else { 0 },
            }),
        }
    }

    pub fn ephemeral_message(content: impl Into<String>) -> Self {
        Self {
            kind: CHANNEL_MESSAGE,
            data: Some(ResponseData {
                content: Some(content.into()),
                flags: EPHEMERAL,
            }),
        }
    }
}
