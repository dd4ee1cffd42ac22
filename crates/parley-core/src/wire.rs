//! Wire payloads shared by the relay service and the conversation client.
//!
//! Field names follow the upstream backend's JSON protocol, which is why
//! they are terser than the domain names (`bot_id`, `conv_id`).

use serde::{Deserialize, Serialize};

use crate::models::message::{Message, Role};

/// Response header carrying the upstream conversation id.
pub const CONVERSATION_ID_HEADER: &str = "x-conversation-id";

/// Response header carrying the upstream continuity token.
pub const CONVERSATION_TOKEN_HEADER: &str = "x-conversation-token";

/// One chat turn as posted to the relay and forwarded upstream.
///
/// `bot_id` and `query` are required; they are optional here so the relay
/// can report their absence as a validation error with its own body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conv_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<HistoryEntry>>,
}

impl ChatTurnRequest {
    pub fn new(bot_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            bot_id: Some(bot_id.into()),
            query: Some(query.into()),
            ..Self::default()
        }
    }

    /// Both mandatory fields, if present and non-blank.
    pub fn required_fields(&self) -> Option<(&str, &str)> {
        let bot_id = self.bot_id.as_deref().filter(|s| !s.trim().is_empty())?;
        let query = self.query.as_deref().filter(|s| !s.trim().is_empty())?;
        Some((bot_id, query))
    }

    /// True when the request carries both a token and a replayed history,
    /// i.e. mixes the two continuity strategies.
    pub fn mixes_continuity(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty()) && self.chat_history.is_some()
    }
}

/// A replayed message in the upstream's history format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    User,
    Assistant,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::User => HistoryRole::User,
            Role::Bot => HistoryRole::Assistant,
        };
        Self {
            role,
            content: message.content.clone(),
        }
    }
}

/// JSON payload of one `data:` line in the upstream event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_false",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub stream_end: bool,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl SseFrame {
    /// Non-empty content delta, if any.
    pub fn delta(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref().filter(|c| !c.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}
