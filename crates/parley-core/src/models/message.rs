use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One entry in a conversation transcript.
///
/// The bot placeholder for the turn in flight is a `Message` with
/// [`Role::Bot`] whose `content` grows as frames arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: jiff::Timestamp,
}

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            created_at: jiff::Timestamp::now(),
        }
    }

    /// An empty bot message, filled in by the stream that follows.
    pub fn bot_placeholder() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Bot,
            content: String::new(),
            created_at: jiff::Timestamp::now(),
        }
    }

    pub fn is_empty_placeholder(&self) -> bool {
        self.role == Role::Bot && self.content.is_empty()
    }
}
