use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::theme::Theme;

const DEFAULT_GREETING_TAIL: &str = "How can I help you today?";

/// A registered bot: a named proxy identity against the upstream backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub id: Uuid,
    pub name: String,
    /// Routing key the upstream backend knows this bot by.
    #[serde(rename = "bot_uuid")]
    pub external_identity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub theme: Theme,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

/// Payload for registering a bot. Everything is optional on the wire so
/// that missing fields surface as validation errors rather than parse
/// failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBot {
    pub name: Option<String>,
    pub bot_uuid: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub theme: Option<Theme>,
}

/// Partial update. Only the fields present are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotPatch {
    pub name: Option<String>,
    pub bot_uuid: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub theme: Option<Theme>,
}

impl Bot {
    /// Build a new bot record from a creation payload.
    pub fn create(input: NewBot) -> Result<Self, CoreError> {
        let name = non_empty(input.name).ok_or_else(|| CoreError::MissingField("name".into()))?;
        let external_identity = non_empty(input.bot_uuid)
            .ok_or_else(|| CoreError::MissingField("bot_uuid".into()))?;
        let theme = input.theme.unwrap_or_default();
        theme.validate()?;

        let now = jiff::Timestamp::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            external_identity,
            description: input.description.unwrap_or_default(),
            logo_url: input.logo_url.unwrap_or_default(),
            theme,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update and bump `updated_at`. Nothing changes when
    /// the patch is rejected.
    pub fn apply(&mut self, patch: BotPatch) -> Result<(), CoreError> {
        if let Some(theme) = &patch.theme {
            theme.validate()?;
        }
        if patch.name.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(CoreError::MissingField("name".into()));
        }
        if patch.bot_uuid.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(CoreError::MissingField("bot_uuid".into()));
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(bot_uuid) = patch.bot_uuid {
            self.external_identity = bot_uuid;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(logo_url) = patch.logo_url {
            self.logo_url = logo_url;
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        self.updated_at = jiff::Timestamp::now();
        Ok(())
    }

    /// Display-only opening line shown above a fresh conversation.
    pub fn greeting(&self) -> String {
        let tail = if self.description.trim().is_empty() {
            DEFAULT_GREETING_TAIL
        } else {
            self.description.as_str()
        };
        format!("Hi! I'm {}. {tail}", self.name)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
