use std::time::Duration;

use serde::{Deserialize, Serialize};

use parley_core::models::bot::Bot;

/// How a session keeps the upstream conversation going across turns.
///
/// The two strategies are different wire protocols against the same
/// upstream. A session uses exactly one for its whole lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuityStrategy {
    /// Send `conv_id` plus the full prior transcript as `chat_history`.
    /// The conversation id is learned from in-band frames.
    #[default]
    HistoryReplay,
    /// Send `conv_id` plus `token`. Both are learned from the relay's
    /// `x-conversation-id` / `x-conversation-token` response headers; in-band
    /// identifiers are ignored.
    HeaderToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Full URL of the relay's chat endpoint.
    pub relay_url: String,
    /// External identity of the bot being talked to.
    pub bot_identity: String,
    #[serde(default)]
    pub continuity: ContinuityStrategy,
    /// End a turn when no bytes arrive for this many milliseconds.
    /// Unset means a hung stream waits until cancelled.
    #[serde(default)]
    pub stream_idle_timeout_ms: Option<u64>,
}

impl SessionConfig {
    pub fn new(relay_url: impl Into<String>, bot_identity: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            bot_identity: bot_identity.into(),
            continuity: ContinuityStrategy::default(),
            stream_idle_timeout_ms: None,
        }
    }

    pub fn for_bot(relay_url: impl Into<String>, bot: &Bot) -> Self {
        Self::new(relay_url, bot.external_identity.clone())
    }

    pub fn with_continuity(mut self, continuity: ContinuityStrategy) -> Self {
        self.continuity = continuity;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_ms.map(Duration::from_millis)
    }
}
