//! Client for the upstream conversational backend.

use thiserror::Error;

use parley_core::wire::ChatTurnRequest;

/// Path of the upstream's streaming chat endpoint.
pub const CHAT_PATH: &str = "/public-interface/external/chat";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("upstream returned status {status}")]
    Status { status: u16 },
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    chat_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            chat_url: format!("{}{CHAT_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Post one chat turn. A single attempt; the successful response is
    /// returned unread so its body can be streamed onwards.
    pub async fn open_chat(
        &self,
        request: &ChatTurnRequest,
    ) -> Result<reqwest::Response, UpstreamError> {
        let response = self.http.post(&self.chat_url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}
