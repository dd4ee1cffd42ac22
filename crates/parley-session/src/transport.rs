//! How a session reaches the chat relay.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use serde::Deserialize;

use parley_core::wire::{ChatTurnRequest, CONVERSATION_ID_HEADER, CONVERSATION_TOKEN_HEADER};

use crate::error::SessionError;

pub type ByteStream = BoxStream<'static, Result<Bytes, SessionError>>;

/// An opened relay response: continuity headers plus the raw event stream.
///
/// Dropping it releases the underlying connection.
pub struct RelayStream {
    pub conversation_id: Option<String>,
    pub token: Option<String>,
    pub body: ByteStream,
}

impl RelayStream {
    pub fn new(body: ByteStream) -> Self {
        Self {
            conversation_id: None,
            token: None,
            body,
        }
    }
}

#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Send one chat turn and return the response stream. Non-success
    /// statuses are errors; no retries are made.
    async fn open(&self, request: ChatTurnRequest) -> Result<RelayStream, SessionError>;
}

/// Talks to the relay over HTTP.
#[derive(Clone)]
pub struct HttpRelayTransport {
    client: reqwest::Client,
    url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpRelayTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn open(&self, request: ChatTurnRequest) -> Result<RelayStream, SessionError> {
        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(SessionError::Relay {
                status: status.as_u16(),
                message,
            });
        }

        let conversation_id = header_value(response.headers(), CONVERSATION_ID_HEADER);
        let token = header_value(response.headers(), CONVERSATION_TOKEN_HEADER);
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| SessionError::Stream(e.to_string())))
            .boxed();

        Ok(RelayStream {
            conversation_id,
            token,
            body,
        })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
