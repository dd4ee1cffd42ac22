//! In-process relay transport driven by the test.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::channel::mpsc;
use futures::StreamExt;
use parking_lot::Mutex;

use parley_core::wire::ChatTurnRequest;
use parley_session::error::SessionError;
use parley_session::transport::{RelayStream, RelayTransport};
use parley_session::{ConversationSession, SessionConfig, SessionSnapshot};

type Chunk = Result<Bytes, SessionError>;

struct PendingStream {
    conversation_id: Option<String>,
    token: Option<String>,
    body: mpsc::UnboundedReceiver<Chunk>,
}

/// Each `open` call consumes the next stream queued with [`expect_stream`].
/// With nothing queued, `open` fails as if the relay answered 503.
#[derive(Default)]
pub struct ScriptedTransport {
    pending: Mutex<VecDeque<PendingStream>>,
    requests: Mutex<Vec<ChatTurnRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn expect_stream(&self) -> Feed {
        self.expect_stream_with_headers(None, None)
    }

    pub fn expect_stream_with_headers(&self, conversation_id: Option<&str>, token: Option<&str>) -> Feed {
        let (tx, rx) = mpsc::unbounded();
        self.pending.lock().push_back(PendingStream {
            conversation_id: conversation_id.map(str::to_string),
            token: token.map(str::to_string),
            body: rx,
        });
        Feed { tx }
    }

    pub fn requests(&self) -> Vec<ChatTurnRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RelayTransport for ScriptedTransport {
    async fn open(&self, request: ChatTurnRequest) -> Result<RelayStream, SessionError> {
        self.requests.lock().push(request);
        let pending = self.pending.lock().pop_front().ok_or(SessionError::Relay {
            status: 503,
            message: "upstream unavailable".to_string(),
        })?;
        Ok(RelayStream {
            conversation_id: pending.conversation_id,
            token: pending.token,
            body: pending.body.boxed(),
        })
    }
}

/// Write side of a scripted response stream. Dropping it ends the stream.
pub struct Feed {
    tx: mpsc::UnboundedSender<Chunk>,
}

impl Feed {
    /// Push raw bytes. Sends into a stream the session already dropped are
    /// ignored.
    pub fn raw(&self, text: &str) {
        let _ = self.tx.unbounded_send(Ok(Bytes::copy_from_slice(text.as_bytes())));
    }

    pub fn bytes(&self, bytes: &[u8]) {
        let _ = self.tx.unbounded_send(Ok(Bytes::copy_from_slice(bytes)));
    }

    /// Push one complete `data:` line carrying a content delta.
    pub fn delta(&self, text: &str) {
        let payload = serde_json::json!({ "message": text });
        self.raw(&format!("data: {payload}\n\n"));
    }

    pub fn fail(&self) {
        let _ = self
            .tx
            .unbounded_send(Err(SessionError::Stream("connection reset".to_string())));
    }
}

pub fn config() -> SessionConfig {
    SessionConfig::new("http://relay.test/api/chat", "ext-bot")
}

/// Wait until `check` holds for the session's state.
pub async fn wait_until(session: &ConversationSession, check: impl Fn(&SessionSnapshot) -> bool) {
    let mut revisions = session.subscribe();
    let wait = async {
        loop {
            if check(&session.snapshot()) {
                return;
            }
            if revisions.changed().await.is_err() {
                return;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("session never reached the expected state");
}

pub fn bot_content(snapshot: &SessionSnapshot) -> &str {
    snapshot
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}
