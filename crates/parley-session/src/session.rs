//! The conversation controller.
//!
//! A [`ConversationSession`] owns the authoritative transcript for one chat
//! view. All state lives in a single register behind a mutex and every
//! transition is applied synchronously under that lock, so a read made
//! right after [`ConversationSession::submit`] returns already sees the new
//! turn.
//!
//! Each turn's stream is consumed by a spawned task. The register carries a
//! generation counter that is bumped by `submit`, `cancel` and `clear`; a
//! consumption task captures the generation it was started under and drops
//! every write once the register has moved past it. This is what keeps a
//! cancelled or cleared stream from writing late frames into the
//! transcript.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use parley_core::models::message::Message;
use parley_core::wire::{ChatTurnRequest, HistoryEntry, SseFrame};

use crate::config::{ContinuityStrategy, SessionConfig};
use crate::error::SessionError;
use crate::frame::FrameParser;
use crate::transport::{ByteStream, HttpRelayTransport, RelayStream, RelayTransport};

/// Shown in place of the bot reply when a turn fails.
pub const FAILURE_TEXT: &str = "Sorry, something went wrong. Please try again.";

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The stream ended, either with a `stream_end` frame or by closing.
    Completed,
    /// Stopped by `cancel` or `clear`. Partial content is kept.
    Cancelled,
    /// The relay request or the stream failed. The reply now reads
    /// [`FAILURE_TEXT`].
    Failed,
    /// No bytes arrived within the configured idle timeout. Handled like a
    /// cancellation: partial content is kept.
    TimedOut,
}

/// Point-in-time copy of the session register.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub streaming: bool,
    pub conversation_id: Option<String>,
    pub continuity_token: Option<String>,
}

#[derive(Default)]
struct SessionState {
    messages: Vec<Message>,
    conversation_id: Option<String>,
    continuity_token: Option<String>,
    active: Option<ActiveTurn>,
    generation: u64,
    /// Bot replies showing [`FAILURE_TEXT`]. They are local notices, not
    /// something the bot said, and stay out of the replayed history.
    failed: HashSet<Uuid>,
}

struct ActiveTurn {
    cancel: CancellationToken,
}

/// What a consumption task needs to know about its own turn.
struct TurnContext {
    generation: u64,
    placeholder: Uuid,
    cancel: CancellationToken,
}

enum FrameEffect {
    Continue,
    End,
    Stale,
}

impl SessionState {
    fn placeholder_mut(&mut self, id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().rev().find(|m| m.id == id)
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            streaming: self.active.is_some(),
            conversation_id: self.conversation_id.clone(),
            continuity_token: self.continuity_token.clone(),
        }
    }
}

struct Shared {
    config: SessionConfig,
    transport: Arc<dyn RelayTransport>,
    state: Mutex<SessionState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Record identifiers from the relay's response headers. Only the
    /// header-token strategy reads them, and an identifier already held is
    /// never replaced.
    fn apply_headers(&self, turn: &TurnContext, stream: &RelayStream) -> bool {
        if self.config.continuity != ContinuityStrategy::HeaderToken {
            return true;
        }

        let mut state = self.state.lock();
        if state.generation != turn.generation {
            return false;
        }
        let mut changed = false;
        if state.conversation_id.is_none() && stream.conversation_id.is_some() {
            state.conversation_id = stream.conversation_id.clone();
            changed = true;
        }
        if state.continuity_token.is_none() && stream.token.is_some() {
            state.continuity_token = stream.token.clone();
            changed = true;
        }
        drop(state);

        if changed {
            tracing::debug!("continuity identifiers taken from response headers");
            self.notify();
        }
        true
    }

    fn apply_frame(&self, turn: &TurnContext, frame: &SseFrame) -> FrameEffect {
        let mut state = self.state.lock();
        if state.generation != turn.generation {
            return FrameEffect::Stale;
        }

        if self.config.continuity == ContinuityStrategy::HistoryReplay
            && let Some(id) = frame.conversation_id()
            && state.conversation_id.as_deref() != Some(id)
        {
            tracing::debug!(conversation_id = id, "conversation id received");
            state.conversation_id = Some(id.to_string());
        }

        if let Some(delta) = frame.delta()
            && let Some(message) = state.placeholder_mut(turn.placeholder)
        {
            message.content.push_str(delta);
        }
        drop(state);

        self.notify();
        if frame.stream_end {
            FrameEffect::End
        } else {
            FrameEffect::Continue
        }
    }

    /// Close out a turn. A no-op when `cancel` or `clear` already did.
    fn finish(&self, turn: &TurnContext, outcome: TurnOutcome) {
        let mut state = self.state.lock();
        if state.generation != turn.generation {
            return;
        }
        if outcome == TurnOutcome::Failed
            && let Some(message) = state.placeholder_mut(turn.placeholder)
        {
            message.content = FAILURE_TEXT.to_string();
            state.failed.insert(turn.placeholder);
        }
        state.active = None;
        drop(state);

        self.notify();
    }
}

/// Handle on a submitted turn. Dropping it does not stop the turn.
pub struct TurnHandle {
    generation: u64,
    join: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the turn to reach a terminal state.
    pub async fn wait(self) -> Result<TurnOutcome, SessionError> {
        Ok(self.join.await?)
    }
}

/// Streaming conversation with one bot.
///
/// Cloning yields another handle onto the same conversation.
#[derive(Clone)]
pub struct ConversationSession {
    shared: Arc<Shared>,
}

impl ConversationSession {
    pub fn new(config: SessionConfig, transport: Arc<dyn RelayTransport>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                config,
                transport,
                state: Mutex::new(SessionState::default()),
                revision,
            }),
        }
    }

    /// A session talking to the relay at `config.relay_url` over HTTP.
    pub fn connect(config: SessionConfig) -> Self {
        let transport = HttpRelayTransport::new(config.relay_url.clone());
        Self::new(config, Arc::new(transport))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Start a turn.
    ///
    /// Returns `None` without touching anything when `text` is blank or a
    /// turn is already in flight. Otherwise the user message and an empty
    /// bot placeholder are in the transcript and `streaming` is set by the
    /// time this returns; the relay exchange runs on a spawned task, so this
    /// must be called from within a Tokio runtime.
    pub fn submit(&self, text: &str) -> Option<TurnHandle> {
        if text.trim().is_empty() {
            return None;
        }

        let (turn, request) = {
            let mut state = self.shared.state.lock();
            if state.active.is_some() {
                tracing::debug!("turn already in flight, dropping submission");
                return None;
            }

            let placeholder = Message::bot_placeholder();
            let placeholder_id = placeholder.id;
            state.messages.push(Message::user(text));
            state.messages.push(placeholder);

            state.generation += 1;
            let cancel = CancellationToken::new();
            state.active = Some(ActiveTurn {
                cancel: cancel.clone(),
            });

            let request = self.build_request(&state, text);
            let turn = TurnContext {
                generation: state.generation,
                placeholder: placeholder_id,
                cancel,
            };
            (turn, request)
        };
        self.shared.notify();

        let generation = turn.generation;
        tracing::info!(generation, "turn submitted");

        let shared = Arc::clone(&self.shared);
        let join = tokio::spawn(
            run_turn(shared, turn, request)
                .instrument(tracing::info_span!("turn", generation)),
        );
        Some(TurnHandle { generation, join })
    }

    /// Derive the outgoing request from the register as it stands after the
    /// new turn was appended. The replayed history is everything before the
    /// new user message, minus bot replies that never received content or
    /// that show the failure notice.
    fn build_request(&self, state: &SessionState, text: &str) -> ChatTurnRequest {
        let config = &self.shared.config;
        let mut request = ChatTurnRequest::new(config.bot_identity.clone(), text);
        request.conv_id = state.conversation_id.clone();

        match config.continuity {
            ContinuityStrategy::HistoryReplay => {
                let prior = &state.messages[..state.messages.len().saturating_sub(2)];
                let history = prior
                    .iter()
                    .filter(|m| !m.is_empty_placeholder() && !state.failed.contains(&m.id))
                    .map(HistoryEntry::from)
                    .collect();
                request.chat_history = Some(history);
            }
            ContinuityStrategy::HeaderToken => {
                request.token = state.continuity_token.clone();
            }
        }

        request
    }

    /// Stop the turn in flight, keeping whatever content already arrived.
    /// Returns `false` when there was nothing to cancel.
    pub fn cancel(&self) -> bool {
        let cancelled = {
            let mut state = self.shared.state.lock();
            match state.active.take() {
                Some(active) => {
                    state.generation += 1;
                    active.cancel.cancel();
                    true
                }
                None => false,
            }
        };

        if cancelled {
            tracing::info!("turn cancelled");
            self.shared.notify();
        }
        cancelled
    }

    /// Forget the whole conversation, including continuity identifiers.
    /// A turn in flight is cancelled and its late frames are discarded.
    pub fn clear(&self) {
        {
            let mut state = self.shared.state.lock();
            if let Some(active) = state.active.take() {
                active.cancel.cancel();
            }
            state.generation += 1;
            state.messages.clear();
            state.failed.clear();
            state.conversation_id = None;
            state.continuity_token = None;
        }
        tracing::info!("conversation cleared");
        self.shared.notify();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.lock().snapshot()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.state.lock().messages.clone()
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.state.lock().active.is_some()
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.shared.state.lock().conversation_id.clone()
    }

    pub fn continuity_token(&self) -> Option<String> {
        self.shared.state.lock().continuity_token.clone()
    }

    /// A receiver that ticks on every state change. Pair it with
    /// [`snapshot`](Self::snapshot) to render.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }
}

async fn run_turn(shared: Arc<Shared>, turn: TurnContext, request: ChatTurnRequest) -> TurnOutcome {
    let outcome = consume(&shared, &turn, request).await;
    shared.finish(&turn, outcome);
    tracing::info!(?outcome, "turn finished");
    outcome
}

async fn consume(shared: &Shared, turn: &TurnContext, request: ChatTurnRequest) -> TurnOutcome {
    let opened = tokio::select! {
        biased;
        _ = turn.cancel.cancelled() => return TurnOutcome::Cancelled,
        opened = shared.transport.open(request) => opened,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(error = %e, "relay request failed");
            return TurnOutcome::Failed;
        }
    };

    if !shared.apply_headers(turn, &stream) {
        return TurnOutcome::Cancelled;
    }

    let idle_timeout = shared.config.stream_idle_timeout();
    let mut parser = FrameParser::new();
    let mut received = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = turn.cancel.cancelled() => return TurnOutcome::Cancelled,
            next = next_chunk(&mut stream.body, idle_timeout) => next,
        };

        let chunk = match next {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => {
                tracing::warn!(error = %e, received, "stream failed");
                return TurnOutcome::Failed;
            }
            Ok(None) => {
                let outcome = match parser.finish() {
                    Some(frame) => match shared.apply_frame(turn, &frame) {
                        FrameEffect::Stale => TurnOutcome::Cancelled,
                        FrameEffect::Continue | FrameEffect::End => TurnOutcome::Completed,
                    },
                    None => TurnOutcome::Completed,
                };
                tracing::debug!(received, skipped = parser.skipped(), "stream closed");
                return outcome;
            }
            Err(_) => {
                tracing::warn!(received, "stream idle timeout");
                return TurnOutcome::TimedOut;
            }
        };

        received += chunk.len();
        for frame in parser.push(&chunk) {
            match shared.apply_frame(turn, &frame) {
                FrameEffect::Continue => {}
                FrameEffect::End => {
                    tracing::debug!(received, skipped = parser.skipped(), "stream end frame");
                    return TurnOutcome::Completed;
                }
                FrameEffect::Stale => return TurnOutcome::Cancelled,
            }
        }
    }
}

async fn next_chunk(
    body: &mut ByteStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<Result<bytes::Bytes, SessionError>>, tokio::time::error::Elapsed> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, body.next()).await,
        None => Ok(body.next().await),
    }
}
