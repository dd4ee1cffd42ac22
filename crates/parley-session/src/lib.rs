//! parley-session
//!
//! Client side of a Parley conversation: turns user submissions into
//! incrementally streamed bot replies read from the chat relay.

pub mod config;
pub mod error;
pub mod frame;
pub mod session;
pub mod transport;

pub use config::{ContinuityStrategy, SessionConfig};
pub use session::{ConversationSession, SessionSnapshot, TurnHandle, TurnOutcome, FAILURE_TEXT};
