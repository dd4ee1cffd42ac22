use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("relay returned {status}: {message}")]
    Relay { status: u16, message: String },

    #[error("stream read failed: {0}")]
    Stream(String),

    #[error("turn task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
