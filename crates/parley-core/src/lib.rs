//! parley-core
//!
//! Pure domain types, wire payloads, and storage key conventions.
//! No network or AWS SDK dependency: this is the shared vocabulary of the
//! relay service and the conversation client.

pub mod error;
pub mod models;
pub mod s3_keys;
pub mod wire;
