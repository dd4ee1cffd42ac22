//! parley-storage
//!
//! S3 operations plus the two storage seams the relay depends on: the bot
//! directory and the asset store. Each seam has an S3 implementation and an
//! in-memory one for tests and storage-less development.

pub mod assets;
pub mod client;
pub mod directory;
pub mod error;
pub mod objects;
