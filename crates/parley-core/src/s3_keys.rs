//! S3 key/path conventions.
//!
//! Pure string functions with no AWS SDK dependency. These define the
//! canonical layout of objects in the Parley bucket.

use uuid::Uuid;

pub const BOTS_PREFIX: &str = "bots/";

pub const LOGOS_PREFIX: &str = "bot-logos/";

pub fn bot(id: Uuid) -> String {
    format!("bots/{id}.json")
}

/// Key for an uploaded bot logo. `unix_millis` keeps keys roughly
/// chronological; the UUID makes them unique.
pub fn bot_logo(unix_millis: i64, id: Uuid, extension: &str) -> String {
    format!("bot-logos/{unix_millis}-{id}.{extension}")
}
