pub mod assets;
pub mod bots;
pub mod chat;
pub mod health;
pub mod uploads;
