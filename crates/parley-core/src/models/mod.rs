pub mod bot;
pub mod message;
pub mod theme;
