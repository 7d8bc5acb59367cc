//! Telegram bot front-end

pub mod api;
pub mod handler;
pub mod render;
pub mod types;

pub use api::TelegramApi;
pub use handler::TelegramBot;
pub use types::Update;
