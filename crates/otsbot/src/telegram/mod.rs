//! Telegram bot integration and handlers

pub mod bot;
pub mod checkout;
pub mod directory;
pub mod handlers;
pub mod keyboards;
pub mod markdown;
pub mod messages;
pub mod notifier;

pub use bot::{create_bot, setup_bot_commands};
pub use directory::TelegramDirectory;
pub use handlers::{schema, HandlerDeps};
pub use notifier::Notifier;
