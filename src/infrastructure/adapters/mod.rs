//! Platform adapters - Telegram and a stdin console for development

pub mod console;
pub mod telegram;

pub use console::ConsoleAdapter;
pub use telegram::TelegramAdapter;
