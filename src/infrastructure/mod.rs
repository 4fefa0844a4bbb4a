//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Plugins: Plugin files, the registry and the file watcher
//! - Adapters: Platform integrations (Telegram, console)

pub mod adapters;
pub mod config;
pub mod plugins;
