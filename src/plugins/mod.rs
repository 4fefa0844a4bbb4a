//! Command handlers for cocoa-bot
//!
//! Provides the handler contract and the compiled handler kinds plugin
//! manifests can bind commands to.

pub mod trait_def;
pub mod factory;
pub mod exec;
pub mod get;
pub mod media;
pub mod menu;
pub mod reply;

pub use trait_def::{CallbackContext, CallbackInterest, CommandHandler, InboundContext};
pub use factory::{HandlerFactory, PluginEnv};

/// Cut `text` to at most `max` characters, marking the cut
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
