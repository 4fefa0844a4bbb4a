//! Application services - Orchestration around the dispatcher

pub mod media;
pub mod runtime;

pub use media::send_media;
pub use runtime::{BotRuntime, Shutdown};
