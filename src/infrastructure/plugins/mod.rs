//! Plugin system for cocoa-bot
//!
//! Plugins are YAML manifests in the plugin directory. Each one binds a set
//! of commands to a compiled handler kind; editing a file swaps in a freshly
//! built registry without restarting the process.

pub mod loader;
pub mod manifest;
pub mod registry;
pub mod watcher;


pub use loader::PluginLoader;
pub use manifest::HandlerSpec;
pub use registry::{Generation, PluginRegistry};
pub use watcher::{FileWatcher, WatchAction};
