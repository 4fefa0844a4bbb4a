//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: Connector, plugin, handler and config errors
//! - Messaging: Command parsing, dispatching, loading indicators
//! - Services: Media helper and the update loop

pub mod errors;
pub mod messaging;
pub mod services;
