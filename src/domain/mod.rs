//! Domain layer - Core business objects and platform abstractions
//!
//! This layer contains:
//! - Entities: Chats, users, inbound events, command specs
//! - Traits: Abstractions for the messaging platform (Bot, UpdateSource)

pub mod entities;
pub mod traits;
