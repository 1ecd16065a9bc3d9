//! Protocol types for presenced IPC
//!
//! This crate defines the stable API between presenced and its hosts:
//! - Commands (requests from clients) and responses
//! - Events (service -> clients)
//! - Read-only session snapshots
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
