//! Shared utilities for presenced
//!
//! This crate provides:
//! - ID types (StaffId, SessionId, ClientId)
//! - Time utilities (monotonic time, wall-clock working hours)
//! - Error types
//! - Rate limiting helpers
//! - Default paths for socket, config, data, and log directories

mod error;
mod ids;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
