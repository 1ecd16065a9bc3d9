//! Prompt presenter interface for presenced
//!
//! The core never draws anything. It asks a presenter to show or hide the
//! confirmation prompt, and the presenter feeds approvals and activity
//! pings back as [`HostEvent`]s. This crate contains no UI code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
