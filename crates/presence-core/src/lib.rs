//! Confirmation cycle scheduler and presence engine for presenced
//!
//! This crate is the heart of presenced, containing:
//! - The working-hours gate
//! - Randomized interval selection behind an injectable source
//! - The bounded confirmation countdown
//! - The cycle state machine (Idle -> Waiting -> PromptActive -> Waiting ... -> Stopped)
//! - The engine that owns at most one session and forwards outcomes to the store
//!
//! Nothing here sleeps or spawns. Every operation takes the current wall-clock
//! and monotonic time and returns the events it produced.

mod countdown;
mod engine;
mod events;
mod gate;
mod interval;
mod scheduler;
mod state;
mod timer;

pub use countdown::*;
pub use engine::*;
pub use events::*;
pub use gate::*;
pub use interval::*;
pub use scheduler::*;
pub use state::*;
pub use timer::*;
