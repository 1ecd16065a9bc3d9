//! Core events emitted by the scheduler and engine

use presence_api::{ActivityKind, CycleReason, SessionEndReason};
use presence_util::{SessionId, StaffId, WorkingHours};
use std::time::Duration;

use crate::TimerId;

/// Events emitted by the core
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    SessionStarted {
        session_id: SessionId,
        staff_id: StaffId,
    },

    /// A wait was armed after session start, approval or expiry
    CycleArmed {
        session_id: SessionId,
        timer_id: TimerId,
        fires_in: Duration,
        reason: CycleReason,
    },

    /// The wait elapsed outside working hours; a fresh one was armed
    CycleDeferred {
        session_id: SessionId,
        timer_id: TimerId,
        fires_in: Duration,
    },

    /// Activity cancelled the pending wait and armed a new one
    CycleRescheduled {
        session_id: SessionId,
        cancelled: TimerId,
        timer_id: TimerId,
        fires_in: Duration,
        kind: ActivityKind,
    },

    PromptShown {
        session_id: SessionId,
        staff_id: StaffId,
        timer_id: TimerId,
        window_seconds: u32,
    },

    CountdownTicked {
        session_id: SessionId,
        seconds_remaining: u32,
    },

    ConfirmationRecorded {
        session_id: SessionId,
        staff_id: StaffId,
        response_secs: u32,
        confirmation_count: u64,
    },

    ConfirmationMissed {
        session_id: SessionId,
        staff_id: StaffId,
        missed_count: u64,
    },

    SessionEnded {
        session_id: SessionId,
        staff_id: StaffId,
        reason: SessionEndReason,
        confirmation_count: u64,
        missed_count: u64,
        duration: Duration,
        /// A prompt was still visible and has been withdrawn
        prompt_cancelled: bool,
    },

    /// Configuration replaced; applies from the next session
    ConfigReloaded {
        working_hours: Option<WorkingHours>,
        interval_count: usize,
    },
}
