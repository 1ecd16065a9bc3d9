//! Per-session mutable state

use chrono::{DateTime, Local};
use presence_api::{SchedulerPhase, SessionStateSnapshot};
use presence_util::{MonotonicInstant, SessionId, StaffId};
use std::time::Duration;

/// The record the scheduler keeps for one staff session.
///
/// Only the scheduler mutates it. Hosts see it through
/// [`SessionState::snapshot`].
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: SessionId,
    pub staff_id: StaffId,

    /// False after a missed confirmation, true again after an approval
    pub is_working: bool,
    pub prompt_visible: bool,
    pub seconds_remaining: u32,
    pub last_activity_at: DateTime<Local>,
    pub confirmation_count: u64,
    pub missed_count: u64,

    pub started_at: DateTime<Local>,
    pub started_at_mono: MonotonicInstant,
}

impl SessionState {
    pub fn new(
        session_id: SessionId,
        staff_id: StaffId,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Self {
        Self {
            session_id,
            staff_id,
            is_working: true,
            prompt_visible: false,
            seconds_remaining: 0,
            last_activity_at: now,
            confirmation_count: 0,
            missed_count: 0,
            started_at: now,
            started_at_mono: now_mono,
        }
    }

    pub fn duration(&self, now_mono: MonotonicInstant) -> Duration {
        now_mono.duration_since(self.started_at_mono)
    }

    pub fn snapshot(
        &self,
        phase: SchedulerPhase,
        next_prompt_in: Option<Duration>,
    ) -> SessionStateSnapshot {
        SessionStateSnapshot {
            session_id: self.session_id.clone(),
            staff_id: self.staff_id.clone(),
            phase,
            is_working: self.is_working,
            prompt_visible: self.prompt_visible,
            seconds_remaining: if self.prompt_visible {
                self.seconds_remaining
            } else {
                0
            },
            last_activity_at: self.last_activity_at,
            confirmation_count: self.confirmation_count,
            missed_count: self.missed_count,
            started_at: self.started_at,
            next_prompt_in,
        }
    }
}
