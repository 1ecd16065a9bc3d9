//! Shared types for the presenced API

use chrono::{DateTime, Local, NaiveDate};
use presence_util::{SessionId, StaffId, WorkingHours};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Phase of the confirmation cycle for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    /// No session has been started yet
    Idle,
    /// Waiting for the next prompt
    Waiting,
    /// A prompt is visible and the countdown is running
    PromptActive,
    /// Session ended; terminal
    Stopped,
}

/// Kind of user-originated activity reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Pointer,
    Key,
    Click,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 3] = [
        ActivityKind::Pointer,
        ActivityKind::Key,
        ActivityKind::Click,
    ];
}

/// Why a wait timer was armed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleReason {
    SessionStarted,
    Approved,
    Expired,
    /// The previous wait elapsed outside working hours
    OutsideWorkingHours,
    /// Activity cancelled the pending wait
    Activity { kind: ActivityKind },
}

/// How a confirmation prompt was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptResolution {
    Approved,
    Expired,
    /// Session ended while the prompt was visible
    Cancelled,
}

/// Session end reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEndReason {
    /// The staff member signed out
    SignedOut,
    /// An admin client ended the session
    AdminEnded,
    /// The service is shutting down
    ServiceShutdown,
}

/// Read-only view of the session state exposed to hosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStateSnapshot {
    pub session_id: SessionId,
    pub staff_id: StaffId,
    pub phase: SchedulerPhase,
    pub is_working: bool,
    pub prompt_visible: bool,
    /// Only meaningful while `prompt_visible` is true
    pub seconds_remaining: u32,
    pub last_activity_at: DateTime<Local>,
    pub confirmation_count: u64,
    pub missed_count: u64,
    pub started_at: DateTime<Local>,
    /// Time until the pending wait fires, if one is armed
    pub next_prompt_in: Option<Duration>,
}

/// Confirmation outcomes for one staff member on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTally {
    pub staff_id: StaffId,
    pub day: NaiveDate,
    pub confirmed: u64,
    pub missed: u64,
}

impl DailyTally {
    pub fn empty(staff_id: StaffId, day: NaiveDate) -> Self {
        Self {
            staff_id,
            day,
            confirmed: 0,
            missed: 0,
        }
    }

    /// Share of prompts that were confirmed, if any were shown
    pub fn compliance_ratio(&self) -> Option<f64> {
        let total = self.confirmed + self.missed;
        if total == 0 {
            None
        } else {
            Some(self.confirmed as f64 / total as f64)
        }
    }
}

/// Full service state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStateSnapshot {
    pub api_version: u32,
    pub config_loaded: bool,
    pub session: Option<SessionStateSnapshot>,
    pub working_hours: Option<WorkingHours>,
    pub within_working_hours: bool,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Portal UI - can approve prompts and report activity
    Shell,
    /// Local admin - can also start/end sessions and reload config
    Admin,
    /// Read-only observer
    Observer,
}

impl ClientRole {
    pub fn can_approve(&self) -> bool {
        matches!(self, ClientRole::Shell | ClientRole::Admin)
    }

    pub fn can_report_activity(&self) -> bool {
        matches!(self, ClientRole::Shell | ClientRole::Admin)
    }

    pub fn can_manage_sessions(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }

    pub fn can_reload_config(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub config_loaded: bool,
    pub presenter_ok: bool,
    pub store_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_serializes_snake_case() {
        let json = serde_json::to_string(&SchedulerPhase::PromptActive).unwrap();
        assert_eq!(json, "\"prompt_active\"");
    }

    #[test]
    fn cycle_reason_carries_activity_kind() {
        let reason = CycleReason::Activity {
            kind: ActivityKind::Key,
        };
        let json = serde_json::to_string(&reason).unwrap();
        assert!(json.contains("activity"));
        assert!(json.contains("key"));
    }

    #[test]
    fn tally_compliance_ratio() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let mut tally = DailyTally::empty(StaffId::new("anna"), day);
        assert_eq!(tally.compliance_ratio(), None);

        tally.confirmed = 3;
        tally.missed = 1;
        assert_eq!(tally.compliance_ratio(), Some(0.75));
    }

    #[test]
    fn observer_is_read_only() {
        let role = ClientRole::Observer;
        assert!(!role.can_approve());
        assert!(!role.can_report_activity());
        assert!(!role.can_manage_sessions());
        assert!(ClientRole::Shell.can_approve());
        assert!(!ClientRole::Shell.can_manage_sessions());
        assert!(ClientRole::Admin.can_reload_config());
    }
}
