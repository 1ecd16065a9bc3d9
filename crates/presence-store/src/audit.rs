//! Audit event types

use chrono::{DateTime, Local};
use presence_api::SessionEndReason;
use presence_util::{SessionId, StaffId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    ServiceStarted,

    ServiceStopped,

    /// Configuration loaded or reloaded
    ConfigLoaded {
        working_hours: Option<String>,
        interval_count: usize,
    },

    SessionStarted {
        session_id: SessionId,
        staff_id: StaffId,
    },

    PromptShown {
        session_id: SessionId,
        window_seconds: u32,
    },

    ConfirmationRecorded {
        session_id: SessionId,
        staff_id: StaffId,
        /// Seconds between prompt and approval
        response_secs: u32,
    },

    ConfirmationMissed {
        session_id: SessionId,
        staff_id: StaffId,
    },

    SessionEnded {
        session_id: SessionId,
        staff_id: StaffId,
        reason: SessionEndReason,
        confirmation_count: u64,
        missed_count: u64,
        duration: Duration,
    },

    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Row id, assigned by the store
    pub id: i64,
    pub timestamp: DateTime<Local>,
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0,
            timestamp: presence_util::now(),
            event,
        }
    }
}
