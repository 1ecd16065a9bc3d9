//! Event types for presenced -> client streaming

use chrono::{DateTime, Local};
use presence_util::{SessionId, StaffId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CycleReason, PromptResolution, ServiceStateSnapshot, SessionEndReason, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: presence_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full state snapshot (sent on subscribe and major changes)
    StateChanged(ServiceStateSnapshot),

    SessionStarted {
        session_id: SessionId,
        staff_id: StaffId,
    },

    /// A new wait was armed
    CycleScheduled {
        session_id: SessionId,
        fires_in: Duration,
        reason: CycleReason,
    },

    /// The host must show the confirmation prompt
    PromptRequested {
        session_id: SessionId,
        staff_id: StaffId,
        window_seconds: u32,
    },

    /// Countdown progress while the prompt is visible
    CountdownTick {
        session_id: SessionId,
        seconds_remaining: u32,
    },

    /// The host must hide the confirmation prompt; a StateChanged with the
    /// updated counters follows
    PromptResolved {
        session_id: SessionId,
        resolution: PromptResolution,
    },

    SessionEnded {
        session_id: SessionId,
        staff_id: StaffId,
        reason: SessionEndReason,
        confirmation_count: u64,
        missed_count: u64,
        duration: Duration,
    },

    ConfigReloaded,

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_requested_wire_format() {
        let event = Event::new(EventPayload::PromptRequested {
            session_id: SessionId::new(),
            staff_id: StaffId::new("anna"),
            window_seconds: 120,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"prompt_requested\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_version, API_VERSION);
        match parsed.payload {
            EventPayload::PromptRequested { window_seconds, .. } => assert_eq!(window_seconds, 120),
            other => panic!("Expected PromptRequested, got {:?}", other),
        }
    }

    #[test]
    fn prompt_resolved_wire_format() {
        let event = Event::new(EventPayload::PromptResolved {
            session_id: SessionId::new(),
            resolution: PromptResolution::Expired,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"prompt_resolved\""));
        assert!(json.contains("\"resolution\":\"expired\""));
    }
}
