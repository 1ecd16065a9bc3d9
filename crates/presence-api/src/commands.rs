//! Command types for the presenced protocol

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use presence_util::{ClientId, SessionId, StaffId};

use crate::{ActivityKind, ClientRole, DailyTally, HealthStatus, ServiceStateSnapshot, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    pub api_version: u32,
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub request_id: u64,
    pub api_version: u32,
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.result, ResponseResult::Ok(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    NoActiveSession,
    SessionActive,
    PermissionDenied,
    RateLimited,
    ConfigError,
    StoreError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get current service state
    GetState,

    /// Start confirmation cycles for a staff member (admin only)
    StartSession { staff_id: StaffId },

    /// End the current session (admin only)
    EndSession,

    /// Approve the visible confirmation prompt
    Approve,

    /// Report user-originated activity
    RecordActivity { kind: ActivityKind },

    /// Confirmation tally for a staff member; `day` defaults to today
    GetTally {
        staff_id: StaffId,
        day: Option<NaiveDate>,
    },

    /// Reload configuration; applies to the next session (admin only)
    ReloadConfig,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    UnsubscribeEvents,

    GetHealth,

    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(ServiceStateSnapshot),
    SessionStarted {
        session_id: SessionId,
    },
    SessionEnded {
        confirmation_count: u64,
        missed_count: u64,
    },
    /// `recorded` is false when no prompt was visible
    Approved {
        recorded: bool,
    },
    /// `rescheduled` is false when the activity was not consumed
    ActivityRecorded {
        rescheduled: bool,
    },
    Tally(DailyTally),
    ConfigReloaded,
    Subscribed {
        client_id: ClientId,
    },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}
