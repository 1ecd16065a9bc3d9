//! Error types for presenced

use thiserror::Error;

/// Core error type for presenced operations
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Session already active for staff member {0}")]
    SessionAlreadyActive(String),

    #[error("Invalid staff id: {0}")]
    InvalidStaffId(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PresenceError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::IpcError(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PresenceError>;
