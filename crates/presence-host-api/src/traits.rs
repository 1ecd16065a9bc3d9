//! Presenter traits

use async_trait::async_trait;
use presence_api::{ActivityKind, PromptResolution};
use presence_util::{SessionId, StaffId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from presenter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Prompt could not be shown: {0}")]
    PresentFailed(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// What the host needs to render a confirmation prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub session_id: SessionId,
    pub staff_id: StaffId,
    pub window_seconds: u32,
    pub message: String,
}

impl PromptRequest {
    pub fn new(session_id: SessionId, staff_id: StaffId, window_seconds: u32) -> Self {
        Self {
            session_id,
            staff_id,
            window_seconds,
            message: "Are you still working? Please confirm your presence.".into(),
        }
    }
}

/// Input flowing back from the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The user pressed the approve action on the prompt
    Approved,

    /// Pointer movement, key press or click observed
    Activity { kind: ActivityKind },
}

/// Implemented by whatever shows the prompt to the staff member
#[async_trait]
pub trait PromptPresenter: Send + Sync {
    /// Show the confirmation prompt
    async fn present(&self, prompt: &PromptRequest) -> HostResult<()>;

    /// Refresh the visible countdown
    async fn update_countdown(
        &self,
        _session_id: &SessionId,
        _seconds_remaining: u32,
    ) -> HostResult<()> {
        Ok(())
    }

    /// Hide the prompt after approval, expiry or session end
    async fn dismiss(&self, session_id: &SessionId, resolution: PromptResolution)
        -> HostResult<()>;

    /// Take the inbound event stream; only the first call returns it
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<HostEvent>>;

    fn is_healthy(&self) -> bool {
        true
    }
}
