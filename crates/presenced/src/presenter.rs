//! Presenter that publishes prompts to IPC subscribers
//!
//! The prompt shell subscribes to events, renders `PromptRequested`, and
//! answers with the `Approve` command. Input therefore arrives as IPC
//! commands, not through [`PromptPresenter::subscribe`].

use async_trait::async_trait;
use presence_api::{Event, EventPayload, PromptResolution};
use presence_host_api::{HostEvent, HostResult, PromptPresenter, PromptRequest};
use presence_ipc::IpcServer;
use presence_util::SessionId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

pub struct IpcPresenter {
    ipc: Arc<IpcServer>,
}

impl IpcPresenter {
    pub fn new(ipc: Arc<IpcServer>) -> Self {
        Self { ipc }
    }
}

#[async_trait]
impl PromptPresenter for IpcPresenter {
    async fn present(&self, prompt: &PromptRequest) -> HostResult<()> {
        debug!(session_id = %prompt.session_id, "Publishing prompt to subscribers");
        self.ipc.broadcast_event(Event::new(EventPayload::PromptRequested {
            session_id: prompt.session_id.clone(),
            staff_id: prompt.staff_id.clone(),
            window_seconds: prompt.window_seconds,
        }));
        Ok(())
    }

    async fn update_countdown(
        &self,
        session_id: &SessionId,
        seconds_remaining: u32,
    ) -> HostResult<()> {
        self.ipc.broadcast_event(Event::new(EventPayload::CountdownTick {
            session_id: session_id.clone(),
            seconds_remaining,
        }));
        Ok(())
    }

    async fn dismiss(
        &self,
        session_id: &SessionId,
        resolution: PromptResolution,
    ) -> HostResult<()> {
        self.ipc.broadcast_event(Event::new(EventPayload::PromptResolved {
            session_id: session_id.clone(),
            resolution,
        }));
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<HostEvent>> {
        None
    }
}
