//! Mock presenter for testing

use async_trait::async_trait;
use presence_api::{ActivityKind, PromptResolution};
use presence_util::SessionId;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::{HostError, HostEvent, HostResult, PromptPresenter, PromptRequest};

/// One call made against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterCall {
    Presented(PromptRequest),
    Countdown { seconds_remaining: u32 },
    Dismissed(PromptResolution),
}

/// Presenter that records calls and lets tests inject user input
pub struct MockPresenter {
    calls: Arc<Mutex<Vec<PresenterCall>>>,
    visible: Arc<Mutex<Option<PromptRequest>>>,
    event_tx: mpsc::UnboundedSender<HostEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>,

    /// Configure present() to fail
    pub fail_present: Arc<Mutex<bool>>,
}

impl MockPresenter {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            visible: Arc::new(Mutex::new(None)),
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
            fail_present: Arc::new(Mutex::new(false)),
        }
    }

    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// The prompt currently on screen, if any
    pub fn visible_prompt(&self) -> Option<PromptRequest> {
        self.visible.lock().ok().and_then(|v| v.clone())
    }

    pub fn presented_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, PresenterCall::Presented(_)))
            .count()
    }

    /// Simulate the user pressing approve
    pub fn simulate_approve(&self) {
        let _ = self.event_tx.send(HostEvent::Approved);
    }

    /// Simulate a pointer/key/click event
    pub fn simulate_activity(&self, kind: ActivityKind) {
        let _ = self.event_tx.send(HostEvent::Activity { kind });
    }

    fn record(&self, call: PresenterCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Default for MockPresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PromptPresenter for MockPresenter {
    async fn present(&self, prompt: &PromptRequest) -> HostResult<()> {
        if self.fail_present.lock().map(|f| *f).unwrap_or(false) {
            return Err(HostError::PresentFailed("Mock present failure".into()));
        }

        self.record(PresenterCall::Presented(prompt.clone()));
        if let Ok(mut visible) = self.visible.lock() {
            *visible = Some(prompt.clone());
        }
        Ok(())
    }

    async fn update_countdown(
        &self,
        _session_id: &SessionId,
        seconds_remaining: u32,
    ) -> HostResult<()> {
        self.record(PresenterCall::Countdown { seconds_remaining });
        Ok(())
    }

    async fn dismiss(
        &self,
        _session_id: &SessionId,
        resolution: PromptResolution,
    ) -> HostResult<()> {
        self.record(PresenterCall::Dismissed(resolution));
        if let Ok(mut visible) = self.visible.lock() {
            *visible = None;
        }
        Ok(())
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<HostEvent>> {
        self.event_rx.lock().ok().and_then(|mut rx| rx.take())
    }
}
