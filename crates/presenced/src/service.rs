//! Service wiring: engine, presenter, store and IPC in one event loop

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use presence_api::{
    ClientRole, Command, CycleReason, ErrorCode, ErrorInfo, Event, EventPayload, HealthStatus,
    PromptResolution, Response, ResponsePayload, SessionEndReason,
};
use presence_config::{load_config, PresenceConfig};
use presence_core::{CoreEvent, PresenceEngine};
use presence_host_api::{HostEvent, PromptPresenter, PromptRequest};
use presence_ipc::{IpcServer, ServerMessage};
use presence_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use presence_util::{ClientId, MonotonicInstant, PresenceError, RateLimiter, StaffId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::presenter::IpcPresenter;
use crate::Args;

const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Handles shared by the event loop and the command handlers
#[derive(Clone)]
pub struct Shared {
    pub engine: Arc<Mutex<PresenceEngine>>,
    pub presenter: Arc<dyn PromptPresenter>,
    pub ipc: Arc<IpcServer>,
    pub store: Arc<dyn Store>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub config_path: PathBuf,
}

/// Main service state
pub struct Service {
    shared: Shared,
    auto_start: Option<StaffId>,
}

impl Service {
    pub async fn new(args: &Args) -> Result<Self> {
        let config = if args.config.exists() {
            let config = load_config(&args.config)
                .with_context(|| format!("Failed to load config from {:?}", args.config))?;
            info!(
                config_path = %args.config.display(),
                working_hours = ?config.working_hours.map(|h| h.to_string()),
                "Configuration loaded"
            );
            config
        } else {
            warn!(
                config_path = %args.config.display(),
                "Config file not found, using defaults"
            );
            PresenceConfig::default()
        };

        let socket_path = args
            .socket
            .clone()
            .unwrap_or_else(|| config.service.socket_path.clone());

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join("presenced.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let auto_start = match &args.staff {
            Some(raw) => Some(StaffId::parse(raw).context("Invalid --staff value")?),
            None => config.staff_id.clone(),
        };

        let engine = PresenceEngine::new(config, store.clone());

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start().await?;
        let ipc = Arc::new(ipc);

        info!(socket_path = %socket_path.display(), "IPC server started");

        let presenter: Arc<dyn PromptPresenter> = Arc::new(IpcPresenter::new(ipc.clone()));

        // 30 requests per second per client
        let rate_limiter = RateLimiter::new(30, Duration::from_secs(1));

        Ok(Self {
            shared: Shared {
                engine: Arc::new(Mutex::new(engine)),
                presenter,
                ipc,
                store,
                rate_limiter: Arc::new(Mutex::new(rate_limiter)),
                config_path: args.config.clone(),
            },
            auto_start,
        })
    }

    pub async fn run(self) -> Result<()> {
        let shared = self.shared;

        let mut host_events = shared.presenter.subscribe();
        let mut ipc_messages = shared
            .ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        let ipc_accept = shared.ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        if let Some(staff_id) = self.auto_start {
            info!(staff_id = %staff_id, "Starting session for configured staff member");
            if let Err(e) = shared.start_session(staff_id).await {
                warn!(error = %e, "Could not start configured session");
            }
        }

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        let mut tick_timer = tokio::time::interval(TICK_INTERVAL);
        let mut stale_client_sweep = tokio::time::interval(Duration::from_secs(60));

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                // Drives waits and countdowns
                _ = tick_timer.tick() => {
                    let now = presence_util::now();
                    let now_mono = MonotonicInstant::now();

                    let events = shared.engine.lock().await.tick(now, now_mono);
                    shared.dispatch(events, now, now_mono).await;
                }

                _ = stale_client_sweep.tick() => {
                    shared.rate_limiter.lock().await.cleanup(Duration::from_secs(300));
                }

                Some(host_event) = next_host_event(&mut host_events) => {
                    shared.handle_host_event(host_event).await;
                }

                Some(msg) = ipc_messages.recv() => {
                    shared.handle_ipc_message(msg).await;
                }
            }
        }

        info!("Shutting down presenced");
        shared.shutdown().await;
        info!("Shutdown complete");
        Ok(())
    }
}

/// Next presenter event; never resolves for presenters without an input stream
async fn next_host_event(
    rx: &mut Option<mpsc::UnboundedReceiver<HostEvent>>,
) -> Option<HostEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl Shared {
    /// End any active session and record the stop
    pub async fn shutdown(&self) {
        let now = presence_util::now();
        let now_mono = MonotonicInstant::now();

        let ended = self
            .engine
            .lock()
            .await
            .end_session(SessionEndReason::ServiceShutdown, now, now_mono);
        if let Ok(events) = ended {
            self.dispatch(events, now, now_mono).await;
        }

        self.ipc.broadcast_event(Event::new(EventPayload::Shutdown));

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }
    }

    async fn start_session(
        &self,
        staff_id: StaffId,
    ) -> Result<presence_util::SessionId, PresenceError> {
        let now = presence_util::now();
        let now_mono = MonotonicInstant::now();

        let (events, session_id) = {
            let mut engine = self.engine.lock().await;
            let events = engine.start_session(staff_id, now, now_mono)?;
            let session_id = engine
                .current_session_id()
                .cloned()
                .ok_or(PresenceError::NoActiveSession)?;
            (events, session_id)
        };

        self.dispatch(events, now, now_mono).await;
        Ok(session_id)
    }

    /// Forward core events to the presenter and to IPC subscribers
    pub async fn dispatch(
        &self,
        events: Vec<CoreEvent>,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) {
        let mut state_changed = false;

        for event in events {
            match event {
                CoreEvent::SessionStarted {
                    session_id,
                    staff_id,
                } => {
                    self.ipc.broadcast_event(Event::new(EventPayload::SessionStarted {
                        session_id,
                        staff_id,
                    }));
                    state_changed = true;
                }

                CoreEvent::CycleArmed {
                    session_id,
                    fires_in,
                    reason,
                    ..
                } => self.broadcast_cycle(session_id, fires_in, reason),

                CoreEvent::CycleDeferred {
                    session_id,
                    fires_in,
                    ..
                } => self.broadcast_cycle(session_id, fires_in, CycleReason::OutsideWorkingHours),

                CoreEvent::CycleRescheduled {
                    session_id,
                    fires_in,
                    kind,
                    ..
                } => self.broadcast_cycle(session_id, fires_in, CycleReason::Activity { kind }),

                CoreEvent::PromptShown {
                    session_id,
                    staff_id,
                    window_seconds,
                    ..
                } => {
                    let prompt = PromptRequest::new(session_id, staff_id, window_seconds);
                    if let Err(e) = self.presenter.present(&prompt).await {
                        warn!(error = %e, "Presenter failed to show prompt");
                    }
                    state_changed = true;
                }

                CoreEvent::CountdownTicked {
                    session_id,
                    seconds_remaining,
                } => {
                    if let Err(e) = self
                        .presenter
                        .update_countdown(&session_id, seconds_remaining)
                        .await
                    {
                        debug!(error = %e, "Presenter failed to update countdown");
                    }
                }

                CoreEvent::ConfirmationRecorded { session_id, .. } => {
                    self.dismiss(&session_id, PromptResolution::Approved).await;
                    state_changed = true;
                }

                CoreEvent::ConfirmationMissed { session_id, .. } => {
                    self.dismiss(&session_id, PromptResolution::Expired).await;
                    state_changed = true;
                }

                CoreEvent::SessionEnded {
                    session_id,
                    staff_id,
                    reason,
                    confirmation_count,
                    missed_count,
                    duration,
                    prompt_cancelled,
                } => {
                    if prompt_cancelled {
                        self.dismiss(&session_id, PromptResolution::Cancelled).await;
                    }
                    self.ipc.broadcast_event(Event::new(EventPayload::SessionEnded {
                        session_id,
                        staff_id,
                        reason,
                        confirmation_count,
                        missed_count,
                        duration,
                    }));
                    state_changed = true;
                }

                CoreEvent::ConfigReloaded { .. } => {
                    self.ipc
                        .broadcast_event(Event::new(EventPayload::ConfigReloaded));
                    state_changed = true;
                }
            }
        }

        if state_changed {
            let state = self.engine.lock().await.get_state(now, now_mono);
            self.ipc
                .broadcast_event(Event::new(EventPayload::StateChanged(state)));
        }
    }

    fn broadcast_cycle(
        &self,
        session_id: presence_util::SessionId,
        fires_in: Duration,
        reason: CycleReason,
    ) {
        self.ipc.broadcast_event(Event::new(EventPayload::CycleScheduled {
            session_id,
            fires_in,
            reason,
        }));
    }

    async fn dismiss(&self, session_id: &presence_util::SessionId, resolution: PromptResolution) {
        if let Err(e) = self.presenter.dismiss(session_id, resolution).await {
            warn!(error = %e, ?resolution, "Presenter failed to dismiss prompt");
        }
    }

    pub async fn handle_host_event(&self, event: HostEvent) {
        let now = presence_util::now();
        let now_mono = MonotonicInstant::now();

        let events = {
            let mut engine = self.engine.lock().await;
            match event {
                HostEvent::Approved => engine.approve(now, now_mono),
                HostEvent::Activity { kind } => engine.record_activity(kind, now, now_mono),
            }
        };

        self.dispatch(events, now, now_mono).await;
    }

    pub async fn handle_ipc_message(&self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                {
                    let mut limiter = self.rate_limiter.lock().await;
                    if !limiter.check(&client_id) {
                        let response = Response::error(
                            request.request_id,
                            ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                        );
                        let _ = self.ipc.send_response(&client_id, response).await;
                        return;
                    }
                }

                // Unknown peers are read-only
                let role = self
                    .ipc
                    .get_client_info(&client_id)
                    .await
                    .map(|info| info.role)
                    .unwrap_or(ClientRole::Observer);

                let response = self
                    .handle_command(&client_id, role, request.request_id, request.command)
                    .await;

                let _ = self.ipc.send_response(&client_id, response).await;
            }

            ServerMessage::ClientConnected { client_id, info } => {
                info!(
                    client_id = %client_id,
                    role = ?info.role,
                    uid = ?info.uid,
                    "Client connected"
                );

                let _ = self.store.append_audit(AuditEvent::new(
                    AuditEventType::ClientConnected {
                        client_id: client_id.to_string(),
                        role: format!("{:?}", info.role),
                        uid: info.uid,
                    },
                ));
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");

                let _ = self.store.append_audit(AuditEvent::new(
                    AuditEventType::ClientDisconnected {
                        client_id: client_id.to_string(),
                    },
                ));

                self.rate_limiter.lock().await.remove_client(&client_id);
            }
        }
    }

    pub async fn handle_command(
        &self,
        client_id: &ClientId,
        role: ClientRole,
        request_id: u64,
        command: Command,
    ) -> Response {
        let now = presence_util::now();
        let now_mono = MonotonicInstant::now();

        match command {
            Command::GetState => {
                let state = self.engine.lock().await.get_state(now, now_mono);
                Response::success(request_id, ResponsePayload::State(state))
            }

            Command::StartSession { staff_id } => {
                if !role.can_manage_sessions() {
                    return permission_denied(request_id, "Admin role required");
                }

                let staff_id = match StaffId::parse(staff_id.as_str()) {
                    Ok(id) => id,
                    Err(e) => {
                        return Response::error(
                            request_id,
                            ErrorInfo::new(ErrorCode::InvalidRequest, e.to_string()),
                        );
                    }
                };

                match self.start_session(staff_id).await {
                    Ok(session_id) => Response::success(
                        request_id,
                        ResponsePayload::SessionStarted { session_id },
                    ),
                    Err(e) => error_response(request_id, e),
                }
            }

            Command::EndSession => {
                if !role.can_manage_sessions() {
                    return permission_denied(request_id, "Admin role required");
                }

                let ended = self.engine.lock().await.end_session(
                    SessionEndReason::AdminEnded,
                    now,
                    now_mono,
                );

                match ended {
                    Ok(events) => {
                        let counts = events.iter().find_map(|e| match e {
                            CoreEvent::SessionEnded {
                                confirmation_count,
                                missed_count,
                                ..
                            } => Some((*confirmation_count, *missed_count)),
                            _ => None,
                        });
                        self.dispatch(events, now, now_mono).await;

                        let (confirmation_count, missed_count) = counts.unwrap_or_default();
                        Response::success(
                            request_id,
                            ResponsePayload::SessionEnded {
                                confirmation_count,
                                missed_count,
                            },
                        )
                    }
                    Err(e) => error_response(request_id, e),
                }
            }

            Command::Approve => {
                if !role.can_approve() {
                    return permission_denied(request_id, "Shell or admin role required");
                }

                let events = self.engine.lock().await.approve(now, now_mono);
                let recorded = events
                    .iter()
                    .any(|e| matches!(e, CoreEvent::ConfirmationRecorded { .. }));
                self.dispatch(events, now, now_mono).await;

                Response::success(request_id, ResponsePayload::Approved { recorded })
            }

            Command::RecordActivity { kind } => {
                if !role.can_report_activity() {
                    return permission_denied(request_id, "Shell or admin role required");
                }

                let events = self
                    .engine
                    .lock()
                    .await
                    .record_activity(kind, now, now_mono);
                let rescheduled = !events.is_empty();
                self.dispatch(events, now, now_mono).await;

                Response::success(request_id, ResponsePayload::ActivityRecorded { rescheduled })
            }

            Command::GetTally { staff_id, day } => {
                let day = day.unwrap_or_else(|| now.date_naive());
                match self.engine.lock().await.tally(&staff_id, day) {
                    Ok(tally) => Response::success(request_id, ResponsePayload::Tally(tally)),
                    Err(e) => error_response(request_id, e),
                }
            }

            Command::ReloadConfig => {
                if !role.can_reload_config() {
                    return permission_denied(request_id, "Admin role required");
                }

                let config = match load_config(&self.config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(
                            error = %e,
                            path = %self.config_path.display(),
                            "Config reload failed"
                        );
                        return Response::error(
                            request_id,
                            ErrorInfo::new(ErrorCode::ConfigError, e.to_string()),
                        );
                    }
                };

                let event = self.engine.lock().await.reload_config(config);
                self.dispatch(vec![event], now, now_mono).await;

                Response::success(request_id, ResponsePayload::ConfigReloaded)
            }

            Command::SubscribeEvents => Response::success(
                request_id,
                ResponsePayload::Subscribed {
                    client_id: client_id.clone(),
                },
            ),

            Command::UnsubscribeEvents => {
                Response::success(request_id, ResponsePayload::Unsubscribed)
            }

            Command::GetHealth => {
                let health = HealthStatus {
                    live: true,
                    ready: true,
                    config_loaded: true,
                    presenter_ok: self.presenter.is_healthy(),
                    store_ok: self.store.is_healthy(),
                };
                Response::success(request_id, ResponsePayload::Health(health))
            }

            Command::Ping => Response::success(request_id, ResponsePayload::Pong),
        }
    }
}

fn permission_denied(request_id: u64, message: &str) -> Response {
    Response::error(
        request_id,
        ErrorInfo::new(ErrorCode::PermissionDenied, message),
    )
}

fn error_response(request_id: u64, err: PresenceError) -> Response {
    let code = match &err {
        PresenceError::NoActiveSession => ErrorCode::NoActiveSession,
        PresenceError::SessionAlreadyActive(_) => ErrorCode::SessionActive,
        PresenceError::InvalidStaffId(_) => ErrorCode::InvalidRequest,
        PresenceError::ConfigError(_) => ErrorCode::ConfigError,
        PresenceError::StoreError(_) => ErrorCode::StoreError,
        PresenceError::PermissionDenied(_) => ErrorCode::PermissionDenied,
        PresenceError::RateLimited => ErrorCode::RateLimited,
        PresenceError::IpcError(_) | PresenceError::Internal(_) => ErrorCode::InternalError,
    };
    Response::error(request_id, ErrorInfo::new(code, err.to_string()))
}
