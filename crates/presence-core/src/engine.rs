//! Presence engine: owns the active session and forwards outcomes to the store

use chrono::{DateTime, Local, NaiveDate};
use presence_api::{
    ActivityKind, DailyTally, SessionEndReason, SessionStateSnapshot, ServiceStateSnapshot,
    API_VERSION,
};
use presence_config::{PresenceConfig, SchedulePolicy};
use presence_store::{AuditEvent, AuditEventType, ConfirmationOutcome, Store};
use presence_util::{MonotonicInstant, PresenceError, SessionId, StaffId, WorkingHours};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{is_within_window, CoreEvent, CycleScheduler, IntervalSource, RandomIntervals};

/// Builds the interval source for each new session
pub type IntervalSourceFactory =
    Box<dyn Fn(&SchedulePolicy) -> Box<dyn IntervalSource> + Send + Sync>;

/// The presence engine
///
/// Holds at most one session at a time. Working hours and schedule are
/// captured when a session starts; a config reload only affects the next one.
pub struct PresenceEngine {
    config: PresenceConfig,
    store: Arc<dyn Store>,
    interval_factory: IntervalSourceFactory,
    scheduler: Option<CycleScheduler>,
}

impl PresenceEngine {
    /// Create an engine that picks intervals at random
    pub fn new(config: PresenceConfig, store: Arc<dyn Store>) -> Self {
        Self::with_interval_source(
            config,
            store,
            Box::new(|policy| Box::new(RandomIntervals::new(policy.intervals.clone()))),
        )
    }

    /// Create an engine with a custom interval source, for tests and tuning
    pub fn with_interval_source(
        config: PresenceConfig,
        store: Arc<dyn Store>,
        interval_factory: IntervalSourceFactory,
    ) -> Self {
        info!(
            working_hours = ?config.working_hours.map(|h| h.to_string()),
            interval_count = config.schedule.intervals.len(),
            response_window_secs = config.schedule.response_window_secs(),
            "Presence engine initialized"
        );

        let engine = Self {
            config,
            store,
            interval_factory,
            scheduler: None,
        };
        engine.audit_config();
        engine
    }

    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }

    /// Replace the configuration. The running session keeps its settings.
    pub fn reload_config(&mut self, config: PresenceConfig) -> CoreEvent {
        self.config = config;
        self.audit_config();

        info!(
            session_active = self.scheduler.is_some(),
            "Configuration reloaded; changes apply to the next session"
        );

        CoreEvent::ConfigReloaded {
            working_hours: self.config.working_hours,
            interval_count: self.config.schedule.intervals.len(),
        }
    }

    fn audit_config(&self) {
        let _ = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ConfigLoaded {
                working_hours: self.config.working_hours.map(|h| h.to_string()),
                interval_count: self.config.schedule.intervals.len(),
            }));
    }

    pub fn has_active_session(&self) -> bool {
        self.scheduler.is_some()
    }

    pub fn current_session_id(&self) -> Option<&SessionId> {
        self.scheduler.as_ref().map(|s| s.session_id())
    }

    pub fn scheduler(&self) -> Option<&CycleScheduler> {
        self.scheduler.as_ref()
    }

    /// Start confirmation cycles for a staff member
    pub fn start_session(
        &mut self,
        staff_id: StaffId,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Result<Vec<CoreEvent>, PresenceError> {
        if let Some(active) = &self.scheduler {
            return Err(PresenceError::SessionAlreadyActive(
                active.staff_id().to_string(),
            ));
        }

        let mut scheduler = CycleScheduler::new(
            staff_id,
            self.config.working_hours,
            self.config.schedule.response_window_secs(),
            (self.interval_factory)(&self.config.schedule),
            now,
            now_mono,
        );

        let events = scheduler.start(now, now_mono);
        self.scheduler = Some(scheduler);
        self.persist(&events, now);

        Ok(events)
    }

    /// Stop the active session and cancel all of its timers
    pub fn end_session(
        &mut self,
        reason: SessionEndReason,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Result<Vec<CoreEvent>, PresenceError> {
        let mut scheduler = self
            .scheduler
            .take()
            .ok_or(PresenceError::NoActiveSession)?;

        let events = scheduler.stop(reason, now_mono);
        self.persist(&events, now);

        Ok(events)
    }

    /// Advance the active session's timers
    pub fn tick(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let events = match &mut self.scheduler {
            Some(scheduler) => scheduler.tick(now, now_mono),
            None => return Vec::new(),
        };
        self.persist(&events, now);
        events
    }

    /// Approve the visible prompt; no-op without one
    pub fn approve(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let events = match &mut self.scheduler {
            Some(scheduler) => scheduler.approve(now, now_mono),
            None => return Vec::new(),
        };
        self.persist(&events, now);
        events
    }

    pub fn record_activity(
        &mut self,
        kind: ActivityKind,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Vec<CoreEvent> {
        match &mut self.scheduler {
            Some(scheduler) => scheduler.record_activity(kind, now, now_mono),
            None => Vec::new(),
        }
    }

    pub fn session_snapshot(&self, now_mono: MonotonicInstant) -> Option<SessionStateSnapshot> {
        self.scheduler.as_ref().map(|s| s.snapshot(now_mono))
    }

    /// Working hours in force: the session's own, or the configured ones
    pub fn working_hours(&self) -> Option<WorkingHours> {
        match &self.scheduler {
            Some(scheduler) => scheduler.working_hours().copied(),
            None => self.config.working_hours,
        }
    }

    pub fn get_state(
        &self,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> ServiceStateSnapshot {
        let working_hours = self.working_hours();

        ServiceStateSnapshot {
            api_version: API_VERSION,
            config_loaded: true,
            session: self.session_snapshot(now_mono),
            working_hours,
            within_working_hours: is_within_window(&now, working_hours.as_ref()),
        }
    }

    /// Confirmed and missed prompts for a staff member on a day
    pub fn tally(&self, staff_id: &StaffId, day: NaiveDate) -> Result<DailyTally, PresenceError> {
        self.store
            .get_tally(staff_id, day)
            .map_err(|e| PresenceError::store(e.to_string()))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Forward outcomes to the store. Failures are logged, never propagated.
    fn persist(&self, events: &[CoreEvent], now: DateTime<Local>) {
        let day = now.date_naive();

        for event in events {
            let audit = match event {
                CoreEvent::SessionStarted {
                    session_id,
                    staff_id,
                } => AuditEventType::SessionStarted {
                    session_id: session_id.clone(),
                    staff_id: staff_id.clone(),
                },

                CoreEvent::PromptShown {
                    session_id,
                    window_seconds,
                    ..
                } => AuditEventType::PromptShown {
                    session_id: session_id.clone(),
                    window_seconds: *window_seconds,
                },

                CoreEvent::ConfirmationRecorded {
                    session_id,
                    staff_id,
                    response_secs,
                    ..
                } => {
                    self.record_outcome(staff_id, day, ConfirmationOutcome::Confirmed);
                    AuditEventType::ConfirmationRecorded {
                        session_id: session_id.clone(),
                        staff_id: staff_id.clone(),
                        response_secs: *response_secs,
                    }
                }

                CoreEvent::ConfirmationMissed {
                    session_id,
                    staff_id,
                    ..
                } => {
                    self.record_outcome(staff_id, day, ConfirmationOutcome::Missed);
                    AuditEventType::ConfirmationMissed {
                        session_id: session_id.clone(),
                        staff_id: staff_id.clone(),
                    }
                }

                CoreEvent::SessionEnded {
                    session_id,
                    staff_id,
                    reason,
                    confirmation_count,
                    missed_count,
                    duration,
                    ..
                } => AuditEventType::SessionEnded {
                    session_id: session_id.clone(),
                    staff_id: staff_id.clone(),
                    reason: reason.clone(),
                    confirmation_count: *confirmation_count,
                    missed_count: *missed_count,
                    duration: *duration,
                },

                _ => continue,
            };

            if let Err(e) = self.store.append_audit(AuditEvent::new(audit)) {
                warn!(error = %e, "Failed to write audit event");
            }
        }
    }

    fn record_outcome(&self, staff_id: &StaffId, day: NaiveDate, outcome: ConfirmationOutcome) {
        if let Err(e) = self.store.record_outcome(staff_id, day, outcome) {
            warn!(
                staff_id = %staff_id,
                ?outcome,
                error = %e,
                "Failed to record confirmation outcome"
            );
        }
    }
}
