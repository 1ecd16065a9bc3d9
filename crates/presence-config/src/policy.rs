//! Validated configuration structures

use crate::schema::{RawConfig, RawSchedule, RawServiceConfig};
use presence_util::{
    default_data_dir, default_log_dir, default_socket_path, StaffId, WorkingHours,
};
use std::path::PathBuf;
use std::time::Duration;

/// Default candidate waits between prompts, in minutes
pub const DEFAULT_INTERVAL_MINUTES: [u64; 6] = [10, 15, 25, 40, 60, 120];

/// Longest accepted wait between prompts, in minutes
pub const MAX_INTERVAL_MINUTES: u64 = 24 * 60;

/// Default time a staff member has to approve a prompt
pub const DEFAULT_RESPONSE_WINDOW_SECS: u64 = 120;

/// Validated configuration ready for use by the engine
#[derive(Debug, Clone, Default)]
pub struct PresenceConfig {
    pub service: ServiceConfig,

    /// Session started automatically when the service comes up
    pub staff_id: Option<StaffId>,

    /// None disables gating entirely
    pub working_hours: Option<WorkingHours>,

    pub schedule: SchedulePolicy,
}

impl PresenceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let working_hours = raw
            .working_hours
            .and_then(|h| WorkingHours::parse(&h.start, &h.end).ok());

        let staff_id = raw
            .service
            .staff_id
            .as_deref()
            .and_then(|id| StaffId::parse(id).ok());

        Self {
            service: ServiceConfig::from_raw(raw.service),
            staff_id,
            working_hours,
            schedule: raw
                .schedule
                .map(SchedulePolicy::from_raw)
                .unwrap_or_default(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub log_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(default_socket_path),
            log_dir: raw.log_dir.unwrap_or_else(default_log_dir),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            log_dir: default_log_dir(),
            data_dir: default_data_dir(),
        }
    }
}

/// Confirmation cycle tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Candidate waits; one is picked uniformly per cycle
    pub intervals: Vec<Duration>,
    pub response_window: Duration,
}

impl SchedulePolicy {
    fn from_raw(raw: RawSchedule) -> Self {
        let defaults = Self::default();
        Self {
            intervals: raw
                .interval_minutes
                .map(|m| m.into_iter().map(minutes).collect())
                .unwrap_or(defaults.intervals),
            response_window: raw
                .response_window_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.response_window),
        }
    }

    /// Response window in whole seconds, as shown by the countdown
    pub fn response_window_secs(&self) -> u32 {
        self.response_window.as_secs().min(u32::MAX as u64) as u32
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            intervals: DEFAULT_INTERVAL_MINUTES.into_iter().map(minutes).collect(),
            response_window: Duration::from_secs(DEFAULT_RESPONSE_WINDOW_SECS),
        }
    }
}

fn minutes(m: u64) -> Duration {
    m.checked_mul(60)
        .map(Duration::from_secs)
        .unwrap_or(Duration::MAX)
}
