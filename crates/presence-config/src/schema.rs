//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub service: RawServiceConfig,

    /// Absent means confirmation checks run at any time of day
    #[serde(default)]
    pub working_hours: Option<RawWorkingHours>,

    #[serde(default)]
    pub schedule: Option<RawSchedule>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    pub log_dir: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Staff member whose session starts with the service
    pub staff_id: Option<String>,
}

/// Working-hours window, `HH:MM` on a 24-hour clock
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawWorkingHours {
    pub start: String,
    pub end: String,
}

/// Confirmation cycle tuning
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSchedule {
    /// Candidate waits between prompts, in minutes
    pub interval_minutes: Option<Vec<u64>>,

    /// How long the staff member has to approve a prompt
    pub response_window_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_schedule_section() {
        let toml_str = r#"
            config_version = 1

            [schedule]
            interval_minutes = [1, 2, 3]
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        let schedule = config.schedule.unwrap();
        assert_eq!(schedule.interval_minutes, Some(vec![1, 2, 3]));
        assert!(schedule.response_window_seconds.is_none());
    }

    #[test]
    fn parse_service_section() {
        let toml_str = r#"
            config_version = 1

            [service]
            socket_path = "/tmp/presenced.sock"
            staff_id = "anna"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.service.socket_path,
            Some(PathBuf::from("/tmp/presenced.sock"))
        );
        assert_eq!(config.service.staff_id.as_deref(), Some("anna"));
        assert!(config.working_hours.is_none());
    }
}
