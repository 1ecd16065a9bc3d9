//! Configuration parsing and validation for presenced
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Optional working-hours window gating confirmation prompts
//! - Interval set and response window for the confirmation cycle
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<PresenceConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<PresenceConfig> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(PresenceConfig::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config("config_version = 1").unwrap();

        assert!(config.staff_id.is_none());
        assert!(config.working_hours.is_none());
        assert_eq!(config.schedule.response_window, Duration::from_secs(120));
        assert_eq!(config.schedule.intervals.len(), 6);
    }

    #[test]
    fn parse_full_config() {
        let config = parse_config(
            r#"
            config_version = 1

            [service]
            staff_id = "staff-42"

            [working_hours]
            start = "09:00"
            end = "17:30"

            [schedule]
            interval_minutes = [5, 10]
            response_window_seconds = 90
            "#,
        )
        .unwrap();

        assert_eq!(config.staff_id.as_ref().unwrap().as_str(), "staff-42");
        let hours = config.working_hours.unwrap();
        assert_eq!(hours.to_string(), "09:00-17:30");
        assert_eq!(
            config.schedule.intervals,
            vec![Duration::from_secs(300), Duration::from_secs(600)]
        );
        assert_eq!(config.schedule.response_window, Duration::from_secs(90));
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_inverted_working_hours() {
        let result = parse_config(
            r#"
            config_version = 1

            [working_hours]
            start = "22:00"
            end = "06:00"
            "#,
        );

        match result {
            Err(ConfigError::ValidationFailed { errors }) => {
                assert!(errors
                    .iter()
                    .any(|e| matches!(e, ValidationError::InvertedWorkingHours { .. })));
            }
            other => panic!("Expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn reject_interval_beyond_a_day() {
        let result = parse_config(
            r#"
            config_version = 1

            [schedule]
            interval_minutes = [200000000000000000]
            "#,
        );

        match result {
            Err(ConfigError::ValidationFailed { errors }) => {
                assert!(matches!(
                    errors.as_slice(),
                    [ValidationError::IntervalTooLong { index: 0, .. }]
                ));
            }
            other => panic!("Expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "config_version = 1").unwrap();
        writeln!(file, "[service]").unwrap();
        writeln!(file, "staff_id = \"anna\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.staff_id.unwrap().as_str(), "anna");
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = load_config("/nonexistent/presenced/config.toml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
