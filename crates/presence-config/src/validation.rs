//! Configuration validation

use crate::schema::{RawConfig, RawSchedule, RawWorkingHours};
use crate::MAX_INTERVAL_MINUTES;
use presence_util::WallClock;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid time format for {field} '{value}': {message}")]
    InvalidTimeFormat {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error(
        "Working hours end {end} is before start {start}; \
         windows past midnight are not supported and would never open"
    )]
    InvertedWorkingHours { start: String, end: String },

    #[error("Schedule interval list is empty")]
    EmptyIntervals,

    #[error("Schedule interval at position {index} is zero minutes")]
    ZeroInterval { index: usize },

    #[error("Schedule interval at position {index} is {minutes} minutes; the limit is {max}")]
    IntervalTooLong { index: usize, minutes: u64, max: u64 },

    #[error("Response window must be at least one second")]
    ZeroResponseWindow,

    #[error("staff_id cannot be blank")]
    BlankStaffId,
}

/// Validate a raw configuration, collecting every problem
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(staff_id) = &config.service.staff_id
        && staff_id.trim().is_empty()
    {
        errors.push(ValidationError::BlankStaffId);
    }

    if let Some(hours) = &config.working_hours {
        errors.extend(validate_working_hours(hours));
    }

    if let Some(schedule) = &config.schedule {
        errors.extend(validate_schedule(schedule));
    }

    errors
}

fn validate_working_hours(hours: &RawWorkingHours) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let start =
        WallClock::parse(&hours.start).map_err(|message| ValidationError::InvalidTimeFormat {
            field: "working_hours.start",
            value: hours.start.clone(),
            message,
        });
    let end = WallClock::parse(&hours.end).map_err(|message| ValidationError::InvalidTimeFormat {
        field: "working_hours.end",
        value: hours.end.clone(),
        message,
    });

    match (start, end) {
        (Ok(start), Ok(end)) => {
            if end < start {
                errors.push(ValidationError::InvertedWorkingHours {
                    start: hours.start.clone(),
                    end: hours.end.clone(),
                });
            }
        }
        (start, end) => {
            errors.extend(start.err());
            errors.extend(end.err());
        }
    }

    errors
}

fn validate_schedule(schedule: &RawSchedule) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(intervals) = &schedule.interval_minutes {
        if intervals.is_empty() {
            errors.push(ValidationError::EmptyIntervals);
        }
        for (index, minutes) in intervals.iter().enumerate() {
            if *minutes == 0 {
                errors.push(ValidationError::ZeroInterval { index });
            } else if *minutes > MAX_INTERVAL_MINUTES {
                errors.push(ValidationError::IntervalTooLong {
                    index,
                    minutes: *minutes,
                    max: MAX_INTERVAL_MINUTES,
                });
            }
        }
    }

    if schedule.response_window_seconds == Some(0) {
        errors.push(ValidationError::ZeroResponseWindow);
    }

    errors
}
