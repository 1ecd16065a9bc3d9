//! Time utilities for presenced
//!
//! Provides both monotonic time (for cycle waits and the confirmation
//! countdown) and wall-clock time (for the working-hours window).
//!
//! # Mock Time for Development
//!
//! In debug builds, the `PRESENCE_MOCK_TIME` environment variable overrides
//! the wall clock for every working-hours decision. The mocked clock keeps
//! advancing at the real rate from the given starting point.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! ```bash
//! PRESENCE_MOCK_TIME="2025-12-25 07:55:00" presenced --staff anna
//! ```

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "PRESENCE_MOCK_TIME";

const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // wraps Local::now()
fn mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let raw = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            match parse_mock_time(&raw) {
                Some(mock_dt) => {
                    let offset = mock_dt.signed_duration_since(chrono::Local::now());
                    tracing::info!(
                        mock_time = %raw,
                        offset_secs = offset.num_seconds(),
                        "Mock time enabled"
                    );
                    Some(offset)
                }
                None => {
                    tracing::warn!(
                        mock_time = %raw,
                        expected_format = MOCK_TIME_FORMAT,
                        "Ignoring invalid mock time"
                    );
                    None
                }
            }
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

fn parse_mock_time(raw: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(raw, MOCK_TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).single()
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    mock_time_offset().is_some()
}

/// Current local time, respecting `PRESENCE_MOCK_TIME` in debug builds.
#[allow(clippy::disallowed_methods)] // the one sanctioned Local::now() call site
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();
    match mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Format a DateTime as `HH:MM`.
pub fn format_clock_time(dt: &DateTime<Local>) -> String {
    dt.format("%H:%M").to_string()
}

/// Format a DateTime with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format(MOCK_TIME_FORMAT).to_string()
}

/// A point in monotonic time, immune to wall-clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicInstant(Instant);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    /// Duration since `earlier`, zero if `earlier` is in the future
    pub fn duration_since(&self, earlier: MonotonicInstant) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }

    pub fn checked_add(&self, duration: Duration) -> Option<MonotonicInstant> {
        self.0.checked_add(duration).map(MonotonicInstant)
    }

    /// Returns duration until `self`, or zero if `self` is in the past
    pub fn saturating_duration_until(&self, from: MonotonicInstant) -> Duration {
        self.0.saturating_duration_since(from.0)
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0 + rhs)
    }
}

/// Wall-clock time of day at minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Parse a 24-hour `HH:MM` string
    pub fn parse(s: &str) -> Result<Self, String> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .filter(|(h, m)| is_two_digits(h) && is_two_digits(m))
            .ok_or_else(|| "Expected HH:MM format".to_string())?;

        let hour: u8 = hour.parse().map_err(|_| "Invalid hour".to_string())?;
        let minute: u8 = minute.parse().map_err(|_| "Invalid minute".to_string())?;

        if hour >= 24 {
            return Err("Hour must be 0-23".into());
        }
        if minute >= 60 {
            return Err("Minute must be 0-59".into());
        }

        Ok(Self { hour, minute })
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn of(dt: &DateTime<Local>) -> Self {
        Self::from_naive_time(dt.time())
    }

    pub fn minutes_from_midnight(&self) -> u16 {
        (self.hour as u16) * 60 + self.minute as u16
    }
}

fn is_two_digits(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.minutes_from_midnight()
            .cmp(&other.minutes_from_midnight())
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Daily window during which confirmation checks are active.
///
/// Both ends are inclusive at minute resolution. Windows that wrap past
/// midnight are not supported: an inverted window (`end < start`) never
/// contains any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: WallClock,
    pub end: WallClock,
}

impl WorkingHours {
    pub fn new(start: WallClock, end: WallClock) -> Self {
        Self { start, end }
    }

    /// Parse a pair of `HH:MM` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, String> {
        Ok(Self {
            start: WallClock::parse(start)?,
            end: WallClock::parse(end)?,
        })
    }

    /// True when `end` precedes `start`; such a window never opens.
    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    /// Check whether the given local time falls inside the window
    pub fn contains(&self, dt: &DateTime<Local>) -> bool {
        if self.is_inverted() {
            return false;
        }
        let time = WallClock::of(dt);
        time >= self.start && time <= self.end
    }
}

impl fmt::Display for WorkingHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Format a duration in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn at(hour: u32, minute: u32, second: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2025, 3, 12, hour, minute, second)
            .unwrap()
    }

    #[test]
    fn test_wall_clock_parse() {
        assert_eq!(WallClock::parse("09:05").unwrap(), WallClock::new(9, 5).unwrap());
        assert_eq!(WallClock::parse("23:59").unwrap(), WallClock::new(23, 59).unwrap());
        assert_eq!(WallClock::parse("00:00").unwrap(), WallClock::new(0, 0).unwrap());

        assert!(WallClock::parse("7:30").is_err());
        assert!(WallClock::parse("9:5").is_err());
        assert!(WallClock::parse("09:5").is_err());
        assert!(WallClock::parse("+9:00").is_err());
        assert!(WallClock::parse("009:00").is_err());
        assert!(WallClock::parse("24:00").is_err());
        assert!(WallClock::parse("12:60").is_err());
        assert!(WallClock::parse("noon").is_err());
        assert!(WallClock::parse("").is_err());
    }

    #[test]
    fn test_wall_clock_ordering_and_display() {
        let morning = WallClock::new(8, 0).unwrap();
        let evening = WallClock::new(18, 30).unwrap();
        assert!(morning < evening);
        assert_eq!(morning.to_string(), "08:00");
    }

    #[test]
    fn test_working_hours_inclusive_bounds() {
        let hours = WorkingHours::parse("09:00", "17:00").unwrap();

        assert!(hours.contains(&at(9, 0, 0)));
        assert!(hours.contains(&at(17, 0, 0)));
        assert!(hours.contains(&at(17, 0, 59)));
        assert!(hours.contains(&at(12, 30, 0)));

        assert!(!hours.contains(&at(8, 59, 59)));
        assert!(!hours.contains(&at(17, 1, 0)));
    }

    #[test]
    fn test_inverted_window_never_contains() {
        let hours = WorkingHours::parse("22:00", "06:00").unwrap();
        assert!(hours.is_inverted());

        assert!(!hours.contains(&at(23, 0, 0)));
        assert!(!hours.contains(&at(3, 0, 0)));
        assert!(!hours.contains(&at(12, 0, 0)));
    }

    #[test]
    fn test_single_minute_window() {
        let hours = WorkingHours::parse("12:00", "12:00").unwrap();
        assert!(!hours.is_inverted());
        assert!(hours.contains(&at(12, 0, 30)));
        assert!(!hours.contains(&at(12, 1, 0)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_monotonic_instant_arithmetic() {
        let t1 = MonotonicInstant::now();
        let t2 = t1 + Duration::from_secs(5);

        assert!(t2 > t1);
        assert_eq!(t2.duration_since(t1), Duration::from_secs(5));
        assert_eq!(t1.duration_since(t2), Duration::ZERO);
        assert_eq!(t2.saturating_duration_until(t1), Duration::from_secs(5));
        assert_eq!(t1.saturating_duration_until(t2), Duration::ZERO);
    }

    #[test]
    fn test_format_clock_time() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_clock_time(&dt), "14:30");
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_parse_mock_time() {
        assert!(parse_mock_time("2025-12-25 14:30:00").is_some());
        assert!(parse_mock_time("2025-12-25T14:30:00").is_none());
        assert!(parse_mock_time("14:30:00").is_none());
        assert!(parse_mock_time("").is_none());
    }

    #[test]
    fn test_now_returns_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }
}
