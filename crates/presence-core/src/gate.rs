//! Working-hours gate

use chrono::{DateTime, Local};
use presence_util::WorkingHours;
use tracing::warn;

/// Whether confirmation checks are active at `now`.
///
/// No window means checks are always active. A window whose end lies before
/// its start never passes; rollover past midnight is not supported.
pub fn is_within_window(now: &DateTime<Local>, window: Option<&WorkingHours>) -> bool {
    let Some(window) = window else {
        return true;
    };

    if window.is_inverted() {
        warn!(
            start = %window.start,
            end = %window.end,
            "Working hours end before they start; confirmation checks are disabled"
        );
        return false;
    }

    window.contains(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 12, hour, minute, 30).unwrap()
    }

    #[test]
    fn absent_window_always_passes() {
        assert!(is_within_window(&at(3, 0), None));
        assert!(is_within_window(&at(23, 59), None));
    }

    #[test]
    fn office_hours_are_inclusive_on_both_ends() {
        let hours = WorkingHours::parse("09:00", "17:00").unwrap();

        assert!(is_within_window(&at(9, 0), Some(&hours)));
        assert!(is_within_window(&at(17, 0), Some(&hours)));
        assert!(is_within_window(&at(12, 30), Some(&hours)));
        assert!(!is_within_window(&at(8, 59), Some(&hours)));
        assert!(!is_within_window(&at(17, 1), Some(&hours)));
    }

    #[test]
    fn inverted_window_never_passes() {
        let hours = WorkingHours::parse("22:00", "06:00").unwrap();

        assert!(!is_within_window(&at(23, 0), Some(&hours)));
        assert!(!is_within_window(&at(3, 0), Some(&hours)));
        assert!(!is_within_window(&at(12, 0), Some(&hours)));
    }
}
