//! Human-readable output

use presence_api::{
    CycleReason, Event, EventPayload, ResponsePayload, SchedulerPhase, ServiceStateSnapshot,
};
use presence_util::{format_clock_time, format_duration};

pub fn payload(payload: &ResponsePayload) -> String {
    match payload {
        ResponsePayload::State(state) => service_state(state),
        ResponsePayload::SessionStarted { session_id } => {
            format!("Session {session_id} started")
        }
        ResponsePayload::SessionEnded {
            confirmation_count,
            missed_count,
        } => format!("Session ended: {confirmation_count} confirmed, {missed_count} missed"),
        ResponsePayload::Approved { recorded: true } => "Presence confirmed".into(),
        ResponsePayload::Approved { recorded: false } => "No prompt to approve".into(),
        ResponsePayload::ActivityRecorded { rescheduled: true } => {
            "Activity recorded, next prompt postponed".into()
        }
        ResponsePayload::ActivityRecorded { rescheduled: false } => {
            "Activity ignored".into()
        }
        ResponsePayload::Tally(tally) => {
            let ratio = tally
                .compliance_ratio()
                .map(|r| format!(" ({:.0}%)", r * 100.0))
                .unwrap_or_default();
            format!(
                "{} on {}: {} confirmed, {} missed{}",
                tally.staff_id, tally.day, tally.confirmed, tally.missed, ratio
            )
        }
        ResponsePayload::ConfigReloaded => "Configuration reloaded".into(),
        ResponsePayload::Subscribed { client_id } => format!("Subscribed as {client_id}"),
        ResponsePayload::Unsubscribed => "Unsubscribed".into(),
        ResponsePayload::Health(h) => format!(
            "live={} ready={} config={} presenter={} store={}",
            h.live, h.ready, h.config_loaded, h.presenter_ok, h.store_ok
        ),
        ResponsePayload::Pong => "pong".into(),
    }
}

fn service_state(state: &ServiceStateSnapshot) -> String {
    let hours = state
        .working_hours
        .map(|h| h.to_string())
        .unwrap_or_else(|| "always".into());
    let gate = if state.within_working_hours {
        "open"
    } else {
        "closed"
    };
    let mut lines = vec![format!("Working hours: {hours} ({gate})")];

    match &state.session {
        None => lines.push("No active session".into()),
        Some(s) => {
            lines.push(format!("Staff: {} (session {})", s.staff_id, s.session_id));
            lines.push(format!(
                "Phase: {}",
                match s.phase {
                    SchedulerPhase::Idle => "idle".to_string(),
                    SchedulerPhase::Waiting => match s.next_prompt_in {
                        Some(d) => format!("waiting, next prompt in {}", format_duration(d)),
                        None => "waiting".to_string(),
                    },
                    SchedulerPhase::PromptActive =>
                        format!("prompt visible, {}s left", s.seconds_remaining),
                    SchedulerPhase::Stopped => "stopped".to_string(),
                }
            ));
            lines.push(format!(
                "Working: {}  confirmed: {}  missed: {}",
                if s.is_working { "yes" } else { "no" },
                s.confirmation_count,
                s.missed_count
            ));
            lines.push(format!(
                "Last activity: {}",
                format_clock_time(&s.last_activity_at)
            ));
        }
    }

    lines.join("\n")
}

pub fn event(event: &Event) -> String {
    let at = format_clock_time(&event.timestamp);
    let text = match &event.payload {
        EventPayload::StateChanged(state) => match &state.session {
            Some(s) => format!(
                "state: {} confirmed, {} missed",
                s.confirmation_count, s.missed_count
            ),
            None => "state: no session".into(),
        },
        EventPayload::SessionStarted { staff_id, .. } => format!("session started for {staff_id}"),
        EventPayload::CycleScheduled {
            fires_in, reason, ..
        } => format!(
            "next prompt in {} ({})",
            format_duration(*fires_in),
            cycle_reason(reason)
        ),
        EventPayload::PromptRequested { window_seconds, .. } => {
            format!("PROMPT: confirm presence within {window_seconds}s")
        }
        EventPayload::CountdownTick {
            seconds_remaining, ..
        } => format!("{seconds_remaining}s left"),
        EventPayload::PromptResolved { resolution, .. } => {
            format!("prompt closed: {resolution:?}").to_lowercase()
        }
        EventPayload::SessionEnded {
            staff_id,
            confirmation_count,
            missed_count,
            duration,
            ..
        } => format!(
            "session for {staff_id} ended after {}: \
             {confirmation_count} confirmed, {missed_count} missed",
            format_duration(*duration)
        ),
        EventPayload::ConfigReloaded => "configuration reloaded".into(),
        EventPayload::Shutdown => "service shutting down".into(),
    };
    format!("[{at}] {text}")
}

fn cycle_reason(reason: &CycleReason) -> String {
    match reason {
        CycleReason::SessionStarted => "session started".into(),
        CycleReason::Approved => "after approval".into(),
        CycleReason::Expired => "after missed prompt".into(),
        CycleReason::OutsideWorkingHours => "outside working hours".into(),
        CycleReason::Activity { kind } => format!("{kind:?} activity").to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use presence_api::{ActivityKind, DailyTally, API_VERSION};
    use presence_util::{SessionId, StaffId};
    use std::time::Duration;

    #[test]
    fn tally_shows_ratio() {
        let tally = DailyTally {
            staff_id: StaffId::new("anna"),
            day: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            confirmed: 3,
            missed: 1,
        };
        assert_eq!(
            payload(&ResponsePayload::Tally(tally)),
            "anna on 2025-06-03: 3 confirmed, 1 missed (75%)"
        );
    }

    #[test]
    fn empty_tally_has_no_ratio() {
        let tally = DailyTally::empty(
            StaffId::new("anna"),
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
        );
        assert!(!payload(&ResponsePayload::Tally(tally)).contains('%'));
    }

    #[test]
    fn state_without_session() {
        let state = ServiceStateSnapshot {
            api_version: API_VERSION,
            config_loaded: true,
            session: None,
            working_hours: None,
            within_working_hours: true,
        };
        let text = payload(&ResponsePayload::State(state));
        assert!(text.contains("Working hours: always (open)"));
        assert!(text.contains("No active session"));
    }

    #[test]
    fn activity_reschedule_event() {
        let ev = Event::new(EventPayload::CycleScheduled {
            session_id: SessionId::new(),
            fires_in: Duration::from_secs(25 * 60),
            reason: CycleReason::Activity {
                kind: ActivityKind::Click,
            },
        });
        assert!(event(&ev).ends_with("next prompt in 25m 0s (click activity)"));
    }
}
