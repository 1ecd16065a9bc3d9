//! Confirmation cycle state machine

use chrono::{DateTime, Local};
use presence_api::{
    ActivityKind, CycleReason, SchedulerPhase, SessionEndReason, SessionStateSnapshot,
};
use presence_util::{MonotonicInstant, SessionId, StaffId, WorkingHours};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    is_within_window, ConfirmationCountdown, CoreEvent, CountdownStep, IntervalSource,
    ScheduledCycle, SessionState, TimerArena, TimerId, WaitTimer,
};

/// Drives the repeating wait -> prompt -> countdown cycle for one session.
///
/// Owns every timer it creates. Once stopped it stays stopped; a new session
/// needs a new scheduler.
pub struct CycleScheduler {
    phase: SchedulerPhase,
    state: SessionState,
    cycle: ScheduledCycle,
    timers: TimerArena,
    intervals: Box<dyn IntervalSource>,
    working_hours: Option<WorkingHours>,
    response_window_secs: u32,

    /// Activity kinds that may still trigger a reschedule this cycle
    armed_listeners: HashSet<ActivityKind>,
}

impl CycleScheduler {
    pub fn new(
        staff_id: StaffId,
        working_hours: Option<WorkingHours>,
        response_window_secs: u32,
        intervals: Box<dyn IntervalSource>,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Self {
        Self {
            phase: SchedulerPhase::Idle,
            state: SessionState::new(SessionId::new(), staff_id, now, now_mono),
            cycle: ScheduledCycle::default(),
            timers: TimerArena::default(),
            intervals,
            working_hours,
            response_window_secs,
            armed_listeners: HashSet::new(),
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session_id(&self) -> &SessionId {
        &self.state.session_id
    }

    pub fn staff_id(&self) -> &StaffId {
        &self.state.staff_id
    }

    pub fn working_hours(&self) -> Option<&WorkingHours> {
        self.working_hours.as_ref()
    }

    pub fn live_timers(&self) -> Vec<TimerId> {
        self.cycle.live_timers()
    }

    pub fn is_timer_live(&self, id: TimerId) -> bool {
        self.cycle.is_live(id)
    }

    /// Activity kinds that would currently be consumed
    pub fn armed_listeners(&self) -> Vec<ActivityKind> {
        ActivityKind::ALL
            .into_iter()
            .filter(|k| self.armed_listeners.contains(k))
            .collect()
    }

    /// Time until the pending wait fires
    pub fn next_prompt_in(&self, now_mono: MonotonicInstant) -> Option<Duration> {
        self.cycle.wait().map(|w| w.remaining(now_mono))
    }

    pub fn snapshot(&self, now_mono: MonotonicInstant) -> SessionStateSnapshot {
        self.state.snapshot(self.phase, self.next_prompt_in(now_mono))
    }

    /// Begin the first cycle. Only valid from `Idle`.
    pub fn start(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        if self.phase != SchedulerPhase::Idle {
            debug!(phase = ?self.phase, "Ignoring start on a scheduler that already ran");
            return Vec::new();
        }

        info!(
            session_id = %self.state.session_id,
            staff_id = %self.state.staff_id,
            within_hours = is_within_window(&now, self.working_hours.as_ref()),
            "Confirmation cycle starting"
        );

        let mut events = vec![CoreEvent::SessionStarted {
            session_id: self.state.session_id.clone(),
            staff_id: self.state.staff_id.clone(),
        }];
        events.push(self.arm_cycle(CycleReason::SessionStarted, now_mono));
        events
    }

    /// Advance timers to `now_mono`
    pub fn tick(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        match self.phase {
            SchedulerPhase::Waiting => self.tick_waiting(now, now_mono),
            SchedulerPhase::PromptActive => self.tick_countdown(now_mono),
            SchedulerPhase::Idle | SchedulerPhase::Stopped => Vec::new(),
        }
    }

    fn tick_waiting(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let Some(wait) = self.cycle.take_due_wait(now_mono) else {
            return Vec::new();
        };

        if !is_within_window(&now, self.working_hours.as_ref()) {
            let id = self.timers.allocate();
            let timer = WaitTimer::new(
                id,
                self.intervals.next_interval(),
                CycleReason::OutsideWorkingHours,
                now_mono,
            );
            let interval = timer.interval();
            self.cycle.arm_wait(timer);

            debug!(
                session_id = %self.state.session_id,
                expired_timer = %wait.id,
                timer_id = %id,
                fires_in_secs = interval.as_secs(),
                "Outside working hours, deferring prompt"
            );

            return vec![CoreEvent::CycleDeferred {
                session_id: self.state.session_id.clone(),
                timer_id: id,
                fires_in: interval,
            }];
        }

        let id = self.timers.allocate();
        self.cycle.arm_countdown(ConfirmationCountdown::start(
            id,
            self.response_window_secs,
            now_mono,
        ));
        self.phase = SchedulerPhase::PromptActive;
        self.state.prompt_visible = true;
        self.state.seconds_remaining = self.response_window_secs;

        info!(
            session_id = %self.state.session_id,
            timer_id = %id,
            window_seconds = self.response_window_secs,
            "Showing confirmation prompt"
        );

        vec![CoreEvent::PromptShown {
            session_id: self.state.session_id.clone(),
            staff_id: self.state.staff_id.clone(),
            timer_id: id,
            window_seconds: self.response_window_secs,
        }]
    }

    fn tick_countdown(&mut self, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let Some(countdown) = self.cycle.countdown_mut() else {
            return Vec::new();
        };

        match countdown.tick(now_mono) {
            CountdownStep::Pending => Vec::new(),
            CountdownStep::Ticked { seconds_remaining } => {
                self.state.seconds_remaining = seconds_remaining;
                vec![CoreEvent::CountdownTicked {
                    session_id: self.state.session_id.clone(),
                    seconds_remaining,
                }]
            }
            CountdownStep::Expired => {
                self.cycle.take_countdown();
                self.state.prompt_visible = false;
                self.state.seconds_remaining = 0;
                self.state.is_working = false;
                self.state.missed_count += 1;

                info!(
                    session_id = %self.state.session_id,
                    missed_count = self.state.missed_count,
                    "Confirmation window expired"
                );

                vec![
                    CoreEvent::ConfirmationMissed {
                        session_id: self.state.session_id.clone(),
                        staff_id: self.state.staff_id.clone(),
                        missed_count: self.state.missed_count,
                    },
                    self.arm_cycle(CycleReason::Expired, now_mono),
                ]
            }
        }
    }

    /// Approve the visible prompt. A no-op when no prompt is visible.
    pub fn approve(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        if self.phase != SchedulerPhase::PromptActive {
            debug!(phase = ?self.phase, "Approve with no visible prompt ignored");
            return Vec::new();
        }

        let Some(response_secs) = self.cycle.countdown_mut().and_then(|c| c.approve()) else {
            return Vec::new();
        };

        self.cycle.take_countdown();
        self.state.prompt_visible = false;
        self.state.seconds_remaining = 0;
        self.state.is_working = true;
        self.state.confirmation_count += 1;
        self.state.last_activity_at = now;

        info!(
            session_id = %self.state.session_id,
            response_secs,
            confirmation_count = self.state.confirmation_count,
            "Presence confirmed"
        );

        vec![
            CoreEvent::ConfirmationRecorded {
                session_id: self.state.session_id.clone(),
                staff_id: self.state.staff_id.clone(),
                response_secs,
                confirmation_count: self.state.confirmation_count,
            },
            self.arm_cycle(CycleReason::Approved, now_mono),
        ]
    }

    /// Report user activity.
    ///
    /// While waiting, the first event of each kind pushes the next prompt out
    /// by a freshly picked interval. Further events of that kind are dropped
    /// until the next cycle is armed. Activity during a prompt is ignored
    /// and does not use up the listener.
    pub fn record_activity(
        &mut self,
        kind: ActivityKind,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Vec<CoreEvent> {
        if self.phase != SchedulerPhase::Waiting {
            return Vec::new();
        }

        if !self.armed_listeners.remove(&kind) {
            return Vec::new();
        }

        self.state.last_activity_at = now;

        let id = self.timers.allocate();
        let timer = WaitTimer::new(
            id,
            self.intervals.next_interval(),
            CycleReason::Activity { kind },
            now_mono,
        );
        let interval = timer.interval();
        let cancelled = self.cycle.arm_wait(timer);

        let Some(cancelled) = cancelled else {
            // Waiting always holds a wait timer; nothing to report otherwise
            return Vec::new();
        };

        debug!(
            session_id = %self.state.session_id,
            ?kind,
            cancelled = %cancelled,
            timer_id = %id,
            fires_in_secs = interval.as_secs(),
            "Activity observed, next prompt rescheduled"
        );

        vec![CoreEvent::CycleRescheduled {
            session_id: self.state.session_id.clone(),
            cancelled,
            timer_id: id,
            fires_in: interval,
            kind,
        }]
    }

    /// Cancel every timer and end the session. Stopping twice is a no-op.
    pub fn stop(&mut self, reason: SessionEndReason, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        if self.phase == SchedulerPhase::Stopped {
            return Vec::new();
        }

        let prompt_cancelled = self.state.prompt_visible;
        self.cycle.cancel_all();
        self.armed_listeners.clear();
        self.phase = SchedulerPhase::Stopped;
        self.state.prompt_visible = false;
        self.state.seconds_remaining = 0;

        let duration = self.state.duration(now_mono);

        info!(
            session_id = %self.state.session_id,
            ?reason,
            confirmation_count = self.state.confirmation_count,
            missed_count = self.state.missed_count,
            duration_secs = duration.as_secs(),
            "Confirmation cycle stopped"
        );

        vec![CoreEvent::SessionEnded {
            session_id: self.state.session_id.clone(),
            staff_id: self.state.staff_id.clone(),
            reason,
            confirmation_count: self.state.confirmation_count,
            missed_count: self.state.missed_count,
            duration,
            prompt_cancelled,
        }]
    }

    /// Arm the next wait and re-enable every activity listener
    fn arm_cycle(&mut self, reason: CycleReason, now_mono: MonotonicInstant) -> CoreEvent {
        let id = self.timers.allocate();
        let timer = WaitTimer::new(id, self.intervals.next_interval(), reason, now_mono);
        let interval = timer.interval();
        self.cycle.arm_wait(timer);
        self.phase = SchedulerPhase::Waiting;
        self.armed_listeners = ActivityKind::ALL.into_iter().collect();

        debug!(
            session_id = %self.state.session_id,
            timer_id = %id,
            ?reason,
            fires_in_secs = interval.as_secs(),
            "Cycle armed"
        );

        CoreEvent::CycleArmed {
            session_id: self.state.session_id.clone(),
            timer_id: id,
            fires_in: interval,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedIntervals, MAX_WAIT};
    use chrono::TimeZone;

    const MIN: Duration = Duration::from_secs(60);

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap()
    }

    fn scheduler_with(
        intervals: Vec<Duration>,
        hours: Option<WorkingHours>,
    ) -> (CycleScheduler, MonotonicInstant) {
        let mono = MonotonicInstant::now();
        let s = CycleScheduler::new(
            StaffId::new("anna"),
            hours,
            120,
            Box::new(FixedIntervals::new(intervals)),
            noon(),
            mono,
        );
        (s, mono)
    }

    /// Started scheduler waiting 10 minutes, then 15, then 25 ...
    fn started() -> (CycleScheduler, MonotonicInstant) {
        let (mut s, mono) = scheduler_with(vec![10 * MIN, 15 * MIN, 25 * MIN], None);
        s.start(noon(), mono);
        (s, mono)
    }

    /// Started scheduler with a prompt already showing; returns prompt start
    fn prompting() -> (CycleScheduler, MonotonicInstant) {
        let (mut s, mono) = started();
        let shown_at = mono + 10 * MIN;
        let events = s.tick(noon(), shown_at);
        assert!(matches!(events[0], CoreEvent::PromptShown { .. }));
        (s, shown_at)
    }

    fn assert_single_live_timer(s: &CycleScheduler) {
        match s.phase() {
            SchedulerPhase::Waiting | SchedulerPhase::PromptActive => {
                assert_eq!(s.live_timers().len(), 1, "phase {:?}", s.phase())
            }
            SchedulerPhase::Idle | SchedulerPhase::Stopped => assert!(s.live_timers().is_empty()),
        }
    }

    #[test]
    fn oversized_interval_is_capped_at_a_day() {
        let day = Duration::from_secs(24 * 60 * 60);
        let (mut s, mono) = scheduler_with(vec![Duration::MAX, day], None);

        let events = s.start(noon(), mono);
        assert!(matches!(
            events[1],
            CoreEvent::CycleArmed { fires_in, .. } if fires_in == MAX_WAIT
        ));
        assert_eq!(s.next_prompt_in(mono), Some(MAX_WAIT));

        assert!(s.tick(noon(), mono + (MAX_WAIT - MIN)).is_empty());
        let events = s.tick(noon(), mono + MAX_WAIT);
        assert!(matches!(events[0], CoreEvent::PromptShown { .. }));
    }

    #[test]
    fn new_scheduler_is_idle() {
        let (s, _) = scheduler_with(vec![MIN], None);
        assert_eq!(s.phase(), SchedulerPhase::Idle);
        assert!(s.live_timers().is_empty());
        assert!(s.state().is_working);
    }

    #[test]
    fn start_arms_first_wait() {
        let (mut s, mono) = scheduler_with(vec![10 * MIN], None);
        let events = s.start(noon(), mono);

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], CoreEvent::SessionStarted { .. }));
        assert!(matches!(
            events[1],
            CoreEvent::CycleArmed {
                reason: CycleReason::SessionStarted,
                fires_in,
                ..
            } if fires_in == 10 * MIN
        ));
        assert_eq!(s.phase(), SchedulerPhase::Waiting);
        assert_eq!(s.next_prompt_in(mono), Some(10 * MIN));
        assert_eq!(s.armed_listeners(), ActivityKind::ALL.to_vec());
        assert_single_live_timer(&s);
    }

    #[test]
    fn second_start_is_ignored() {
        let (mut s, mono) = started();
        let before = s.live_timers();
        assert!(s.start(noon(), mono).is_empty());
        assert_eq!(s.live_timers(), before);
    }

    #[test]
    fn no_prompt_before_wait_elapses() {
        let (mut s, mono) = started();
        assert!(s.tick(noon(), mono + (10 * MIN - Duration::from_millis(1))).is_empty());
        assert_eq!(s.phase(), SchedulerPhase::Waiting);
    }

    #[test]
    fn wait_elapsing_shows_prompt() {
        let (s, _) = prompting();

        assert_eq!(s.phase(), SchedulerPhase::PromptActive);
        assert!(s.state().prompt_visible);
        assert_eq!(s.state().seconds_remaining, 120);
        assert_eq!(s.next_prompt_in(MonotonicInstant::now()), None);
        assert_single_live_timer(&s);
    }

    #[test]
    fn countdown_decrements_while_visible() {
        let (mut s, shown_at) = prompting();
        let mut last = s.state().seconds_remaining;

        for secs in 1..120 {
            let events = s.tick(noon(), shown_at + Duration::from_secs(secs));
            assert_eq!(events.len(), 1);
            assert!(s.state().prompt_visible);
            assert!(s.state().seconds_remaining < last);
            assert!(s.state().seconds_remaining > 0);
            last = s.state().seconds_remaining;
            assert_single_live_timer(&s);
        }
    }

    #[test]
    fn approve_during_prompt_counts_once() {
        let (mut s, shown_at) = prompting();
        s.tick(noon(), shown_at + Duration::from_secs(40));
        let later = noon() + chrono::Duration::minutes(11);

        let events = s.approve(later, shown_at + Duration::from_secs(40));

        assert!(matches!(
            events[0],
            CoreEvent::ConfirmationRecorded {
                response_secs: 40,
                confirmation_count: 1,
                ..
            }
        ));
        assert!(matches!(
            events[1],
            CoreEvent::CycleArmed {
                reason: CycleReason::Approved,
                ..
            }
        ));
        assert_eq!(s.state().confirmation_count, 1);
        assert_eq!(s.state().missed_count, 0);
        assert!(!s.state().prompt_visible);
        assert!(s.state().is_working);
        assert_eq!(s.state().last_activity_at, later);
        assert_eq!(s.phase(), SchedulerPhase::Waiting);
        assert_single_live_timer(&s);

        // A second approval has nothing to resolve
        assert!(s.approve(later, shown_at + Duration::from_secs(41)).is_empty());
        assert_eq!(s.state().confirmation_count, 1);
    }

    #[test]
    fn approve_while_waiting_changes_nothing() {
        let (mut s, mono) = started();
        let timers = s.live_timers();

        assert!(s.approve(noon(), mono + MIN).is_empty());

        assert_eq!(s.state().confirmation_count, 0);
        assert_eq!(s.state().missed_count, 0);
        assert_eq!(s.live_timers(), timers);
        assert_eq!(s.phase(), SchedulerPhase::Waiting);
    }

    #[test]
    fn approve_before_start_changes_nothing() {
        let (mut s, mono) = scheduler_with(vec![MIN], None);
        assert!(s.approve(noon(), mono).is_empty());
        assert_eq!(s.phase(), SchedulerPhase::Idle);
    }

    #[test]
    fn expiry_marks_miss_and_rearms() {
        let (mut s, shown_at) = prompting();

        let events = s.tick(noon(), shown_at + Duration::from_secs(120));

        assert!(matches!(
            events[0],
            CoreEvent::ConfirmationMissed { missed_count: 1, .. }
        ));
        assert!(matches!(
            events[1],
            CoreEvent::CycleArmed {
                reason: CycleReason::Expired,
                ..
            }
        ));
        assert_eq!(s.state().missed_count, 1);
        assert_eq!(s.state().confirmation_count, 0);
        assert!(!s.state().is_working);
        assert!(!s.state().prompt_visible);
        assert_eq!(s.phase(), SchedulerPhase::Waiting);
        assert_single_live_timer(&s);
    }

    #[test]
    fn approval_after_expiry_is_ignored() {
        let (mut s, shown_at) = prompting();
        s.tick(noon(), shown_at + Duration::from_secs(120));

        assert!(s.approve(noon(), shown_at + Duration::from_secs(121)).is_empty());
        assert_eq!(s.state().confirmation_count, 0);
        assert_eq!(s.state().missed_count, 1);
    }

    #[test]
    fn approval_landing_before_expiry_tick_wins() {
        let (mut s, shown_at) = prompting();
        s.tick(noon(), shown_at + Duration::from_secs(119));

        // The window has run out but the tick has not been processed yet
        let events = s.approve(noon(), shown_at + Duration::from_secs(120));
        assert!(matches!(events[0], CoreEvent::ConfirmationRecorded { .. }));

        let events = s.tick(noon(), shown_at + Duration::from_secs(120));
        assert!(events.is_empty());
        assert_eq!(s.state().confirmation_count, 1);
        assert_eq!(s.state().missed_count, 0);
    }

    #[test]
    fn missed_then_confirmed_restores_working() {
        let (mut s, shown_at) = prompting();
        s.tick(noon(), shown_at + Duration::from_secs(120));
        assert!(!s.state().is_working);

        // Next wait is 15 minutes
        let second_prompt = shown_at + Duration::from_secs(120) + 15 * MIN;
        let events = s.tick(noon(), second_prompt);
        assert!(matches!(events[0], CoreEvent::PromptShown { .. }));

        s.approve(noon(), second_prompt + Duration::from_secs(5));
        assert!(s.state().is_working);
        assert_eq!(s.state().confirmation_count, 1);
        assert_eq!(s.state().missed_count, 1);
    }

    #[test]
    fn activity_while_waiting_replaces_wait() {
        let (mut s, mono) = started();
        let old = s.live_timers()[0];

        let events = s.record_activity(ActivityKind::Pointer, noon(), mono + 9 * MIN);

        let CoreEvent::CycleRescheduled {
            cancelled,
            timer_id,
            fires_in,
            kind,
            ..
        } = events[0].clone()
        else {
            panic!("expected reschedule, got {events:?}");
        };
        assert_eq!(cancelled, old);
        assert_eq!(kind, ActivityKind::Pointer);
        assert_eq!(fires_in, 15 * MIN);
        assert!(!s.is_timer_live(old));
        assert!(s.is_timer_live(timer_id));
        assert_single_live_timer(&s);

        // The old wait would have fired at +10 min; it must not
        assert!(s.tick(noon(), mono + 10 * MIN).is_empty());
        assert_eq!(s.phase(), SchedulerPhase::Waiting);

        // The new one fires 15 minutes after the activity
        let events = s.tick(noon(), mono + 9 * MIN + 15 * MIN);
        assert!(matches!(events[0], CoreEvent::PromptShown { .. }));
    }

    #[test]
    fn each_activity_kind_fires_once_per_cycle() {
        let (mut s, mono) = started();

        assert_eq!(
            s.record_activity(ActivityKind::Key, noon(), mono + MIN).len(),
            1
        );
        assert!(s.record_activity(ActivityKind::Key, noon(), mono + 2 * MIN).is_empty());
        assert_eq!(
            s.armed_listeners(),
            vec![ActivityKind::Pointer, ActivityKind::Click]
        );

        assert_eq!(
            s.record_activity(ActivityKind::Click, noon(), mono + 3 * MIN).len(),
            1
        );
        assert_eq!(
            s.record_activity(ActivityKind::Pointer, noon(), mono + 4 * MIN).len(),
            1
        );
        assert!(s.armed_listeners().is_empty());
        assert!(s.record_activity(ActivityKind::Pointer, noon(), mono + 5 * MIN).is_empty());
        assert_single_live_timer(&s);
    }

    #[test]
    fn approval_rearms_activity_listeners() {
        let (mut s, mono) = scheduler_with(vec![10 * MIN], None);
        s.start(noon(), mono);
        s.record_activity(ActivityKind::Key, noon(), mono + MIN);
        assert!(!s.armed_listeners().contains(&ActivityKind::Key));

        let shown_at = mono + 11 * MIN;
        s.tick(noon(), shown_at);
        s.approve(noon(), shown_at + Duration::from_secs(3));

        assert_eq!(s.armed_listeners(), ActivityKind::ALL.to_vec());
    }

    #[test]
    fn activity_during_prompt_is_ignored_and_not_consumed() {
        let (mut s, shown_at) = prompting();
        let before = s.state().last_activity_at;

        assert!(s
            .record_activity(ActivityKind::Click, noon(), shown_at + Duration::from_secs(1))
            .is_empty());

        assert_eq!(s.phase(), SchedulerPhase::PromptActive);
        assert!(s.state().prompt_visible);
        assert_eq!(s.state().last_activity_at, before);
        assert!(s.armed_listeners().contains(&ActivityKind::Click));

        // The countdown still expires on schedule
        let events = s.tick(noon(), shown_at + Duration::from_secs(120));
        assert!(matches!(events[0], CoreEvent::ConfirmationMissed { .. }));
    }

    #[test]
    fn outside_hours_keeps_waiting() {
        let hours = WorkingHours::parse("13:00", "17:00").unwrap();
        let (mut s, mono) = scheduler_with(vec![10 * MIN], Some(hours));
        let morning = Local.with_ymd_and_hms(2025, 3, 12, 8, 0, 0).unwrap();

        s.start(morning, mono);

        let mut at = mono;
        for _ in 0..20 {
            at = at + 10 * MIN;
            let events = s.tick(morning, at);
            assert_eq!(events.len(), 1);
            assert!(matches!(events[0], CoreEvent::CycleDeferred { .. }));
            assert_eq!(s.phase(), SchedulerPhase::Waiting);
            assert!(!s.state().prompt_visible);
            assert_single_live_timer(&s);
        }

        // The next wait elapses inside the window
        let afternoon = Local.with_ymd_and_hms(2025, 3, 12, 13, 5, 0).unwrap();
        let events = s.tick(afternoon, at + 10 * MIN);
        assert!(matches!(events[0], CoreEvent::PromptShown { .. }));
        assert_eq!(s.phase(), SchedulerPhase::PromptActive);
    }

    #[test]
    fn deferral_does_not_rearm_listeners() {
        let hours = WorkingHours::parse("13:00", "17:00").unwrap();
        let (mut s, mono) = scheduler_with(vec![10 * MIN], Some(hours));
        let morning = Local.with_ymd_and_hms(2025, 3, 12, 8, 0, 0).unwrap();
        s.start(morning, mono);

        s.record_activity(ActivityKind::Pointer, morning, mono + MIN);
        s.tick(morning, mono + 11 * MIN);

        assert!(!s.armed_listeners().contains(&ActivityKind::Pointer));
    }

    #[test]
    fn stop_cancels_everything_and_is_idempotent() {
        let (mut s, shown_at) = prompting();
        s.approve(noon(), shown_at + Duration::from_secs(2));

        let events = s.stop(SessionEndReason::SignedOut, shown_at + Duration::from_secs(60));
        assert!(matches!(
            events[0],
            CoreEvent::SessionEnded {
                confirmation_count: 1,
                missed_count: 0,
                prompt_cancelled: false,
                ..
            }
        ));
        assert_eq!(s.phase(), SchedulerPhase::Stopped);
        assert!(s.live_timers().is_empty());

        assert!(s
            .stop(SessionEndReason::SignedOut, shown_at + Duration::from_secs(61))
            .is_empty());
        assert_eq!(s.phase(), SchedulerPhase::Stopped);
        assert!(s.live_timers().is_empty());
    }

    #[test]
    fn stop_during_prompt_withdraws_it() {
        let (mut s, shown_at) = prompting();
        let events = s.stop(SessionEndReason::AdminEnded, shown_at + Duration::from_secs(10));

        assert!(matches!(
            events[0],
            CoreEvent::SessionEnded {
                prompt_cancelled: true,
                ..
            }
        ));
        assert!(!s.state().prompt_visible);
        assert_eq!(s.state().missed_count, 0);
    }

    #[test]
    fn stopped_scheduler_is_inert() {
        let (mut s, mono) = started();
        s.stop(SessionEndReason::SignedOut, mono);

        let far = mono + 1000 * MIN;
        assert!(s.tick(noon(), far).is_empty());
        assert!(s.approve(noon(), far).is_empty());
        assert!(s.record_activity(ActivityKind::Key, noon(), far).is_empty());
        assert!(s.start(noon(), far).is_empty());
        assert_eq!(s.phase(), SchedulerPhase::Stopped);
        assert!(s.live_timers().is_empty());
    }

    #[test]
    fn snapshot_reflects_state() {
        let (s, shown_at) = prompting();
        let snap = s.snapshot(shown_at);

        assert_eq!(snap.phase, SchedulerPhase::PromptActive);
        assert!(snap.prompt_visible);
        assert_eq!(snap.seconds_remaining, 120);
        assert_eq!(snap.staff_id, StaffId::new("anna"));
        assert_eq!(snap.next_prompt_in, None);
    }
}
