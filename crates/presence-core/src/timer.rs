//! Timer handles owned by the cycle scheduler
//!
//! The scheduler allocates every handle itself and is the only thing that can
//! cancel one. A cycle holds at most one wait timer or one countdown, never
//! both; arming either replaces whatever was live before.

use presence_api::CycleReason;
use presence_config::MAX_INTERVAL_MINUTES;
use presence_util::MonotonicInstant;
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::ConfirmationCountdown;

/// Handle for a timer created by a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn for_tests(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Hands out timer ids that are never reused within one scheduler
#[derive(Debug, Default)]
pub struct TimerArena {
    next: u64,
}

impl TimerArena {
    pub fn allocate(&mut self) -> TimerId {
        self.next += 1;
        TimerId(self.next)
    }
}

/// Longest wait a timer will be armed for
pub const MAX_WAIT: Duration = Duration::from_secs(MAX_INTERVAL_MINUTES * 60);

/// Pending wait before the next prompt
#[derive(Debug, Clone)]
pub struct WaitTimer {
    pub id: TimerId,
    pub armed_at: MonotonicInstant,
    pub fires_at: MonotonicInstant,
    pub reason: CycleReason,
}

impl WaitTimer {
    pub fn new(
        id: TimerId,
        interval: Duration,
        reason: CycleReason,
        now: MonotonicInstant,
    ) -> Self {
        if interval > MAX_WAIT {
            warn!(
                timer_id = %id,
                requested_secs = interval.as_secs(),
                max_secs = MAX_WAIT.as_secs(),
                "Wait interval capped"
            );
        }
        let interval = interval.min(MAX_WAIT);

        Self {
            id,
            armed_at: now,
            fires_at: now.checked_add(interval).unwrap_or(now),
            reason,
        }
    }

    pub fn interval(&self) -> Duration {
        self.fires_at.duration_since(self.armed_at)
    }

    pub fn is_due(&self, now: MonotonicInstant) -> bool {
        now >= self.fires_at
    }

    pub fn remaining(&self, now: MonotonicInstant) -> Duration {
        self.fires_at.saturating_duration_until(now)
    }
}

/// The live timers of one session
#[derive(Debug, Default)]
pub struct ScheduledCycle {
    wait: Option<WaitTimer>,
    countdown: Option<ConfirmationCountdown>,
}

impl ScheduledCycle {
    /// Arm a wait, cancelling any live wait or countdown.
    /// Returns the id of the timer that was cancelled, if any.
    pub fn arm_wait(&mut self, timer: WaitTimer) -> Option<TimerId> {
        let cancelled = self.cancel_all();
        self.wait = Some(timer);
        cancelled
    }

    /// Arm a countdown, cancelling any live wait or countdown
    pub fn arm_countdown(&mut self, countdown: ConfirmationCountdown) -> Option<TimerId> {
        let cancelled = self.cancel_all();
        self.countdown = Some(countdown);
        cancelled
    }

    /// Cancel whatever is live. Safe to call when nothing is.
    pub fn cancel_all(&mut self) -> Option<TimerId> {
        let wait = self.wait.take().map(|w| w.id);
        let countdown = self.countdown.take().map(|c| c.timer_id());
        wait.or(countdown)
    }

    /// Remove the wait if it is due at `now`
    pub fn take_due_wait(&mut self, now: MonotonicInstant) -> Option<WaitTimer> {
        match &self.wait {
            Some(wait) if wait.is_due(now) => self.wait.take(),
            _ => None,
        }
    }

    pub fn take_countdown(&mut self) -> Option<ConfirmationCountdown> {
        self.countdown.take()
    }

    pub fn wait(&self) -> Option<&WaitTimer> {
        self.wait.as_ref()
    }

    pub fn countdown(&self) -> Option<&ConfirmationCountdown> {
        self.countdown.as_ref()
    }

    pub fn countdown_mut(&mut self) -> Option<&mut ConfirmationCountdown> {
        self.countdown.as_mut()
    }

    /// Ids of every live timer
    pub fn live_timers(&self) -> Vec<TimerId> {
        self.wait
            .iter()
            .map(|w| w.id)
            .chain(self.countdown.iter().map(|c| c.timer_id()))
            .collect()
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.live_timers().contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_wait_is_capped() {
        let now = MonotonicInstant::now();
        let timer = WaitTimer::new(
            TimerId::for_tests(1),
            Duration::MAX,
            CycleReason::SessionStarted,
            now,
        );
        assert_eq!(timer.interval(), MAX_WAIT);
        assert!(!timer.is_due(now));
        assert!(timer.is_due(now + MAX_WAIT));
    }

    #[test]
    fn arena_never_reuses_ids() {
        let mut arena = TimerArena::default();
        let a = arena.allocate();
        let b = arena.allocate();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn arming_replaces_live_timer() {
        let mut arena = TimerArena::default();
        let now = MonotonicInstant::now();
        let mut cycle = ScheduledCycle::default();

        let first = arena.allocate();
        assert_eq!(
            cycle.arm_wait(WaitTimer::new(
                first,
                Duration::from_secs(600),
                CycleReason::SessionStarted,
                now
            )),
            None
        );

        let countdown_id = arena.allocate();
        let cancelled = cycle.arm_countdown(ConfirmationCountdown::start(countdown_id, 120, now));
        assert_eq!(cancelled, Some(first));
        assert_eq!(cycle.live_timers(), vec![countdown_id]);
        assert!(cycle.wait().is_none());

        let second = arena.allocate();
        let cancelled = cycle.arm_wait(WaitTimer::new(
            second,
            Duration::from_secs(900),
            CycleReason::Approved,
            now,
        ));
        assert_eq!(cancelled, Some(countdown_id));
        assert_eq!(cycle.live_timers(), vec![second]);
    }

    #[test]
    fn cancel_is_safe_when_empty() {
        let mut cycle = ScheduledCycle::default();
        assert_eq!(cycle.cancel_all(), None);
        assert_eq!(cycle.cancel_all(), None);
        assert!(cycle.live_timers().is_empty());
    }

    #[test]
    fn wait_only_taken_when_due() {
        let mut arena = TimerArena::default();
        let now = MonotonicInstant::now();
        let mut cycle = ScheduledCycle::default();
        let id = arena.allocate();
        cycle.arm_wait(WaitTimer::new(
            id,
            Duration::from_secs(60),
            CycleReason::SessionStarted,
            now,
        ));

        assert!(cycle.take_due_wait(now + Duration::from_secs(59)).is_none());
        assert!(cycle.is_live(id));

        let taken = cycle.take_due_wait(now + Duration::from_secs(60)).unwrap();
        assert_eq!(taken.id, id);
        assert_eq!(taken.interval(), Duration::from_secs(60));
        assert!(cycle.live_timers().is_empty());
    }
}
