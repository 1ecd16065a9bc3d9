//! Bounded confirmation countdown

use presence_util::MonotonicInstant;
use std::time::Duration;

use crate::TimerId;

const TICK: Duration = Duration::from_secs(1);

/// Result of advancing a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// Less than a second has passed since the last decrement
    Pending,
    /// One or more seconds were counted off
    Ticked { seconds_remaining: u32 },
    /// The window ran out without an approval
    Expired,
}

/// Response window for a single prompt.
///
/// Counts down once per second from the window length. The decrement that
/// would reach zero expires the countdown instead, so `seconds_remaining` is
/// at least 1 for as long as the prompt is visible. Exactly one outcome is
/// ever applied: once approved or expired, further ticks and approvals are
/// ignored.
#[derive(Debug, Clone)]
pub struct ConfirmationCountdown {
    timer_id: TimerId,
    window_secs: u32,
    seconds_remaining: u32,
    started_at: MonotonicInstant,
    next_tick_at: MonotonicInstant,
    resolved: bool,
}

impl ConfirmationCountdown {
    pub fn start(timer_id: TimerId, window_secs: u32, now: MonotonicInstant) -> Self {
        Self {
            timer_id,
            window_secs,
            seconds_remaining: window_secs,
            started_at: now,
            next_tick_at: now + TICK,
            resolved: false,
        }
    }

    pub fn timer_id(&self) -> TimerId {
        self.timer_id
    }

    pub fn window_secs(&self) -> u32 {
        self.window_secs
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn started_at(&self) -> MonotonicInstant {
        self.started_at
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Count off every whole second that elapsed up to `now`
    pub fn tick(&mut self, now: MonotonicInstant) -> CountdownStep {
        if self.resolved || now < self.next_tick_at {
            return CountdownStep::Pending;
        }

        while now >= self.next_tick_at {
            if self.seconds_remaining <= 1 {
                self.seconds_remaining = 0;
                self.resolved = true;
                return CountdownStep::Expired;
            }
            self.seconds_remaining -= 1;
            self.next_tick_at = self.next_tick_at + TICK;
        }

        CountdownStep::Ticked {
            seconds_remaining: self.seconds_remaining,
        }
    }

    /// Resolve as approved. Returns the seconds the staff member took to
    /// respond, or None if the countdown already has an outcome.
    ///
    /// The deadline is not consulted: an approval that arrives before the
    /// next `tick` call wins even if the window has technically run out.
    pub fn approve(&mut self) -> Option<u32> {
        if self.resolved {
            return None;
        }
        self.resolved = true;
        Some(self.window_secs - self.seconds_remaining)
    }
}
