//! Per-tab repeating timer as an explicit state machine.
//!
//! ```text
//! Armed --tick(Keep)-------> Armed (same period, next period boundary)
//! Armed --tick(Evict|Gone)-> Terminated
//! Armed --reset(period)----> Armed (new period, new generation)
//! Armed --cancel-----------> Terminated
//! ```
//!
//! A kept tab is not backed off: it is simply checked again one period later.

use crate::config::clamp_wait;
use std::time::{Duration, Instant};

/// A live timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    period: Duration,
    next_fire: Instant,
    /// Distinguishes successive arms under the same key.
    generation: u64,
}

impl Timer {
    /// A timer first firing one period after `now`.
    pub fn start(period: Duration, now: Instant, generation: u64) -> Self {
        let period = clamp_wait(period);
        Self {
            period,
            next_fire: now + period,
            generation,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_fire(&self) -> Instant {
        self.next_fire
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_fire <= now
    }

    /// Next period boundary strictly after `now`. Missed periods are skipped.
    fn renewed(self, now: Instant) -> Self {
        let mut next = self.next_fire + self.period;
        if next <= now {
            let behind = now.duration_since(next).as_nanos() / self.period.as_nanos();
            let skips = u32::try_from(behind).unwrap_or(u32::MAX).saturating_add(1);
            next = self
                .period
                .checked_mul(skips)
                .and_then(|lag| next.checked_add(lag))
                .filter(|candidate| *candidate > now)
                .unwrap_or(now + self.period);
        }
        Self {
            next_fire: next,
            ..self
        }
    }
}

/// Inputs driving a [`TimerState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A tick at `now` that kept the tab.
    Keep { now: Instant },
    /// A tick that closed the tab.
    Evict,
    /// A tick that found the tab already closed.
    Gone,
    /// Replace the timer at `now`, e.g. after a change event.
    Reset {
        period: Duration,
        generation: u64,
        now: Instant,
    },
    /// The tab was closed or the scheduler stopped.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Armed(Timer),
    Terminated,
}

impl TimerState {
    pub fn armed(period: Duration, now: Instant, generation: u64) -> Self {
        TimerState::Armed(Timer::start(period, now, generation))
    }

    pub fn step(self, transition: Transition) -> Self {
        match (self, transition) {
            (
                _,
                Transition::Reset {
                    period,
                    generation,
                    now,
                },
            ) => Self::armed(period, now, generation),
            (TimerState::Armed(timer), Transition::Keep { now }) => {
                TimerState::Armed(timer.renewed(now))
            }
            (TimerState::Terminated, Transition::Keep { .. }) => TimerState::Terminated,
            (_, Transition::Evict | Transition::Gone | Transition::Cancel) => TimerState::Terminated,
        }
    }

    pub fn timer(&self) -> Option<&Timer> {
        match self {
            TimerState::Armed(timer) => Some(timer),
            TimerState::Terminated => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, TimerState::Armed(_))
    }
}
