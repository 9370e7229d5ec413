//! Elapsed-time math for a running cycle.
//!
//! Elapsed seconds are always recomputed from the cycle's start date instead
//! of being counted per tick, so missed ticks (a suspended host, a slow
//! scheduler) never accumulate drift.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::cycles::Cycle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down; publish this many seconds.
    Running { seconds_passed: u64 },
    /// Duration reached; `seconds_passed` is clamped to the cycle total.
    Finished { seconds_passed: u64 },
    /// Nothing to count against.
    Idle,
}

/// Whole seconds between `start` and `now`, floored. A clock that reads
/// earlier than `start` counts as zero.
pub fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = now.signed_duration_since(start).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis / 1000) as u64
    }
}

/// The elapsed check runs before anything is published, so the value handed
/// back never overshoots the total.
pub fn evaluate(cycle: &Cycle, now: DateTime<Utc>) -> TickOutcome {
    let total = cycle.total_seconds();
    let elapsed = elapsed_seconds(cycle.start_date, now);
    if elapsed >= total {
        TickOutcome::Finished {
            seconds_passed: total,
        }
    } else {
        TickOutcome::Running {
            seconds_passed: elapsed,
        }
    }
}

/// Remaining time split for an `mm:ss` display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Remaining {
    pub minutes: u64,
    pub seconds: u64,
}

impl Remaining {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }

    /// `00:00` when no cycle is active.
    pub fn for_cycle(active: Option<&Cycle>, seconds_passed: u64) -> Self {
        match active {
            Some(cycle) => Self::from_seconds(cycle.total_seconds().saturating_sub(seconds_passed)),
            None => Self::default(),
        }
    }

    pub fn total_seconds(&self) -> u64 {
        self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}
