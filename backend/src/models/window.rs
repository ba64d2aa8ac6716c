//! Assessment windows and the stored rows that carry them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// A malformed window, rejected before it can reach the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidWindow {
    #[error("window end {end} must be after window start {start}")]
    EndNotAfterStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("grace end {grace_end} must not precede window end {end}")]
    GraceBeforeEnd {
        end: DateTime<Utc>,
        grace_end: DateTime<Utc>,
    },
}

/// Access period of one (assessment, student) pair.
///
/// Access is open on `[window_start, window_end]`; submissions are still
/// accepted, flagged as late, through `grace_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentWindow {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub grace_end: DateTime<Utc>,
}

impl AssessmentWindow {
    /// Build a window, checking `end > start` and `grace_end >= end`.
    pub fn new(
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        grace_end: DateTime<Utc>,
    ) -> Result<Self, InvalidWindow> {
        let window = Self {
            window_start,
            window_end,
            grace_end,
        };
        window.check()?;
        Ok(window)
    }

    /// Window starting at `start` with the configured length and grace.
    pub fn with_defaults(start: DateTime<Utc>, config: &EngineConfig) -> Self {
        let window_end = start + config.fixed_duration;
        Self {
            window_start: start,
            window_end,
            grace_end: window_end + config.grace_duration,
        }
    }

    /// Re-check the ordering invariants (fields are public and deserializable).
    pub fn check(&self) -> Result<(), InvalidWindow> {
        if self.window_end <= self.window_start {
            return Err(InvalidWindow::EndNotAfterStart {
                start: self.window_start,
                end: self.window_end,
            });
        }
        if self.grace_end < self.window_end {
            return Err(InvalidWindow::GraceBeforeEnd {
                end: self.window_end,
                grace_end: self.grace_end,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.window_end - self.window_start
    }

    pub fn grace_duration(&self) -> Duration {
        self.grace_end - self.window_end
    }

    /// Whether the window has opened at `now` (boundary inclusive).
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_start
    }
}

/// An active window row as held by the store.
///
/// `version` increases on every successful replace and is what the
/// compare-and-swap keys on, so a window restored by a cancellation still
/// differs from the snapshot a stale writer read before the reschedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredWindow {
    pub window: AssessmentWindow,
    pub version: u64,
}

/// Whole minutes in `d`, rounded down. Negative spans clamp to zero.
pub fn floor_minutes(d: Duration) -> i64 {
    if d <= Duration::zero() {
        return 0;
    }
    d.num_seconds() / 60
}

/// Whole minutes in `d`, rounded up. Negative spans clamp to zero.
pub fn ceil_minutes(d: Duration) -> i64 {
    if d <= Duration::zero() {
        return 0;
    }
    let mut secs = d.num_seconds();
    if d - Duration::seconds(secs) > Duration::zero() {
        secs += 1;
    }
    (secs + 59) / 60
}
