//! Reschedule ledger entries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{RescheduleId, ScheduleKey, TeacherId};
use super::window::AssessmentWindow;

/// Lifecycle of a reschedule once it has been applied.
///
/// A proposal that never reaches the store has no ledger entry, so only the
/// two post-apply states are recorded. `Active` is also terminal once the new
/// window has run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RescheduleStatus {
    Active,
    Cancelled,
}

/// Entry to append to the ledger; the ledger assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReschedule {
    pub key: ScheduleKey,
    pub teacher_id: TeacherId,
    pub original_window: AssessmentWindow,
    pub new_window: AssessmentWindow,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// One teacher-issued override of a window, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reschedule {
    pub id: RescheduleId,
    pub key: ScheduleKey,
    pub teacher_id: TeacherId,
    pub original_window: AssessmentWindow,
    pub new_window: AssessmentWindow,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub active: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_reason: Option<String>,
}

impl Reschedule {
    pub fn from_new(id: RescheduleId, new: NewReschedule) -> Self {
        Self {
            id,
            key: new.key,
            teacher_id: new.teacher_id,
            original_window: new.original_window,
            new_window: new.new_window,
            reason: new.reason,
            created_at: new.created_at,
            active: true,
            cancelled_at: None,
            cancelled_reason: None,
        }
    }

    pub fn status(&self) -> RescheduleStatus {
        if self.active && self.cancelled_at.is_none() {
            RescheduleStatus::Active
        } else {
            RescheduleStatus::Cancelled
        }
    }

    /// Cancellation is allowed once, while active, strictly before the new
    /// window opens.
    pub fn is_cancellable(&self, now: DateTime<Utc>) -> bool {
        self.status() == RescheduleStatus::Active && now < self.new_window.window_start
    }

    /// Signed shift of the start time (new minus original).
    pub fn shift(&self) -> Duration {
        self.new_window.window_start - self.original_window.window_start
    }

    /// Human-readable shift, e.g. "+3 hours later" or "-90 minutes earlier".
    pub fn shift_description(&self) -> String {
        let shift = self.shift();
        let minutes = shift.num_minutes().abs();
        let magnitude = if minutes % 60 == 0 {
            format!("{} hours", minutes / 60)
        } else {
            format!("{} minutes", minutes)
        };
        if shift >= Duration::zero() {
            format!("+{} later", magnitude)
        } else {
            format!("-{} earlier", magnitude)
        }
    }
}
