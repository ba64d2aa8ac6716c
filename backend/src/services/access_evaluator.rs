//! Access evaluation: the single place where window timing is interpreted.
//!
//! [`evaluate`] is pure. Every surface that needs to know whether a student
//! may open an assessment (take-assessment screen, dashboards, badges) goes
//! through it, so boundary handling cannot drift between callers.
//!
//! Boundary instants (`now == window_start`, `now == window_end`,
//! `now == grace_end`) grant access. Clock skew is not compensated here.

use chrono::{DateTime, Utc};

use crate::models::{ceil_minutes, floor_minutes, AccessDecision, AccessStatus, AssessmentWindow};

pub const REASON_NOT_YET_OPEN: &str = "not yet open";
pub const REASON_GRACE_PERIOD: &str = "grace period — submit now";
pub const REASON_WINDOW_CLOSED: &str = "window closed";
pub const REASON_ALREADY_SUBMITTED: &str = "already submitted";
const RESCHEDULED_SUFFIX: &str = " (rescheduled by teacher)";

/// Decide access for `window` at `now`.
///
/// A recorded submission overrides every timing rule.
pub fn evaluate(
    window: &AssessmentWindow,
    has_submission: bool,
    now: DateTime<Utc>,
) -> AccessDecision {
    if has_submission {
        return AccessDecision {
            status: AccessStatus::AlreadySubmitted,
            can_access: false,
            already_submitted: true,
            is_expired: false,
            is_not_yet_open: false,
            grace_period_active: false,
            minutes_remaining: 0,
            minutes_until_open: 0,
            window_start: None,
            window_end: None,
            grace_end: None,
            current_time: now,
            rescheduled: false,
            reason: Some(REASON_ALREADY_SUBMITTED.to_string()),
        };
    }

    let base = AccessDecision {
        status: AccessStatus::Allowed,
        can_access: false,
        already_submitted: false,
        is_expired: false,
        is_not_yet_open: false,
        grace_period_active: false,
        minutes_remaining: 0,
        minutes_until_open: 0,
        window_start: Some(window.window_start),
        window_end: Some(window.window_end),
        grace_end: Some(window.grace_end),
        current_time: now,
        rescheduled: false,
        reason: None,
    };

    if now < window.window_start {
        AccessDecision {
            status: AccessStatus::NotYetOpen,
            is_not_yet_open: true,
            minutes_until_open: ceil_minutes(window.window_start - now),
            reason: Some(REASON_NOT_YET_OPEN.to_string()),
            ..base
        }
    } else if now <= window.window_end {
        AccessDecision {
            status: AccessStatus::Allowed,
            can_access: true,
            minutes_remaining: floor_minutes(window.window_end - now),
            ..base
        }
    } else if now <= window.grace_end {
        AccessDecision {
            status: AccessStatus::GracePeriod,
            can_access: true,
            grace_period_active: true,
            minutes_remaining: floor_minutes(window.grace_end - now),
            reason: Some(REASON_GRACE_PERIOD.to_string()),
            ..base
        }
    } else {
        AccessDecision {
            status: AccessStatus::Expired,
            is_expired: true,
            reason: Some(REASON_WINDOW_CLOSED.to_string()),
            ..base
        }
    }
}

impl AccessDecision {
    /// Flag the decision as coming from a rescheduled window.
    ///
    /// Blocking reasons get a suffix so students see why their usual time
    /// no longer applies.
    pub fn mark_rescheduled(mut self) -> Self {
        self.rescheduled = true;
        if matches!(self.status, AccessStatus::NotYetOpen | AccessStatus::Expired) {
            if let Some(reason) = self.reason.as_mut() {
                reason.push_str(RESCHEDULED_SUFFIX);
            }
        }
        self
    }

    /// Whether the student is inside the regular window (not grace).
    pub fn is_in_window(&self) -> bool {
        self.can_access && !self.grace_period_active
    }
}
