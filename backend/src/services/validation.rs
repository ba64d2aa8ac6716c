//! Reschedule validation.
//!
//! Pure checks run before any write. All failed rules are collected so a
//! teacher sees every problem at once; lead-time warnings are reported
//! separately and never block.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EngineConfig;
use crate::models::AssessmentWindow;

/// Rule identifiers, stable for programmatic handling by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationRule {
    InvalidReason,
    PastStart,
    AlreadyStarted,
    TooFarAhead,
    AlreadySubmitted,
    AlreadyRescheduled,
    /// Warning only.
    ShortLeadTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub rule: ValidationRule,
    pub message: String,
}

impl ValidationIssue {
    fn new(rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            message: message.into(),
        }
    }
}

/// Outcome of validating a reschedule request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Blocking failures.
    pub errors: Vec<ValidationIssue>,
    /// Non-blocking notices.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_error(&self, rule: ValidationRule) -> bool {
        self.errors.iter().any(|issue| issue.rule == rule)
    }

    pub fn has_warning(&self, rule: ValidationRule) -> bool {
        self.warnings.iter().any(|issue| issue.rule == rule)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Facts about the target key needed to validate a reschedule.
#[derive(Debug, Clone, Copy)]
pub struct RescheduleContext<'a> {
    pub current_window: &'a AssessmentWindow,
    pub has_submission: bool,
    pub has_active_reschedule: bool,
}

/// Check a reason against the configured bounds. Length counts characters
/// of the trimmed text.
pub fn check_reason(reason: &str, config: &EngineConfig) -> Option<ValidationIssue> {
    let len = reason.trim().chars().count();
    if len < config.min_reason_len {
        return Some(ValidationIssue::new(
            ValidationRule::InvalidReason,
            format!(
                "Reason must be at least {} characters",
                config.min_reason_len
            ),
        ));
    }
    if len > config.max_reason_len {
        return Some(ValidationIssue::new(
            ValidationRule::InvalidReason,
            format!(
                "Reason must be at most {} characters",
                config.max_reason_len
            ),
        ));
    }
    None
}

/// Run every reschedule rule for a request arriving at `now`.
pub fn validate_reschedule(
    ctx: RescheduleContext<'_>,
    new_window_start: DateTime<Utc>,
    reason: &str,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Some(issue) = check_reason(reason, config) {
        report.errors.push(issue);
    }

    if new_window_start <= now {
        report.errors.push(ValidationIssue::new(
            ValidationRule::PastStart,
            format!("New window start must be in the future. Selected: {}", new_window_start),
        ));
    } else if new_window_start - now > config.max_horizon {
        report.errors.push(ValidationIssue::new(
            ValidationRule::TooFarAhead,
            format!(
                "New window cannot start more than {} days in the future",
                config.max_horizon.num_days()
            ),
        ));
    } else if new_window_start - now < config.min_lead_time {
        report.warnings.push(ValidationIssue::new(
            ValidationRule::ShortLeadTime,
            format!(
                "New window starts in less than {} minutes; the student may not see it in time",
                config.min_lead_time.num_minutes()
            ),
        ));
    }

    if ctx.current_window.has_started(now) {
        report.errors.push(ValidationIssue::new(
            ValidationRule::AlreadyStarted,
            format!(
                "Cannot reschedule after the window has started. Start was: {}",
                ctx.current_window.window_start
            ),
        ));
    }

    if ctx.has_submission {
        report.errors.push(ValidationIssue::new(
            ValidationRule::AlreadySubmitted,
            "Cannot reschedule - student has already submitted this assessment",
        ));
    }

    if ctx.has_active_reschedule {
        report.errors.push(ValidationIssue::new(
            ValidationRule::AlreadyRescheduled,
            "This assessment has already been rescheduled. Cancel the existing reschedule first.",
        ));
    }

    report
}
