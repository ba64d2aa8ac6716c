use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status code for frontend handling of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessStatus {
    Allowed,
    GracePeriod,
    NotYetOpen,
    Expired,
    AlreadySubmitted,
}

/// Computed, never persisted verdict on whether a student may access an
/// assessment right now.
///
/// Minute counters are zero whenever they do not apply. Window instants are
/// omitted when the student has already submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub status: AccessStatus,
    pub can_access: bool,
    pub already_submitted: bool,
    pub is_expired: bool,
    pub is_not_yet_open: bool,
    pub grace_period_active: bool,
    pub minutes_remaining: i64,
    pub minutes_until_open: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grace_end: Option<DateTime<Utc>>,
    pub current_time: DateTime<Utc>,
    /// Whether the window in force comes from an active reschedule.
    pub rescheduled: bool,
    /// Cause when blocked, or the grace notice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
