//! Data Transfer Objects for the HTTP API.
//!
//! Engine types that already serialize in the wire shape (`AccessDecision`,
//! `ValidationReport`, `RescheduleRequest`) are used directly; the types
//! here flatten stored records for clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Reschedule, RescheduleId, RescheduleStatus, ScheduleKey, StoredWindow, StudentProfileId,
    TeacherId,
};
use crate::services::{AppliedReschedule, ValidationIssue, ValidationReport};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
    /// Repository connection status
    pub repository: String,
}

/// Request body for assigning a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignWindowRequest {
    pub window_start: DateTime<Utc>,
}

/// A student's current window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowResponse {
    pub schedule_key: ScheduleKey,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub grace_end: DateTime<Utc>,
    pub version: u64,
}

impl WindowResponse {
    pub fn new(key: ScheduleKey, stored: StoredWindow) -> Self {
        Self {
            schedule_key: key,
            window_start: stored.window.window_start,
            window_end: stored.window.window_end,
            grace_end: stored.window.grace_end,
            version: stored.version,
        }
    }
}

/// Ledger entry as shown to teachers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleDto {
    pub id: RescheduleId,
    pub schedule_key: ScheduleKey,
    pub teacher_id: TeacherId,
    pub original_window_start: DateTime<Utc>,
    pub original_window_end: DateTime<Utc>,
    pub original_grace_end: DateTime<Utc>,
    pub new_window_start: DateTime<Utc>,
    pub new_window_end: DateTime<Utc>,
    pub new_grace_end: DateTime<Utc>,
    pub reason: String,
    pub status: RescheduleStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_reason: Option<String>,
    /// Signed start shift in minutes
    pub shift_minutes: i64,
    pub shift_description: String,
}

impl From<Reschedule> for RescheduleDto {
    fn from(r: Reschedule) -> Self {
        Self {
            id: r.id,
            schedule_key: r.key,
            teacher_id: r.teacher_id,
            original_window_start: r.original_window.window_start,
            original_window_end: r.original_window.window_end,
            original_grace_end: r.original_window.grace_end,
            new_window_start: r.new_window.window_start,
            new_window_end: r.new_window.window_end,
            new_grace_end: r.new_window.grace_end,
            status: r.status(),
            shift_minutes: r.shift().num_minutes(),
            shift_description: r.shift_description(),
            reason: r.reason,
            created_at: r.created_at,
            cancelled_at: r.cancelled_at,
            cancelled_reason: r.cancelled_reason,
        }
    }
}

/// Response for an applied reschedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleResponse {
    pub reschedule: RescheduleDto,
    pub window: WindowResponse,
    /// Non-blocking notices, e.g. short lead time
    pub warnings: Vec<ValidationIssue>,
}

impl From<AppliedReschedule> for RescheduleResponse {
    fn from(applied: AppliedReschedule) -> Self {
        let key = applied.reschedule.key;
        Self {
            reschedule: applied.reschedule.into(),
            window: WindowResponse::new(key, applied.window),
            warnings: applied.warnings,
        }
    }
}

/// Response for a dry-run validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRescheduleResponse {
    pub valid: bool,
    #[serde(flatten)]
    pub report: ValidationReport,
}

impl From<ValidationReport> for ValidateRescheduleResponse {
    fn from(report: ValidationReport) -> Self {
        Self {
            valid: report.is_valid(),
            report,
        }
    }
}

/// Request body for cancelling a reschedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRescheduleRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Query parameters for listing reschedules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleListQuery {
    pub teacher_id: Option<TeacherId>,
    pub student_id: Option<StudentProfileId>,
}

/// List of ledger entries, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleListResponse {
    pub reschedules: Vec<RescheduleDto>,
    pub total: usize,
}

impl From<Vec<Reschedule>> for RescheduleListResponse {
    fn from(entries: Vec<Reschedule>) -> Self {
        let reschedules: Vec<RescheduleDto> = entries.into_iter().map(Into::into).collect();
        let total = reschedules.len();
        Self { reschedules, total }
    }
}
