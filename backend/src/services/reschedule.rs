//! Reschedule coordination.
//!
//! Validates and applies teacher reschedules while keeping exactly one
//! active window per key. The window swap and its ledger write are a single
//! store operation, checked against the snapshot the proposal was built
//! from; a lost race is reported as [`AccessError::Conflict`] and never
//! retried silently.
//!
//! ```text
//! propose ──► apply ──► ACTIVE ──► cancel ──► CANCELLED
//!                         │
//!                         └── (new window runs out: stays ACTIVE)
//! ```

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::db::repository::{
    FullRepository, RepositoryError, RescheduleLedger, ScheduleTransactions,
};
use crate::models::{
    AssessmentWindow, NewReschedule, Reschedule, RescheduleId, ScheduleKey, StoredWindow,
    TeacherId,
};
use crate::services::error::{AccessError, AccessResult};
use crate::services::validation::{
    validate_reschedule, RescheduleContext, ValidationIssue, ValidationReport,
};

/// A teacher's request to move one student's window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub schedule_key: ScheduleKey,
    pub new_window_start: DateTime<Utc>,
    pub reason: String,
    pub teacher_id: TeacherId,
}

/// A validated reschedule, bound to the window snapshot it was checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RescheduleProposal {
    pub key: ScheduleKey,
    pub teacher_id: TeacherId,
    /// Trimmed reason.
    pub reason: String,
    pub current: StoredWindow,
    pub new_window: AssessmentWindow,
    pub warnings: Vec<ValidationIssue>,
}

/// Result of a successful apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedReschedule {
    pub reschedule: Reschedule,
    pub window: StoredWindow,
    pub warnings: Vec<ValidationIssue>,
}

#[derive(Clone)]
pub struct RescheduleCoordinator {
    repository: Arc<dyn FullRepository>,
    config: EngineConfig,
}

impl RescheduleCoordinator {
    pub fn new(repository: Arc<dyn FullRepository>, config: EngineConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the validation rules against the current state of `request.schedule_key`.
    ///
    /// Returns the report even when it contains errors; only a missing window
    /// or a storage failure is an `Err`.
    pub async fn precheck(
        &self,
        request: &RescheduleRequest,
        now: DateTime<Utc>,
    ) -> AccessResult<(StoredWindow, ValidationReport)> {
        let snapshot = self.repository.snapshot(request.schedule_key).await?;

        let report = validate_reschedule(
            RescheduleContext {
                current_window: &snapshot.window.window,
                has_submission: snapshot.has_submission,
                has_active_reschedule: snapshot.active_reschedule.is_some(),
            },
            request.new_window_start,
            &request.reason,
            now,
            &self.config,
        );
        Ok((snapshot.window, report))
    }

    /// Validate a request and derive the new window.
    ///
    /// The new window always has the configured length and grace; neither is
    /// taken from the request.
    pub async fn propose(
        &self,
        request: &RescheduleRequest,
        now: DateTime<Utc>,
    ) -> AccessResult<RescheduleProposal> {
        let (current, report) = self.precheck(request, now).await?;
        if !report.is_valid() {
            warn!(
                "Reschedule rejected for {}: {}",
                request.schedule_key, report
            );
            return Err(AccessError::Validation(report));
        }

        Ok(RescheduleProposal {
            key: request.schedule_key,
            teacher_id: request.teacher_id,
            reason: request.reason.trim().to_string(),
            current,
            new_window: AssessmentWindow::with_defaults(request.new_window_start, &self.config),
            warnings: report.warnings,
        })
    }

    /// Swap the window and record the reschedule in one store write.
    ///
    /// Fails with `Conflict`, writing nothing, if the window changed since the
    /// proposal was made or another reschedule became active meanwhile.
    pub async fn apply(
        &self,
        proposal: RescheduleProposal,
        now: DateTime<Utc>,
    ) -> AccessResult<AppliedReschedule> {
        let key = proposal.key;
        let entry = NewReschedule {
            key,
            teacher_id: proposal.teacher_id,
            original_window: proposal.current.window,
            new_window: proposal.new_window,
            reason: proposal.reason,
            created_at: now,
        };

        let (window, reschedule) = self
            .repository
            .apply_reschedule(&proposal.current, entry)
            .await
            .map_err(|err| {
                if err.is_conflict() {
                    warn!("Reschedule for {} lost a concurrent update: {}", key, err);
                }
                AccessError::from(err)
            })?;

        info!(
            "Assessment rescheduled: id={}, key={}, originalStart={}, newStart={}, teacher={}",
            reschedule.id,
            key,
            reschedule.original_window.window_start,
            reschedule.new_window.window_start,
            reschedule.teacher_id
        );

        Ok(AppliedReschedule {
            reschedule,
            window,
            warnings: proposal.warnings,
        })
    }

    /// `propose` followed by `apply` at the same instant.
    pub async fn reschedule(
        &self,
        request: &RescheduleRequest,
        now: DateTime<Utc>,
    ) -> AccessResult<AppliedReschedule> {
        let proposal = self.propose(request, now).await?;
        self.apply(proposal, now).await
    }

    /// Cancel an active reschedule and restore the original window.
    ///
    /// Only allowed once, and only strictly before the new window opens.
    pub async fn cancel(
        &self,
        id: RescheduleId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> AccessResult<Reschedule> {
        let reschedule = self.repository.get_reschedule(id).await?;

        if !reschedule.active {
            return Err(AccessError::NotCancellable(format!(
                "Reschedule {} is already cancelled",
                id
            )));
        }
        if !reschedule.is_cancellable(now) {
            return Err(AccessError::NotCancellable(format!(
                "Reschedule {} cannot be cancelled after its new window has started at {}",
                id, reschedule.new_window.window_start
            )));
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let (window, cancelled) = match self.repository.cancel_reschedule(id, now, reason).await {
            Ok(result) => result,
            Err(err) if err.is_conflict() => return Err(self.cancel_conflict(id, err).await),
            Err(err) => return Err(err.into()),
        };

        info!(
            "Reschedule cancelled: id={}, key={}, reverted to original start {} (version {})",
            id, cancelled.key, cancelled.original_window.window_start, window.version
        );
        Ok(cancelled)
    }

    /// A cancel that lost a race: either someone else cancelled first, or
    /// the window moved away from the reschedule's new window.
    async fn cancel_conflict(&self, id: RescheduleId, err: RepositoryError) -> AccessError {
        match self.repository.get_reschedule(id).await {
            Ok(reschedule) if !reschedule.active => {
                AccessError::NotCancellable(format!("Reschedule {} is already cancelled", id))
            }
            _ => err.into(),
        }
    }
}
