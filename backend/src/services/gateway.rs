//! Polling gateway: the request-facing boundary of the access engine.
//!
//! Clients poll [`PollingGateway::check_access`] on their own cadence. The
//! gateway keeps no per-client or subscription state and runs no timers;
//! opening, closing and grace expiry are derived at read time.

use chrono::{DateTime, Utc};
use log::debug;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::db::repository::{
    FullRepository, RescheduleLedger, ScheduleTransactions, WindowStore,
};
use crate::models::{
    AccessDecision, AssessmentId, AssessmentWindow, Reschedule, RescheduleId, ScheduleKey,
    StoredWindow, StudentProfileId, TeacherId,
};
use crate::services::access_evaluator::evaluate;
use crate::services::error::AccessResult;
use crate::services::reschedule::{AppliedReschedule, RescheduleCoordinator, RescheduleRequest};
use crate::services::validation::ValidationReport;

#[derive(Clone)]
pub struct PollingGateway {
    repository: Arc<dyn FullRepository>,
    coordinator: RescheduleCoordinator,
    clock: Arc<dyn Clock>,
}

impl PollingGateway {
    pub fn new(
        repository: Arc<dyn FullRepository>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let coordinator = RescheduleCoordinator::new(Arc::clone(&repository), config);
        Self {
            repository,
            coordinator,
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn config(&self) -> &EngineConfig {
        self.coordinator.config()
    }

    /// Read-only access check. Safe to call at any frequency.
    ///
    /// The window, submission flag and reschedule flag come from one
    /// snapshot, so a concurrent reschedule is seen entirely or not at all.
    /// An unknown key is `NotFound`, never an expired decision.
    pub async fn check_access(
        &self,
        assessment_id: AssessmentId,
        student_profile_id: StudentProfileId,
    ) -> AccessResult<AccessDecision> {
        let key = ScheduleKey {
            assessment_id,
            student_profile_id,
        };
        let now = self.now();
        let snapshot = self.repository.snapshot(key).await?;

        let mut decision = evaluate(&snapshot.window.window, snapshot.has_submission, now);
        if snapshot.active_reschedule.is_some() && !decision.already_submitted {
            decision = decision.mark_rescheduled();
        }

        debug!(
            "Access check {}: status={:?}, minutesRemaining={}, minutesUntilOpen={}",
            key, decision.status, decision.minutes_remaining, decision.minutes_until_open
        );
        Ok(decision)
    }

    /// Assign the default window starting at `window_start`.
    pub async fn assign_window(
        &self,
        key: ScheduleKey,
        window_start: DateTime<Utc>,
    ) -> AccessResult<StoredWindow> {
        let window = AssessmentWindow::with_defaults(window_start, self.config());
        Ok(self.repository.create_window(key, window).await?)
    }

    pub async fn get_window(&self, key: ScheduleKey) -> AccessResult<StoredWindow> {
        Ok(self.repository.get_window(key).await?)
    }

    pub async fn propose_reschedule(
        &self,
        request: &RescheduleRequest,
    ) -> AccessResult<AppliedReschedule> {
        self.coordinator.reschedule(request, self.now()).await
    }

    /// Client-side pre-check: validation only, nothing is written.
    pub async fn validate_reschedule(
        &self,
        request: &RescheduleRequest,
    ) -> AccessResult<ValidationReport> {
        let (_, report) = self.coordinator.precheck(request, self.now()).await?;
        Ok(report)
    }

    pub async fn cancel_reschedule(
        &self,
        id: RescheduleId,
        reason: Option<String>,
    ) -> AccessResult<Reschedule> {
        self.coordinator.cancel(id, reason, self.now()).await
    }

    pub async fn get_reschedule(&self, id: RescheduleId) -> AccessResult<Reschedule> {
        Ok(self.repository.get_reschedule(id).await?)
    }

    pub async fn teacher_reschedules(
        &self,
        teacher_id: TeacherId,
        student_profile_id: Option<StudentProfileId>,
    ) -> AccessResult<Vec<Reschedule>> {
        Ok(self
            .repository
            .list_by_teacher(teacher_id, student_profile_id)
            .await?)
    }

    pub async fn student_reschedules(
        &self,
        student_profile_id: StudentProfileId,
    ) -> AccessResult<Vec<Reschedule>> {
        Ok(self.repository.list_by_student(student_profile_id).await?)
    }

    pub async fn window_history(&self, key: ScheduleKey) -> AccessResult<Vec<Reschedule>> {
        Ok(self.repository.list_for_key(key).await?)
    }

    pub async fn health_check(&self) -> AccessResult<bool> {
        Ok(self.repository.health_check().await?)
    }
}
