//! Repository double that can pause or fail the atomic reschedule writes.
//!
//! Wraps a [`LocalRepository`]; every call is delegated unchanged unless a
//! gate or a failure was armed for it. Gates and failures fire once.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use assessment_access::db::repositories::LocalRepository;
use assessment_access::db::repository::{
    RepositoryError, RepositoryResult, RescheduleLedger, ScheduleSnapshot, ScheduleTransactions,
    SubmissionLookup, WindowStore,
};
use assessment_access::models::{
    AssessmentWindow, NewReschedule, Reschedule, RescheduleId, ScheduleKey, StoredWindow,
    StudentProfileId, TeacherId,
};

/// Holds one call just before it reaches the store.
#[derive(Default)]
pub struct Gate {
    reached: Notify,
    release: Notify,
}

impl Gate {
    /// Resolves once the gated call is parked.
    pub async fn wait_until_reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(slot: &Mutex<Option<Arc<Gate>>>) {
        let gate = slot.lock().take();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
    }
}

#[derive(Clone, Default)]
pub struct GatedRepository {
    pub inner: LocalRepository,
    apply_gate: Arc<Mutex<Option<Arc<Gate>>>>,
    cancel_gate: Arc<Mutex<Option<Arc<Gate>>>>,
    fail_apply: Arc<AtomicBool>,
    fail_cancel: Arc<AtomicBool>,
}

impl GatedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park the next `apply_reschedule` until the returned gate is released.
    pub fn pause_next_apply(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.apply_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Park the next `cancel_reschedule` until the returned gate is released.
    pub fn pause_next_cancel(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        *self.cancel_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn fail_next_apply(&self) {
        self.fail_apply.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_cancel(&self) {
        self.fail_cancel.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl WindowStore for GatedRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.inner.health_check().await
    }

    async fn get_window(&self, key: ScheduleKey) -> RepositoryResult<StoredWindow> {
        self.inner.get_window(key).await
    }

    async fn create_window(
        &self,
        key: ScheduleKey,
        window: AssessmentWindow,
    ) -> RepositoryResult<StoredWindow> {
        self.inner.create_window(key, window).await
    }

    async fn replace_window(
        &self,
        key: ScheduleKey,
        expected: &StoredWindow,
        new_window: AssessmentWindow,
    ) -> RepositoryResult<StoredWindow> {
        self.inner.replace_window(key, expected, new_window).await
    }
}

#[async_trait]
impl RescheduleLedger for GatedRepository {
    async fn get_reschedule(&self, id: RescheduleId) -> RepositoryResult<Reschedule> {
        self.inner.get_reschedule(id).await
    }

    async fn active_reschedule(&self, key: ScheduleKey) -> RepositoryResult<Option<Reschedule>> {
        self.inner.active_reschedule(key).await
    }

    async fn list_by_teacher(
        &self,
        teacher_id: TeacherId,
        student_profile_id: Option<StudentProfileId>,
    ) -> RepositoryResult<Vec<Reschedule>> {
        self.inner.list_by_teacher(teacher_id, student_profile_id).await
    }

    async fn list_by_student(
        &self,
        student_profile_id: StudentProfileId,
    ) -> RepositoryResult<Vec<Reschedule>> {
        self.inner.list_by_student(student_profile_id).await
    }

    async fn list_for_key(&self, key: ScheduleKey) -> RepositoryResult<Vec<Reschedule>> {
        self.inner.list_for_key(key).await
    }
}

#[async_trait]
impl SubmissionLookup for GatedRepository {
    async fn has_submission(&self, key: ScheduleKey) -> RepositoryResult<bool> {
        self.inner.has_submission(key).await
    }
}

#[async_trait]
impl ScheduleTransactions for GatedRepository {
    async fn snapshot(&self, key: ScheduleKey) -> RepositoryResult<ScheduleSnapshot> {
        self.inner.snapshot(key).await
    }

    async fn apply_reschedule(
        &self,
        expected: &StoredWindow,
        entry: NewReschedule,
    ) -> RepositoryResult<(StoredWindow, Reschedule)> {
        Gate::pass(&self.apply_gate).await;
        if self.fail_apply.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::internal("ledger unavailable"));
        }
        self.inner.apply_reschedule(expected, entry).await
    }

    async fn cancel_reschedule(
        &self,
        id: RescheduleId,
        cancelled_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> RepositoryResult<(StoredWindow, Reschedule)> {
        Gate::pass(&self.cancel_gate).await;
        if self.fail_cancel.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::internal("ledger unavailable"));
        }
        self.inner.cancel_reschedule(id, cancelled_at, reason).await
    }
}
