//! Repository traits for window and reschedule storage.
//!
//! These traits abstract the storage backend so the coordinator and the
//! gateway can run against the in-memory [`LocalRepository`] or any durable
//! implementation with the same guarantees.
//!
//! # Guarantees
//! - At most one active window per [`ScheduleKey`].
//! - Every window mutation is an atomic compare-and-swap on the row version.
//! - A window swap and its ledger write commit together
//!   ([`ScheduleTransactions`]); no reader sees one without the other.
//! - The reschedule ledger is append-only apart from the one-time
//!   cancellation mark.
//!
//! [`LocalRepository`]: crate::db::repositories::LocalRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    AssessmentWindow, NewReschedule, Reschedule, RescheduleId, ScheduleKey, StoredWindow,
    StudentProfileId, TeacherId,
};

mod error;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

/// Authoritative key → window mapping.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Check if the backend is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Fetch the active window for `key`.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no window was ever assigned
    async fn get_window(&self, key: ScheduleKey) -> RepositoryResult<StoredWindow>;

    /// Assign the initial window for `key`.
    ///
    /// # Returns
    /// * `Err(RepositoryError::AlreadyExists)` - If `key` already has a window
    /// * `Err(RepositoryError::ValidationError)` - If the window is malformed
    async fn create_window(
        &self,
        key: ScheduleKey,
        window: AssessmentWindow,
    ) -> RepositoryResult<StoredWindow>;

    /// Replace the window for `key` if it still matches `expected`.
    ///
    /// # Returns
    /// * `Ok(StoredWindow)` - The new row, with its version bumped
    /// * `Err(RepositoryError::Conflict)` - If the stored row changed since `expected` was read
    /// * `Err(RepositoryError::NotFound)` - If `key` has no window
    async fn replace_window(
        &self,
        key: ScheduleKey,
        expected: &StoredWindow,
        new_window: AssessmentWindow,
    ) -> RepositoryResult<StoredWindow>;
}

/// Append-only history of reschedules (read side).
///
/// Entries are written only through [`ScheduleTransactions`].
#[async_trait]
pub trait RescheduleLedger: Send + Sync {
    async fn get_reschedule(&self, id: RescheduleId) -> RepositoryResult<Reschedule>;

    /// The active (not cancelled) reschedule governing `key`, if any.
    async fn active_reschedule(&self, key: ScheduleKey) -> RepositoryResult<Option<Reschedule>>;

    /// Reschedules issued by `teacher_id`, newest first, optionally for one student.
    async fn list_by_teacher(
        &self,
        teacher_id: TeacherId,
        student_profile_id: Option<StudentProfileId>,
    ) -> RepositoryResult<Vec<Reschedule>>;

    /// Reschedules affecting `student_profile_id`, newest first.
    async fn list_by_student(
        &self,
        student_profile_id: StudentProfileId,
    ) -> RepositoryResult<Vec<Reschedule>>;

    /// Full history for one key, oldest first.
    async fn list_for_key(&self, key: ScheduleKey) -> RepositoryResult<Vec<Reschedule>>;
}

/// Submission existence, owned by the grading subsystem.
#[async_trait]
pub trait SubmissionLookup: Send + Sync {
    async fn has_submission(&self, key: ScheduleKey) -> RepositoryResult<bool>;
}

/// Everything known about one key, read at a single point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    pub window: StoredWindow,
    pub has_submission: bool,
    pub active_reschedule: Option<Reschedule>,
}

/// Operations spanning the window store and the ledger.
///
/// Each one reads or writes both under a single guard (one transaction in a
/// durable backend).
#[async_trait]
pub trait ScheduleTransactions: Send + Sync {
    /// Consistent read of the window, the submission flag and the active reschedule.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no window was ever assigned
    async fn snapshot(&self, key: ScheduleKey) -> RepositoryResult<ScheduleSnapshot>;

    /// Swap the window of `entry.key` from `expected` to `entry.new_window`
    /// and record `entry`; the ledger assigns its id.
    ///
    /// Nothing is written unless both succeed.
    ///
    /// # Returns
    /// * `Ok((StoredWindow, Reschedule))` - The new row and the recorded entry
    /// * `Err(RepositoryError::Conflict)` - If the row changed since `expected` was read,
    ///   or the key already has an active reschedule
    /// * `Err(RepositoryError::NotFound)` - If the key has no window
    async fn apply_reschedule(
        &self,
        expected: &StoredWindow,
        entry: NewReschedule,
    ) -> RepositoryResult<(StoredWindow, Reschedule)>;

    /// Put back the original window of reschedule `id` and mark it cancelled.
    ///
    /// Nothing is written unless both succeed.
    ///
    /// # Returns
    /// * `Ok((StoredWindow, Reschedule))` - The restored row and the cancelled entry
    /// * `Err(RepositoryError::Conflict)` - If the entry is already cancelled, or the
    ///   window is no longer the entry's new window
    /// * `Err(RepositoryError::NotFound)` - If `id` is unknown
    async fn cancel_reschedule(
        &self,
        id: RescheduleId,
        cancelled_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> RepositoryResult<(StoredWindow, Reschedule)>;
}

/// Everything the gateway needs from a single backend.
pub trait FullRepository:
    WindowStore + RescheduleLedger + SubmissionLookup + ScheduleTransactions
{
}

// Blanket implementation: any type implementing all four traits is a FullRepository
impl<T> FullRepository for T where
    T: WindowStore + RescheduleLedger + SubmissionLookup + ScheduleTransactions
{
}
