//! In-memory local repository implementation.
//!
//! Implements every repository trait on top of maps guarded by a single
//! lock. Each compare-and-swap checks and writes under one write guard, and
//! the [`ScheduleTransactions`] operations touch the window map and the
//! ledger under that same guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::{
    AssessmentWindow, NewReschedule, Reschedule, RescheduleId, ScheduleKey, StoredWindow,
    StudentProfileId, TeacherId,
};

/// In-memory local repository.
///
/// Suitable for unit tests, local development and single-node deployments.
/// Clones share the same underlying data.
///
/// # Example
/// ```
/// use assessment_access::db::repositories::LocalRepository;
/// use assessment_access::models::ScheduleKey;
///
/// let repo = LocalRepository::new();
/// repo.record_submission(ScheduleKey::new(1, 2));
/// assert_eq!(repo.window_count(), 0);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    windows: HashMap<ScheduleKey, StoredWindow>,
    reschedules: BTreeMap<RescheduleId, Reschedule>,
    submissions: HashSet<ScheduleKey>,

    next_reschedule_id: i64,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            windows: HashMap::new(),
            reschedules: BTreeMap::new(),
            submissions: HashSet::new(),
            next_reschedule_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Record that a submission exists for `key`.
    ///
    /// Stands in for the grading subsystem during development and tests.
    pub fn record_submission(&self, key: ScheduleKey) {
        self.data.write().submissions.insert(key);
    }

    pub fn remove_submission(&self, key: ScheduleKey) {
        self.data.write().submissions.remove(&key);
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    pub fn window_count(&self) -> usize {
        self.data.read().windows.len()
    }

    pub fn reschedule_count(&self) -> usize {
        self.data.read().reschedules.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }

    fn newest_first(mut reschedules: Vec<Reschedule>) -> Vec<Reschedule> {
        reschedules.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reschedules
    }
}

impl LocalData {
    fn window(&self, key: ScheduleKey, operation: &str) -> RepositoryResult<StoredWindow> {
        self.windows.get(&key).copied().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("No active window for {}", key),
                ErrorContext::new(operation)
                    .with_entity("window")
                    .with_entity_id(key),
            )
        })
    }

    fn reschedule(&self, id: RescheduleId, operation: &str) -> RepositoryResult<Reschedule> {
        self.reschedules.get(&id).cloned().ok_or_else(|| {
            RepositoryError::not_found_with_context(
                format!("Reschedule {} not found", id),
                ErrorContext::new(operation)
                    .with_entity("reschedule")
                    .with_entity_id(id),
            )
        })
    }

    fn active_for(&self, key: ScheduleKey) -> Option<&Reschedule> {
        self.reschedules
            .values()
            .rev()
            .find(|r| r.key == key && r.active)
    }
}

fn version_conflict(
    key: ScheduleKey,
    expected: &StoredWindow,
    current: &StoredWindow,
    operation: &str,
) -> RepositoryError {
    RepositoryError::conflict_with_context(
        format!("Window for {} changed concurrently", key),
        ErrorContext::new(operation)
            .with_entity("window")
            .with_entity_id(key)
            .with_details(format!(
                "expected_version={}, stored_version={}",
                expected.version, current.version
            )),
    )
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowStore for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn get_window(&self, key: ScheduleKey) -> RepositoryResult<StoredWindow> {
        self.check_health()?;
        self.data.read().window(key, "get_window")
    }

    async fn create_window(
        &self,
        key: ScheduleKey,
        window: AssessmentWindow,
    ) -> RepositoryResult<StoredWindow> {
        self.check_health()?;
        window
            .check()
            .map_err(|e| RepositoryError::from(e).with_operation("create_window"))?;

        let mut data = self.data.write();
        if data.windows.contains_key(&key) {
            return Err(RepositoryError::already_exists_with_context(
                format!("Window already assigned for {}", key),
                ErrorContext::new("create_window")
                    .with_entity("window")
                    .with_entity_id(key),
            ));
        }

        let stored = StoredWindow { window, version: 1 };
        data.windows.insert(key, stored);
        Ok(stored)
    }

    async fn replace_window(
        &self,
        key: ScheduleKey,
        expected: &StoredWindow,
        new_window: AssessmentWindow,
    ) -> RepositoryResult<StoredWindow> {
        self.check_health()?;
        new_window
            .check()
            .map_err(|e| RepositoryError::from(e).with_operation("replace_window"))?;

        let mut data = self.data.write();
        let current = data.window(key, "replace_window")?;
        if current != *expected {
            return Err(version_conflict(key, expected, &current, "replace_window"));
        }

        let replaced = StoredWindow {
            window: new_window,
            version: current.version + 1,
        };
        data.windows.insert(key, replaced);
        Ok(replaced)
    }
}

#[async_trait]
impl RescheduleLedger for LocalRepository {
    async fn get_reschedule(&self, id: RescheduleId) -> RepositoryResult<Reschedule> {
        self.check_health()?;
        self.data.read().reschedule(id, "get_reschedule")
    }

    async fn active_reschedule(&self, key: ScheduleKey) -> RepositoryResult<Option<Reschedule>> {
        self.check_health()?;
        Ok(self.data.read().active_for(key).cloned())
    }

    async fn list_by_teacher(
        &self,
        teacher_id: TeacherId,
        student_profile_id: Option<StudentProfileId>,
    ) -> RepositoryResult<Vec<Reschedule>> {
        self.check_health()?;
        let matches = self
            .data
            .read()
            .reschedules
            .values()
            .filter(|r| r.teacher_id == teacher_id)
            .filter(|r| student_profile_id.map_or(true, |s| r.key.student_profile_id == s))
            .cloned()
            .collect();
        Ok(Self::newest_first(matches))
    }

    async fn list_by_student(
        &self,
        student_profile_id: StudentProfileId,
    ) -> RepositoryResult<Vec<Reschedule>> {
        self.check_health()?;
        let matches = self
            .data
            .read()
            .reschedules
            .values()
            .filter(|r| r.key.student_profile_id == student_profile_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(matches))
    }

    async fn list_for_key(&self, key: ScheduleKey) -> RepositoryResult<Vec<Reschedule>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .reschedules
            .values()
            .filter(|r| r.key == key)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SubmissionLookup for LocalRepository {
    async fn has_submission(&self, key: ScheduleKey) -> RepositoryResult<bool> {
        self.check_health()?;
        Ok(self.data.read().submissions.contains(&key))
    }
}

#[async_trait]
impl ScheduleTransactions for LocalRepository {
    async fn snapshot(&self, key: ScheduleKey) -> RepositoryResult<ScheduleSnapshot> {
        self.check_health()?;
        let data = self.data.read();
        Ok(ScheduleSnapshot {
            window: data.window(key, "snapshot")?,
            has_submission: data.submissions.contains(&key),
            active_reschedule: data.active_for(key).cloned(),
        })
    }

    async fn apply_reschedule(
        &self,
        expected: &StoredWindow,
        entry: NewReschedule,
    ) -> RepositoryResult<(StoredWindow, Reschedule)> {
        self.check_health()?;
        entry
            .new_window
            .check()
            .map_err(|e| RepositoryError::from(e).with_operation("apply_reschedule"))?;

        let key = entry.key;
        let mut data = self.data.write();
        let current = data.window(key, "apply_reschedule")?;
        if current != *expected {
            return Err(version_conflict(key, expected, &current, "apply_reschedule"));
        }
        if let Some(active) = data.active_for(key) {
            return Err(RepositoryError::conflict_with_context(
                format!("Reschedule {} is already active for {}", active.id, key),
                ErrorContext::new("apply_reschedule")
                    .with_entity("reschedule")
                    .with_entity_id(key),
            ));
        }

        let window = StoredWindow {
            window: entry.new_window,
            version: current.version + 1,
        };
        let id = RescheduleId::new(data.next_reschedule_id);
        data.next_reschedule_id += 1;
        let reschedule = Reschedule::from_new(id, entry);

        data.windows.insert(key, window);
        data.reschedules.insert(id, reschedule.clone());
        Ok((window, reschedule))
    }

    async fn cancel_reschedule(
        &self,
        id: RescheduleId,
        cancelled_at: DateTime<Utc>,
        reason: Option<String>,
    ) -> RepositoryResult<(StoredWindow, Reschedule)> {
        self.check_health()?;
        let mut data = self.data.write();
        let mut reschedule = data.reschedule(id, "cancel_reschedule")?;
        if !reschedule.active {
            return Err(RepositoryError::conflict_with_context(
                format!("Reschedule {} is already cancelled", id),
                ErrorContext::new("cancel_reschedule")
                    .with_entity("reschedule")
                    .with_entity_id(id),
            ));
        }

        let key = reschedule.key;
        let current = data.window(key, "cancel_reschedule")?;
        if current.window != reschedule.new_window {
            return Err(RepositoryError::conflict_with_context(
                format!("Window for {} no longer matches reschedule {}", key, id),
                ErrorContext::new("cancel_reschedule")
                    .with_entity("window")
                    .with_entity_id(key)
                    .with_details(format!("stored_version={}", current.version)),
            ));
        }

        let restored = StoredWindow {
            window: reschedule.original_window,
            version: current.version + 1,
        };
        reschedule.active = false;
        reschedule.cancelled_at = Some(cancelled_at);
        reschedule.cancelled_reason = reason;

        data.windows.insert(key, restored);
        data.reschedules.insert(id, reschedule.clone());
        Ok((restored, reschedule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn window(h: u32) -> AssessmentWindow {
        AssessmentWindow::with_defaults(at(h, 0), &EngineConfig::default())
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);

        let created = repo.create_window(key, window(10)).await.unwrap();
        assert_eq!(created.version, 1);
        assert_eq!(repo.get_window(key).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = LocalRepository::new();
        let err = repo.get_window(ScheduleKey::new(9, 9)).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.context().operation.as_deref(), Some("get_window"));
    }

    #[tokio::test]
    async fn test_create_twice_is_already_exists() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        repo.create_window(key, window(10)).await.unwrap();

        let err = repo.create_window(key, window(12)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists { .. }));
        assert_eq!(repo.get_window(key).await.unwrap().window, window(10));
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_window() {
        let repo = LocalRepository::new();
        let bad = AssessmentWindow {
            window_start: at(11, 0),
            window_end: at(10, 0),
            grace_end: at(12, 0),
        };
        let err = repo.create_window(ScheduleKey::new(1, 1), bad).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));
        assert_eq!(repo.window_count(), 0);
    }

    #[tokio::test]
    async fn test_replace_bumps_version() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let current = repo.create_window(key, window(10)).await.unwrap();

        let replaced = repo.replace_window(key, &current, window(14)).await.unwrap();
        assert_eq!(replaced.version, 2);
        assert_eq!(replaced.window, window(14));
    }

    #[tokio::test]
    async fn test_replace_with_stale_snapshot_conflicts() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let stale = repo.create_window(key, window(10)).await.unwrap();
        repo.replace_window(key, &stale, window(14)).await.unwrap();

        let err = repo.replace_window(key, &stale, window(16)).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(err.is_retryable());
        assert_eq!(repo.get_window(key).await.unwrap().window, window(14));
    }

    #[tokio::test]
    async fn test_restored_window_still_rejects_old_snapshot() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let original = repo.create_window(key, window(10)).await.unwrap();
        let moved = repo.replace_window(key, &original, window(14)).await.unwrap();
        repo.replace_window(key, &moved, window(10)).await.unwrap();

        // Same window value as `original`, but a newer version.
        let err = repo.replace_window(key, &original, window(16)).await.unwrap_err();
        assert!(err.is_conflict());
    }

    fn entry(key: ScheduleKey, from: u32, to: u32) -> NewReschedule {
        NewReschedule {
            key,
            teacher_id: TeacherId::new(3),
            original_window: window(from),
            new_window: window(to),
            reason: "Clashes with a field trip".to_string(),
            created_at: at(8, 0),
        }
    }

    #[tokio::test]
    async fn test_apply_swaps_window_and_records_entry() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let original = repo.create_window(key, window(10)).await.unwrap();

        let (stored, r) = repo
            .apply_reschedule(&original, entry(key, 10, 14))
            .await
            .unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.window, window(14));
        assert_eq!(r.id, RescheduleId::new(1));
        assert_eq!(repo.get_window(key).await.unwrap(), stored);
        assert_eq!(repo.active_reschedule(key).await.unwrap(), Some(r));
    }

    #[tokio::test]
    async fn test_apply_with_stale_snapshot_writes_nothing() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let stale = repo.create_window(key, window(10)).await.unwrap();
        let moved = repo.replace_window(key, &stale, window(12)).await.unwrap();

        let err = repo
            .apply_reschedule(&stale, entry(key, 10, 14))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.context().operation.as_deref(), Some("apply_reschedule"));
        assert_eq!(repo.get_window(key).await.unwrap(), moved);
        assert_eq!(repo.reschedule_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_while_active_writes_nothing() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let original = repo.create_window(key, window(10)).await.unwrap();
        let (current, first) = repo
            .apply_reschedule(&original, entry(key, 10, 14))
            .await
            .unwrap();

        // Matching version, but the key already has an active entry.
        let err = repo
            .apply_reschedule(&current, entry(key, 14, 16))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.get_window(key).await.unwrap(), current);
        assert_eq!(repo.reschedule_count(), 1);
        assert_eq!(repo.active_reschedule(key).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_cancel_restores_window_and_marks_once() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let original = repo.create_window(key, window(10)).await.unwrap();
        let (_, r) = repo
            .apply_reschedule(&original, entry(key, 10, 14))
            .await
            .unwrap();

        let (restored, cancelled) = repo
            .cancel_reschedule(r.id, at(9, 0), Some("Trip cancelled".to_string()))
            .await
            .unwrap();
        assert_eq!(restored.window, window(10));
        assert_eq!(restored.version, 3);
        assert!(!cancelled.active);
        assert_eq!(cancelled.cancelled_at, Some(at(9, 0)));
        assert_eq!(repo.get_reschedule(r.id).await.unwrap(), cancelled);
        assert!(repo.active_reschedule(key).await.unwrap().is_none());

        let err = repo.cancel_reschedule(r.id, at(9, 5), None).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.get_window(key).await.unwrap(), restored);
        assert_eq!(repo.list_for_key(key).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_window_moved_writes_nothing() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let original = repo.create_window(key, window(10)).await.unwrap();
        let (current, r) = repo
            .apply_reschedule(&original, entry(key, 10, 14))
            .await
            .unwrap();
        let moved = repo.replace_window(key, &current, window(16)).await.unwrap();

        let err = repo.cancel_reschedule(r.id, at(9, 0), None).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.get_window(key).await.unwrap(), moved);
        assert!(repo.get_reschedule(r.id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_not_found() {
        let repo = LocalRepository::new();
        let err = repo
            .cancel_reschedule(RescheduleId::new(7), at(9, 0), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_snapshot_reads_everything_for_key() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(1, 1);
        let original = repo.create_window(key, window(10)).await.unwrap();

        let before = repo.snapshot(key).await.unwrap();
        assert_eq!(before.window, original);
        assert!(!before.has_submission);
        assert!(before.active_reschedule.is_none());

        let (current, r) = repo
            .apply_reschedule(&original, entry(key, 10, 14))
            .await
            .unwrap();
        repo.record_submission(key);

        let after = repo.snapshot(key).await.unwrap();
        assert_eq!(after.window, current);
        assert!(after.has_submission);
        assert_eq!(after.active_reschedule, Some(r));

        assert!(repo.snapshot(ScheduleKey::new(2, 2)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unhealthy_repository_fails_reads() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);

        assert!(!repo.health_check().await.unwrap());
        let err = repo.get_window(ScheduleKey::new(1, 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ConnectionError { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_submissions() {
        let repo = LocalRepository::new();
        let key = ScheduleKey::new(4, 5);
        assert!(!repo.has_submission(key).await.unwrap());
        repo.record_submission(key);
        assert!(repo.has_submission(key).await.unwrap());
        repo.remove_submission(key);
        assert!(!repo.has_submission(key).await.unwrap());
    }
}
