use crate::db::repository::RepositoryError;
use crate::services::validation::ValidationReport;

pub type AccessResult<T> = Result<T, AccessError>;

/// Failures surfaced by the coordinator and the gateway.
///
/// Each error is local to one request; nothing needs to be rolled back by
/// the caller.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Client-fixable; reported verbatim, never retried automatically.
    #[error("Reschedule rejected: {0}")]
    Validation(ValidationReport),

    /// Lost a compare-and-swap. Re-fetch and retry once, or ask the user to refresh.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No active window (or no reschedule) for the given key or id.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Cancellation attempted too late or on an inactive reschedule.
    #[error("Not cancellable: {0}")]
    NotCancellable(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AccessError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { message, .. } => AccessError::NotFound(message),
            RepositoryError::Conflict { message, .. } => AccessError::Conflict(message),
            RepositoryError::AlreadyExists { message, .. } => AccessError::AlreadyExists(message),
            other => AccessError::Repository(other),
        }
    }
}

impl AccessError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, AccessError::Conflict(_))
    }

    pub fn validation_report(&self) -> Option<&ValidationReport> {
        match self {
            AccessError::Validation(report) => Some(report),
            _ => None,
        }
    }
}
