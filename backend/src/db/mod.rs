//! Storage for assessment windows and the reschedule ledger.
//!
//! This module provides abstractions for storage via the Repository pattern,
//! allowing different backends to be swapped easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Gateway (services::gateway, http)                       │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Coordinator (services::reschedule)                      │
//! │  - Validation, then one atomic swap + ledger write       │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository) - Abstract Interface     │
//! │  WindowStore / RescheduleLedger / SubmissionLookup /     │
//! │  ScheduleTransactions                                    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌──────────────────────────────────────────────┐
//!     │             Local Repository                  │
//!     │               (in-memory)                     │
//!     └──────────────────────────────────────────────┘
//! ```

#[cfg(not(feature = "local-repo"))]
compile_error!("Enable at least one repository backend feature.");

pub mod repositories;
pub mod repository;

pub use repositories::LocalRepository;
pub use repository::{
    ErrorContext, FullRepository, RepositoryError, RepositoryResult, RescheduleLedger,
    ScheduleSnapshot, ScheduleTransactions, SubmissionLookup, WindowStore,
};

use std::sync::Arc;

/// Create the repository for the enabled backend.
pub fn create_repository() -> Arc<dyn FullRepository> {
    log::info!("Using in-memory local repository");
    Arc::new(LocalRepository::new())
}
