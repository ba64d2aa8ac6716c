//! Repository implementations module.
//!
//! - `local`: In-memory implementation for unit testing, local development and
//!   single-node deployments
#[cfg(feature = "local-repo")]
pub mod local;

#[cfg(feature = "local-repo")]
pub use local::LocalRepository;
