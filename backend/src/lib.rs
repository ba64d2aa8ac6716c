//! # Assessment Access
//!
//! Access and window scheduling engine for timed assessments.
//!
//! Every student gets one active window per assessment: a fixed writing
//! period followed by a short grace period. Clients poll the engine to learn
//! whether the student may start, continue or submit; teachers may move a
//! window before it opens and cancel that move before the new window opens.
//!
//! ## Architecture
//!
//! - [`models`]: windows, decisions, ledger entries and identifiers
//! - [`services`]: the access evaluator, reschedule validation and
//!   coordination, and the polling gateway
//! - [`db`]: repository traits and the in-memory backend
//! - [`config`]: engine settings (defaults, `access.toml`, `ACCESS_*` env)
//! - [`clock`]: injectable source of "now"
//! - [`http`]: Axum-based HTTP transport (feature `http-server`)
//!
//! Access state is never stored. Opening, closing and grace expiry are
//! computed from the window and the current instant on every poll.

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod clock;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use models::{AccessDecision, AccessStatus, AssessmentWindow, Reschedule, ScheduleKey};
pub use services::{AccessError, AccessResult, PollingGateway, RescheduleRequest};
