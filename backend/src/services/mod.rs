//! Service layer: access evaluation, reschedule coordination and the
//! polling gateway that fronts them.
//!
//! Services sit between the HTTP layer and the repositories. Only
//! [`gateway`] reads the clock; everything below it takes `now` explicitly.

pub mod access_evaluator;
pub mod error;
pub mod gateway;
pub mod reschedule;
pub mod validation;

pub use access_evaluator::evaluate;
pub use error::{AccessError, AccessResult};
pub use gateway::PollingGateway;
pub use reschedule::{
    AppliedReschedule, RescheduleCoordinator, RescheduleProposal, RescheduleRequest,
};
pub use validation::{ValidationIssue, ValidationReport, ValidationRule};
