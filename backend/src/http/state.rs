//! Application state for the HTTP server.

use std::sync::Arc;

use crate::services::PollingGateway;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Gateway to the access engine
    pub gateway: Arc<PollingGateway>,
}

impl AppState {
    /// Create a new application state around the given gateway.
    pub fn new(gateway: PollingGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}
