//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::AdapterCore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Adapter components shared by every connection.
    pub core: Arc<AdapterCore>,
}

impl AppState {
    /// Wraps the adapter core.
    #[must_use]
    pub const fn new(core: Arc<AdapterCore>) -> Self {
        Self { core }
    }
}
