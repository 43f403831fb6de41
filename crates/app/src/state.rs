//! Application state shared across handlers.

use std::sync::Arc;

use services::{AppServices, ServiceError};
use storage::repository::StorageMode;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<AppServices>,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self {
            services: Arc::new(services),
        }
    }

    /// Learner writes and authoring need a real database behind them.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotConfigured` on the demo catalog.
    pub fn require_database(&self) -> Result<(), ServiceError> {
        if self.services.mode() == StorageMode::Mock {
            return Err(ServiceError::NotConfigured);
        }
        Ok(())
    }
}
