//! Application state for database service.

use common::config::AppConfig;
use crate::service::DatabaseService;
use crate::store::Stores;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub stores: Stores,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(config: AppConfig, stores: Stores) -> Self {
        Self { config, stores }
    }

    /// Builds the database service over the shared store.
    pub fn database_service(&self) -> DatabaseService {
        DatabaseService::new(self.stores.databases.clone())
    }
}
