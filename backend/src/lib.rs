//! Rice mill sample workflow engine
//!
//! Moves sample entries through role-owned approval stages, enforces the
//! permission matrix and the lot/inspection invariants, and freezes the
//! prices the rate engine computes along the way.

use std::sync::Arc;

use shared::PermissionMatrix;

pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult, ErrorDetail};

use cache::{CacheInvalidator, NoopInvalidator};
use config::StorageBackend;
use services::{EntryLocks, LotService, PurchaseRateService, WorkflowService};
use store::{EntryStore, MemoryStore, PgStore};

/// Application state shared by every command
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub permissions: Arc<PermissionMatrix>,
    pub workflow: WorkflowService,
    pub lots: LotService,
    pub purchase_rates: PurchaseRateService,
}

impl AppState {
    pub fn new(
        config: Config,
        permissions: PermissionMatrix,
        store: Arc<dyn EntryStore>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        let permissions = Arc::new(permissions);
        let locks = EntryLocks::new();
        Self {
            config: Arc::new(config),
            workflow: WorkflowService::new(
                store.clone(),
                permissions.clone(),
                cache.clone(),
                locks.clone(),
            ),
            lots: LotService::new(store.clone(), permissions.clone(), cache, locks),
            purchase_rates: PurchaseRateService::new(store, permissions.clone()),
            permissions,
        }
    }

    /// Build the state the configuration describes
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let permissions = config.permission_matrix()?;
        let store: Arc<dyn EntryStore> = match config.storage.backend {
            StorageBackend::Memory => {
                tracing::info!("Using in-memory store");
                Arc::new(MemoryStore::new())
            }
            StorageBackend::Postgres => {
                tracing::info!("Connecting to database...");
                let store = PgStore::connect(&config.database).await?;
                if config.environment == "development" {
                    store.ensure_schema().await?;
                }
                tracing::info!("Database connection established");
                Arc::new(store)
            }
        };
        Ok(Self::new(config, permissions, store, Arc::new(NoopInvalidator)))
    }
}
