pub mod bootstrap;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use record::{ChangeType, FieldChange, Record, RecordError};
pub use store::{EntityStore, StoreTransaction};

use std::sync::Arc;

use crate::config::{AppConfig, StoreBackend};

/// Open the store selected by configuration
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn EntityStore>, DatabaseError> {
    match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = DatabaseManager::main_pool().await?;
            DatabaseManager::migrate(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}
