use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::config;

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Schema applied by `migrate`; every statement is idempotent
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Centralized connection pool manager, one pool per database URL
pub struct DatabaseManager {
    pools: Arc<RwLock<HashMap<String, PgPool>>>,
}

impl DatabaseManager {
    fn instance() -> &'static DatabaseManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<DatabaseManager> = OnceLock::new();
        INSTANCE.get_or_init(|| DatabaseManager {
            pools: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Pool for the configured DATABASE_URL
    pub async fn main_pool() -> Result<PgPool, DatabaseError> {
        let url = config::config()
            .database
            .url
            .clone()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        Self::pool_for(&url).await
    }

    /// Pool for an explicit URL (used by the CLI's --database-url)
    pub async fn pool_for(url: &str) -> Result<PgPool, DatabaseError> {
        Self::validate_url(url)?;
        Self::instance().get_pool(url).await
    }

    /// Get existing pool or create a new one lazily
    async fn get_pool(&self, url: &str) -> Result<PgPool, DatabaseError> {
        // Fast path: try read lock
        {
            let pools = self.pools.read().await;
            if let Some(pool) = pools.get(url) {
                return Ok(pool.clone());
            }
        }

        let settings = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.connection_timeout))
            // Stored instants are compared as RFC 3339 text in UTC
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute("SET TIME ZONE 'UTC'").await?;
                    Ok(())
                })
            })
            .connect(url)
            .await?;

        {
            let mut pools = self.pools.write().await;
            pools.insert(url.to_string(), pool.clone());
        }

        info!("Created database pool for: {}", Self::redact(url));
        Ok(pool)
    }

    fn validate_url(url: &str) -> Result<(), DatabaseError> {
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        match parsed.scheme() {
            "postgres" | "postgresql" => Ok(()),
            _ => Err(DatabaseError::InvalidDatabaseUrl),
        }
    }

    /// Host and database only; credentials never reach the logs
    fn redact(url: &str) -> String {
        match url::Url::parse(url) {
            Ok(parsed) => format!(
                "{}{}",
                parsed.host_str().unwrap_or("localhost"),
                parsed.path()
            ),
            Err(_) => "<invalid url>".to_string(),
        }
    }

    /// Apply the schema to the given pool
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        pool.execute(SCHEMA_SQL).await?;
        info!("Database schema is up to date");
        Ok(())
    }

    /// Close and remove all pools (e.g., on shutdown)
    pub async fn close_all() {
        let manager = Self::instance();
        let mut pools = manager.pools.write().await;
        for (url, pool) in pools.drain() {
            pool.close().await;
            info!("Closed database pool: {}", Self::redact(&url));
        }
    }
}
