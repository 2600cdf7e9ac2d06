use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::bootstrap::ensure_superuser;
use crate::database::{DatabaseManager, EntityStore, PgStore};

#[derive(Subcommand)]
pub enum AdminCommands {
    #[command(about = "Apply the schema to the database (idempotent)")]
    Migrate {
        #[arg(long, env = "DATABASE_URL", hide_env_values = true, help = "PostgreSQL URL (defaults to configuration)")]
        database_url: Option<String>,
    },

    #[command(about = "Create the initial superuser unless the username exists")]
    Superuser {
        #[arg(help = "Username")]
        username: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, env = "PM_SUPERUSER_PASSWORD", hide_env_values = true, help = "Password")]
        password: String,
        #[arg(long, env = "DATABASE_URL", hide_env_values = true, help = "PostgreSQL URL (defaults to configuration)")]
        database_url: Option<String>,
    },
}

pub async fn handle(cmd: AdminCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AdminCommands::Migrate { database_url } => {
            let pool = connect(database_url.as_deref()).await?;
            DatabaseManager::migrate(&pool).await.context("migration failed")?;
            DatabaseManager::close_all().await;
            output_success(output_format, "Schema applied", None)
        }
        AdminCommands::Superuser { username, email, password, database_url } => {
            let pool = connect(database_url.as_deref()).await?;
            DatabaseManager::migrate(&pool).await.context("migration failed")?;
            let store: Arc<dyn EntityStore> = Arc::new(PgStore::new(pool));

            let created = ensure_superuser(store.as_ref(), &username, &email, &password).await?;
            DatabaseManager::close_all().await;

            match created {
                Some(id) => output_success(
                    output_format,
                    &format!("Superuser '{}' created", username),
                    Some(json!({ "id": id, "username": username })),
                ),
                None => output_success(
                    output_format,
                    &format!("Superuser '{}' already exists", username),
                    Some(json!({ "id": null, "username": username })),
                ),
            }
        }
    }
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<sqlx::PgPool> {
    let pool = match database_url {
        Some(url) => DatabaseManager::pool_for(url).await,
        None => DatabaseManager::main_pool().await,
    };
    pool.with_context(|| format!("cannot connect to the {:?} database", config::config().environment))
}
