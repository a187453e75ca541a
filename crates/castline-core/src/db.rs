use std::sync::Arc;

use anyhow::{Context, Result};
use castline_types::DbPool;
use diesel::Connection;
use diesel_async::{
    async_connection_wrapper::AsyncConnectionWrapper,
    pooled_connection::{bb8::Pool, AsyncDieselConnectionManager},
    AsyncPgConnection,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const DEFAULT_MAX_POOL_SIZE: u32 = 10;

pub async fn new_db_pool(database_url: &str, max_pool_size: Option<u32>) -> Result<Arc<DbPool>> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_pool_size.unwrap_or(DEFAULT_MAX_POOL_SIZE))
        .build(manager)
        .await
        .context("Failed to create database pool")?;
    Ok(Arc::new(pool))
}

/// Apply pending migrations. Runs on a blocking thread since the migration
/// harness drives a synchronous connection.
pub async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(&database_url)
            .context("Failed to connect for migrations")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        tracing::info!("Applied {} pending migrations", applied.len());
        Ok(())
    })
    .await??;
    Ok(())
}
