// bistro_server/src/db/mod.rs

//! Pool bootstrap and the Postgres implementation of the workflow store.

pub mod pg_store;

pub use pg_store::PgStore;

use crate::config::AppConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

pub async fn connect_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
  let pool = PgPoolOptions::new()
    .max_connections(config.database_max_connections)
    .acquire_timeout(Duration::from_secs(10))
    .connect(&config.database_url)
    .await?;
  info!(max_connections = config.database_max_connections, "Database pool ready.");
  Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
  sqlx::migrate!("./migrations").run(pool).await?;
  info!("Database migrations applied.");
  Ok(())
}

/// `true` when `err` is a unique-constraint violation (SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

/// `true` when `err` is a foreign-key violation (SQLSTATE 23503).
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503"))
}
