//! Slate persistence layer.
//!
//! sqlx/PostgreSQL repositories for the content revision and hierarchy
//! subsystem: append-only page version history and self-referencing tree
//! entities (categories, menu items). All durable state lives in the backing
//! store; repositories hold no state between calls and re-read the rows they
//! need inside their own transactional scope.

pub mod atomic;
pub mod error;
pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Build a connection pool for the given database URL.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
