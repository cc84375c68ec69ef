//! Session store commands.
//!
//! The web service keeps sessions in `PostgreSQL` through
//! `tower-sessions-sqlx-store`. Its schema is created here rather than on
//! server startup.
//!
//! # Environment Variables
//!
//! - `COMANDA_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::session_store::ExpiredDeletion;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors from session store commands.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session store error: {0}")]
    Store(#[from] tower_sessions::session_store::Error),
}

fn database_url() -> Result<SecretString, MigrationError> {
    dotenvy::dotenv().ok();

    std::env::var("COMANDA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("COMANDA_DATABASE_URL"))
}

async fn store() -> Result<PostgresStore, MigrationError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(url.expose_secret()).await?;
    Ok(PostgresStore::new(pool))
}

/// Create the session schema and table if missing.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the DDL fails.
pub async fn run() -> Result<(), MigrationError> {
    let store = store().await?;

    tracing::info!("Creating session store schema...");
    store.migrate().await?;

    tracing::info!("Session store ready");
    Ok(())
}

/// Delete every expired session.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn purge_expired() -> Result<(), MigrationError> {
    let store = store().await?;

    store.delete_expired().await?;

    tracing::info!("Expired sessions deleted");
    Ok(())
}
