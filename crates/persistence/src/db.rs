//! Database connection pool management and the transactional-closure pattern.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Creates a PostgreSQL connection pool with the given configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
}

/// Runs `f` inside a single `BEGIN`/`COMMIT` transaction, rolling back on any
/// error or panic-unwind (via `Transaction`'s `Drop` impl).
///
/// Single entry point for transactional work across the repository layer,
/// rather than a per-call-site `pool.begin()`/`tx.commit()` pair scattered
/// through each repository method — one place owns the whole lifecycle.
/// Generic over the error type (rather than fixed to
/// `sqlx::Error`) so a closure spanning multiple repositories can fail with
/// either a store error or a `domain::state_machine::InvalidTransition`,
/// as long as the caller's error type implements `From<sqlx::Error>`.
pub async fn run_in_tx<T, E, F>(pool: &PgPool, f: F) -> Result<T, E>
where
    E: From<sqlx::Error>,
    for<'c> F: FnOnce(
        &'c mut Transaction<'_, Postgres>,
    ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>,
{
    let mut tx = pool.begin().await.map_err(E::from)?;
    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(E::from)?;
            Ok(value)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}
