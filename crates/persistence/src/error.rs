//! Repository-layer error type.
//!
//! Bridges `sqlx::Error` and `domain::state_machine::InvalidTransition` so a
//! single `run_in_tx` closure spanning several repository calls can fail with
//! either, and the `api` crate's `ApiError` can convert both into the right
//! HTTP status in one place.

use domain::state_machine::InvalidTransition;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// A unique-constraint race (`rides.assigned_driver_id`, `drivers.phone`,
    /// `trips.ride_id`/the partial-unique one-active-trip-per-driver index).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepoError {
    /// Detects a Postgres unique-violation (`23505`) and maps it to
    /// `Conflict`; any other `sqlx::Error` passes through unchanged.
    pub fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return RepoError::Conflict(db_err.message().to_string());
            }
        }
        RepoError::Db(err)
    }
}
