//! Driver repository (Driver Registry's persistence half).

use chrono::Utc;
use domain::models::DriverStatus;
use domain::state_machine::validate_driver;
use rust_decimal_macros::dec;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::DriverEntity;
use crate::error::RepoError;
use crate::metrics::QueryTimer;

/// Input for registering a new driver.
#[derive(Debug, Clone)]
pub struct CreateDriverInput {
    pub name: String,
    pub phone: String,
    pub lat: f64,
    pub lon: f64,
}

/// Repository for driver-related database operations.
#[derive(Clone)]
pub struct DriverRepository {
    pool: PgPool,
}

impl DriverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a driver with status AVAILABLE (`create`).
    pub async fn create(&self, input: CreateDriverInput) -> Result<DriverEntity, RepoError> {
        let timer = QueryTimer::new("driver_create");
        let result = sqlx::query_as::<_, DriverEntity>(
            r#"
            INSERT INTO drivers (id, name, phone, status, last_lat, last_lon, rating)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, phone, status, last_lat, last_lon, rating, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.phone)
        .bind(DriverStatus::Available)
        .bind(input.lat)
        .bind(input.lon)
        .bind(dec!(5.00))
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_insert);
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<DriverEntity>, RepoError> {
        let row = sqlx::query_as::<_, DriverEntity>(
            r#"
            SELECT id, name, phone, status, last_lat, last_lon, rating, created_at, updated_at
            FROM drivers WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list(
        &self,
        status_filter: Option<DriverStatus>,
        limit: i64,
    ) -> Result<Vec<DriverEntity>, RepoError> {
        let rows = sqlx::query_as::<_, DriverEntity>(
            r#"
            SELECT id, name, phone, status, last_lat, last_lon, rating, created_at, updated_at
            FROM drivers
            WHERE $1::driver_status IS NULL OR status = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(status_filter)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Fast-path location write (`update_location`): fire-and-forget, no
    /// state-machine validation since it isn't a status transition.
    pub async fn update_location(&self, id: Uuid, lat: f64, lon: f64) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE drivers SET last_lat = $2, last_lon = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(lat)
        .bind(lon)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drains a coalesced batch of location writes (one row per driver, the
    /// writer job having already applied last-write-wins) in a single
    /// transaction.
    pub async fn update_locations_batch(
        &self,
        updates: &[(Uuid, f64, f64)],
    ) -> Result<usize, RepoError> {
        if updates.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for (id, lat, lon) in updates {
            sqlx::query(
                r#"
                UPDATE drivers SET last_lat = $2, last_lon = $3, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(lat)
            .bind(lon)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(updates.len())
    }
}

/// Locks a driver row `FOR UPDATE` inside an open transaction.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<DriverEntity>, RepoError> {
    let row = sqlx::query_as::<_, DriverEntity>(
        r#"
        SELECT id, name, phone, status, last_lat, last_lon, rating, created_at, updated_at
        FROM drivers WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

/// Validates `from -> to` against the driver transition table, writes the new
/// status, and appends a `state_transitions` audit row — all within the
/// caller's already-open transaction, as a defense-in-depth net alongside
/// the pure state-machine validation.
pub async fn validate_and_record_status(
    tx: &mut Transaction<'_, Postgres>,
    driver: &DriverEntity,
    to: DriverStatus,
) -> Result<DriverEntity, RepoError> {
    validate_driver(driver.status, to)?;

    let updated = sqlx::query_as::<_, DriverEntity>(
        r#"
        UPDATE drivers SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, name, phone, status, last_lat, last_lon, rating, created_at, updated_at
        "#,
    )
    .bind(driver.id)
    .bind(to)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO state_transitions (id, entity_kind, entity_id, from_state, to_state, occurred_at)
        VALUES ($1, 'driver', $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(driver.id)
    .bind(driver.status.to_string())
    .bind(to.to_string())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_driver_input_carries_coordinates() {
        let input = CreateDriverInput {
            name: "Ada".into(),
            phone: "+15551230000".into(),
            lat: 37.7749,
            lon: -122.4194,
        };
        assert_eq!(input.lat, 37.7749);
        assert_eq!(input.lon, -122.4194);
    }
}
