//! Ride repository (ride intake + the assignment service's persistence half).

use chrono::{DateTime, Utc};
use domain::models::{PaymentMethod, RideStatus, RideTier};
use domain::state_machine::validate_ride;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::RideEntity;
use crate::error::RepoError;
use crate::metrics::QueryTimer;

/// Input for creating a new ride. Rides are always inserted directly into
/// MATCHING — REQUESTED is a transient intake-only state that never gets a
/// durable row.
#[derive(Debug, Clone)]
pub struct CreateRideInput {
    pub rider_id: Uuid,
    pub pickup_lat: f64,
    pub pickup_lon: f64,
    pub drop_lat: f64,
    pub drop_lon: f64,
    pub tier: RideTier,
    pub payment_method: PaymentMethod,
    pub surge_multiplier: Decimal,
}

/// Repository for ride-related database operations.
#[derive(Clone)]
pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create(&self, input: CreateRideInput) -> Result<RideEntity, RepoError> {
        let timer = QueryTimer::new("ride_create");
        let result = sqlx::query_as::<_, RideEntity>(
            r#"
            INSERT INTO rides (
                id, rider_id, pickup_lat, pickup_lon, drop_lat, drop_lon,
                tier, payment_method, status, surge_multiplier
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, rider_id, pickup_lat, pickup_lon, drop_lat, drop_lon, tier,
                      payment_method, status, surge_multiplier, assigned_driver_id,
                      assigned_at, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.rider_id)
        .bind(input.pickup_lat)
        .bind(input.pickup_lon)
        .bind(input.drop_lat)
        .bind(input.drop_lon)
        .bind(input.tier)
        .bind(input.payment_method)
        .bind(RideStatus::Matching)
        .bind(input.surge_multiplier)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RideEntity>, RepoError> {
        let row = sqlx::query_as::<_, RideEntity>(
            r#"
            SELECT id, rider_id, pickup_lat, pickup_lon, drop_lat, drop_lon, tier,
                   payment_method, status, surge_multiplier, assigned_driver_id,
                   assigned_at, created_at, updated_at
            FROM rides WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn list(
        &self,
        status_filter: Option<RideStatus>,
        limit: i64,
    ) -> Result<Vec<RideEntity>, RepoError> {
        let rows = sqlx::query_as::<_, RideEntity>(
            r#"
            SELECT id, rider_id, pickup_lat, pickup_lon, drop_lat, drop_lon, tier,
                   payment_method, status, surge_multiplier, assigned_driver_id,
                   assigned_at, created_at, updated_at
            FROM rides
            WHERE $1::ride_status IS NULL OR status = $1
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

    /// The Dispatch Worker's poll query (step 1): rides still open to
    /// matching, within the 5-minute maximum-age cutoff, oldest first.
    pub async fn poll_matching(
        &self,
        max_age: chrono::Duration,
        limit: i64,
    ) -> Result<Vec<RideEntity>, RepoError> {
        let cutoff = Utc::now() - max_age;
        let rows = sqlx::query_as::<_, RideEntity>(
            r#"
            SELECT id, rider_id, pickup_lat, pickup_lon, drop_lat, drop_lon, tier,
                   payment_method, status, surge_multiplier, assigned_driver_id,
                   assigned_at, created_at, updated_at
            FROM rides
            WHERE status = 'MATCHING' AND created_at > $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Locks a ride row `FOR UPDATE` inside an open transaction.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<RideEntity>, RepoError> {
    let row = sqlx::query_as::<_, RideEntity>(
        r#"
        SELECT id, rider_id, pickup_lat, pickup_lon, drop_lat, drop_lon, tier,
               payment_method, status, surge_multiplier, assigned_driver_id,
               assigned_at, created_at, updated_at
        FROM rides WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

/// Validates `from -> to`, writes the new status, and appends an audit row.
/// Used for transitions that do not also change `assigned_driver_id`
/// (cancel, expire, complete) — assignment itself uses
/// [`assign_driver`] since it sets both fields atomically.
pub async fn validate_and_record_status(
    tx: &mut Transaction<'_, Postgres>,
    ride: &RideEntity,
    to: RideStatus,
) -> Result<RideEntity, RepoError> {
    validate_ride(ride.status, to)?;

    let updated = sqlx::query_as::<_, RideEntity>(
        r#"
        UPDATE rides SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, rider_id, pickup_lat, pickup_lon, drop_lat, drop_lon, tier,
                  payment_method, status, surge_multiplier, assigned_driver_id,
                  assigned_at, created_at, updated_at
        "#,
    )
    .bind(ride.id)
    .bind(to)
    .fetch_one(&mut **tx)
    .await?;

    record_transition(tx, ride.id, ride.status, to).await?;
    Ok(updated)
}

/// `assign`: validates MATCHING -> DRIVER_ASSIGNED, writes `assigned_driver_id`
/// and `assigned_at`, relying on the `rides.assigned_driver_id` unique constraint
/// to reject a concurrently-assigned driver as `RepoError::Conflict`.
pub async fn assign_driver(
    tx: &mut Transaction<'_, Postgres>,
    ride: &RideEntity,
    driver_id: Uuid,
    assigned_at: DateTime<Utc>,
) -> Result<RideEntity, RepoError> {
    validate_ride(ride.status, RideStatus::DriverAssigned)?;

    let updated = sqlx::query_as::<_, RideEntity>(
        r#"
        UPDATE rides
        SET status = $2, assigned_driver_id = $3, assigned_at = $4, updated_at = now()
        WHERE id = $1
        RETURNING id, rider_id, pickup_lat, pickup_lon, drop_lat, drop_lon, tier,
                  payment_method, status, surge_multiplier, assigned_driver_id,
                  assigned_at, created_at, updated_at
        "#,
    )
    .bind(ride.id)
    .bind(RideStatus::DriverAssigned)
    .bind(driver_id)
    .bind(assigned_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(RepoError::from_insert)?;

    record_transition(tx, ride.id, ride.status, RideStatus::DriverAssigned).await?;
    Ok(updated)
}

async fn record_transition(
    tx: &mut Transaction<'_, Postgres>,
    ride_id: Uuid,
    from: RideStatus,
    to: RideStatus,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO state_transitions (id, entity_kind, entity_id, from_state, to_state, occurred_at)
        VALUES ($1, 'ride', $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ride_id)
    .bind(from.to_string())
    .bind(to.to_string())
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn create_ride_input_defaults_surge_to_one() {
        let input = CreateRideInput {
            rider_id: Uuid::new_v4(),
            pickup_lat: 37.7749,
            pickup_lon: -122.4194,
            drop_lat: 37.8049,
            drop_lon: -122.4094,
            tier: RideTier::Economy,
            payment_method: PaymentMethod::Card,
            surge_multiplier: dec!(1.00),
        };
        assert_eq!(input.surge_multiplier, dec!(1.00));
    }
}
