//! Trip repository (the `initialize_trip` insert half + the trip service's
//! persistence half).

use chrono::{DateTime, Utc};
use domain::fare::FareBreakdown;
use domain::models::{PaymentMethod, RideTier, TripStatus};
use domain::state_machine::validate_trip;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::TripEntity;
use crate::error::RepoError;
use crate::metrics::QueryTimer;

/// Repository for trip-related database operations.
#[derive(Clone)]
pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a trip with status CREATED (`initialize_trip` step 3). Relies
    /// on the `trips.ride_id` unique constraint and the partial-unique
    /// one-active-trip-per-driver index as a store-level defense-in-depth net.
    pub async fn create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<TripEntity, RepoError> {
        let row = sqlx::query_as::<_, TripEntity>(
            r#"
            INSERT INTO trips (id, ride_id, driver_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, ride_id, driver_id, status, started_at, ended_at,
                      distance_km, duration_sec, base_fare, total_fare, cancel_reason, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ride_id)
        .bind(driver_id)
        .bind(TripStatus::Created)
        .fetch_one(&mut **tx)
        .await
        .map_err(RepoError::from_insert)?;
        Ok(row)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TripEntity>, RepoError> {
        let timer = QueryTimer::new("trip_find_by_id");
        let row = sqlx::query_as::<_, TripEntity>(
            r#"
            SELECT id, ride_id, driver_id, status, started_at, ended_at,
                   distance_km, duration_sec, base_fare, total_fare, cancel_reason, created_at, updated_at
            FROM trips WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(row?)
    }

    /// Read-only join for `receipt`: trip + ride (tier, payment method,
    /// surge) + driver (name) + payment (status, if any).
    pub async fn receipt(&self, trip_id: Uuid) -> Result<Option<TripReceiptRow>, RepoError> {
        let row = sqlx::query_as::<_, TripReceiptRow>(
            r#"
            SELECT
                t.id AS trip_id,
                t.ride_id,
                t.driver_id,
                d.name AS driver_name,
                r.tier,
                r.payment_method,
                t.distance_km,
                t.duration_sec,
                t.base_fare,
                r.surge_multiplier,
                t.total_fare,
                t.started_at,
                t.ended_at,
                p.status AS payment_status
            FROM trips t
            JOIN rides r ON r.id = t.ride_id
            JOIN drivers d ON d.id = t.driver_id
            LEFT JOIN payments p ON p.trip_id = t.id
            WHERE t.id = $1 AND t.status = 'ENDED'
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Row shape for [`TripRepository::receipt`], one step removed from
/// `domain::models::trip::TripReceipt` (nullable fields narrowed by the
/// caller once it has confirmed the trip is ENDED).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TripReceiptRow {
    pub trip_id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub tier: RideTier,
    pub payment_method: PaymentMethod,
    pub distance_km: Option<Decimal>,
    pub duration_sec: Option<i32>,
    pub base_fare: Option<Decimal>,
    pub surge_multiplier: Decimal,
    pub total_fare: Option<Decimal>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub payment_status: Option<String>,
}

/// Locks a trip row `FOR UPDATE` inside an open transaction.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<TripEntity>, RepoError> {
    let row = sqlx::query_as::<_, TripEntity>(
        r#"
        SELECT id, ride_id, driver_id, status, started_at, ended_at,
               distance_km, duration_sec, base_fare, total_fare, cancel_reason, created_at, updated_at
        FROM trips WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

/// Validates `from -> to` and writes the new status, stamping `started_at`
/// when entering STARTED for the first time. Used for `start`/`pause`/
/// `resume`/`cancel`; `end` uses [`write_end`] since it also writes fare data.
pub async fn validate_and_record_status(
    tx: &mut Transaction<'_, Postgres>,
    trip: &TripEntity,
    to: TripStatus,
) -> Result<TripEntity, RepoError> {
    validate_trip(trip.status, to)?;

    let stamp_started = to == TripStatus::Started && trip.started_at.is_none();

    let updated = sqlx::query_as::<_, TripEntity>(
        r#"
        UPDATE trips
        SET status = $2,
            started_at = CASE WHEN $3 THEN now() ELSE started_at END,
            updated_at = now()
        WHERE id = $1
        RETURNING id, ride_id, driver_id, status, started_at, ended_at,
                  distance_km, duration_sec, base_fare, total_fare, cancel_reason, created_at, updated_at
        "#,
    )
    .bind(trip.id)
    .bind(to)
    .bind(stamp_started)
    .fetch_one(&mut **tx)
    .await?;

    record_transition(tx, trip.id, trip.status, to).await?;
    Ok(updated)
}

/// Validates `from -> CANCELLED` and writes the new status alongside the
/// optional cancellation reason, in the same statement.
pub async fn write_cancel(
    tx: &mut Transaction<'_, Postgres>,
    trip: &TripEntity,
    reason: Option<&str>,
) -> Result<TripEntity, RepoError> {
    validate_trip(trip.status, TripStatus::Cancelled)?;

    let updated = sqlx::query_as::<_, TripEntity>(
        r#"
        UPDATE trips
        SET status = $2, cancel_reason = $3, updated_at = now()
        WHERE id = $1
        RETURNING id, ride_id, driver_id, status, started_at, ended_at,
                  distance_km, duration_sec, base_fare, total_fare, cancel_reason, created_at, updated_at
        "#,
    )
    .bind(trip.id)
    .bind(TripStatus::Cancelled)
    .bind(reason)
    .fetch_one(&mut **tx)
    .await?;

    record_transition(tx, trip.id, trip.status, TripStatus::Cancelled).await?;
    Ok(updated)
}

/// Validates STARTED/PAUSED -> ENDED and writes fare + measurement data in
/// one statement: `ended_at` and `total_fare` become non-null exactly when
/// status transitions to ENDED.
pub async fn write_end(
    tx: &mut Transaction<'_, Postgres>,
    trip: &TripEntity,
    distance_km: Decimal,
    duration_sec: i32,
    fare: FareBreakdown,
) -> Result<TripEntity, RepoError> {
    validate_trip(trip.status, TripStatus::Ended)?;

    let updated = sqlx::query_as::<_, TripEntity>(
        r#"
        UPDATE trips
        SET status = $2, ended_at = now(), distance_km = $3, duration_sec = $4,
            base_fare = $5, total_fare = $6, updated_at = now()
        WHERE id = $1
        RETURNING id, ride_id, driver_id, status, started_at, ended_at,
                  distance_km, duration_sec, base_fare, total_fare, cancel_reason, created_at, updated_at
        "#,
    )
    .bind(trip.id)
    .bind(TripStatus::Ended)
    .bind(distance_km)
    .bind(duration_sec)
    .bind(fare.base_fare)
    .bind(fare.total_fare)
    .fetch_one(&mut **tx)
    .await?;

    record_transition(tx, trip.id, trip.status, TripStatus::Ended).await?;
    Ok(updated)
}

async fn record_transition(
    tx: &mut Transaction<'_, Postgres>,
    trip_id: Uuid,
    from: TripStatus,
    to: TripStatus,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO state_transitions (id, entity_kind, entity_id, from_state, to_state, occurred_at)
        VALUES ($1, 'trip', $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(trip_id)
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
    fn fare_breakdown_carries_through_to_write_end_bindings() {
        let fare = FareBreakdown {
            base_fare: dec!(25.00),
            total_fare: dec!(25.00),
        };
        assert_eq!(fare.total_fare, dec!(25.00));
    }
}
