//! Trip entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Trip, TripStatus};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `trips` table.
#[derive(Debug, Clone, FromRow)]
pub struct TripEntity {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub status: TripStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub distance_km: Option<Decimal>,
    pub duration_sec: Option<i32>,
    pub base_fare: Option<Decimal>,
    pub total_fare: Option<Decimal>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TripEntity> for Trip {
    fn from(entity: TripEntity) -> Self {
        Self {
            id: entity.id,
            ride_id: entity.ride_id,
            driver_id: entity.driver_id,
            status: entity.status,
            started_at: entity.started_at,
            ended_at: entity.ended_at,
            distance_km: entity.distance_km,
            duration_sec: entity.duration_sec,
            base_fare: entity.base_fare,
            total_fare: entity.total_fare,
            cancel_reason: entity.cancel_reason,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TripEntity {
        TripEntity {
            id: Uuid::new_v4(),
            ride_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            status: TripStatus::Created,
            started_at: None,
            ended_at: None,
            distance_km: None,
            duration_sec: None,
            base_fare: None,
            total_fare: None,
            cancel_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn trip_entity_converts_to_domain_trip() {
        let entity = sample();
        let trip: Trip = entity.clone().into();
        assert_eq!(trip.id, entity.id);
        assert_eq!(trip.status, TripStatus::Created);
        assert!(trip.total_fare.is_none());
    }
}
