//! Ride entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{PaymentMethod, Ride, RideStatus, RideTier};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `rides` table.
#[derive(Debug, Clone, FromRow)]
pub struct RideEntity {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub pickup_lat: f64,
    pub pickup_lon: f64,
    pub drop_lat: f64,
    pub drop_lon: f64,
    pub tier: RideTier,
    pub payment_method: PaymentMethod,
    pub status: RideStatus,
    pub surge_multiplier: Decimal,
    pub assigned_driver_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RideEntity> for Ride {
    fn from(entity: RideEntity) -> Self {
        Self {
            id: entity.id,
            rider_id: entity.rider_id,
            pickup_lat: entity.pickup_lat,
            pickup_lon: entity.pickup_lon,
            drop_lat: entity.drop_lat,
            drop_lon: entity.drop_lon,
            tier: entity.tier,
            payment_method: entity.payment_method,
            status: entity.status,
            surge_multiplier: entity.surge_multiplier,
            assigned_driver_id: entity.assigned_driver_id,
            assigned_at: entity.assigned_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> RideEntity {
        RideEntity {
            id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            pickup_lat: 37.7749,
            pickup_lon: -122.4194,
            drop_lat: 37.8044,
            drop_lon: -122.2712,
            tier: RideTier::Economy,
            payment_method: PaymentMethod::Card,
            status: RideStatus::Requested,
            surge_multiplier: dec!(1.00),
            assigned_driver_id: None,
            assigned_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn ride_entity_converts_to_domain_ride() {
        let entity = sample();
        let ride: Ride = entity.clone().into();
        assert_eq!(ride.id, entity.id);
        assert_eq!(ride.status, RideStatus::Requested);
        assert!(ride.assigned_driver_id.is_none());
    }
}
