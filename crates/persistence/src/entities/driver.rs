//! Driver entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Driver, DriverStatus};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `drivers` table.
#[derive(Debug, Clone, FromRow)]
pub struct DriverEntity {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub status: DriverStatus,
    pub last_lat: Option<f64>,
    pub last_lon: Option<f64>,
    pub rating: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DriverEntity> for Driver {
    fn from(entity: DriverEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            phone: entity.phone,
            status: entity.status,
            last_lat: entity.last_lat,
            last_lon: entity.last_lon,
            rating: entity.rating,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> DriverEntity {
        DriverEntity {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".into(),
            phone: "+15551230000".into(),
            status: DriverStatus::Available,
            last_lat: Some(37.7749),
            last_lon: Some(-122.4194),
            rating: dec!(4.80),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn driver_entity_converts_to_domain_driver() {
        let entity = sample();
        let driver: Driver = entity.clone().into();
        assert_eq!(driver.id, entity.id);
        assert_eq!(driver.status, entity.status);
        assert_eq!(driver.rating, entity.rating);
    }
}
