//! Driver domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of a driver.
///
/// A driver is present in the geospatial index iff status = AVAILABLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "driver_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverStatus {
    Offline,
    Available,
    OnTrip,
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DriverStatus::Offline => "OFFLINE",
            DriverStatus::Available => "AVAILABLE",
            DriverStatus::OnTrip => "ON_TRIP",
        };
        write!(f, "{s}")
    }
}

/// A registered driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
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

/// Request payload to register a driver (`create`).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriverRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(min = 3, max = 32, message = "Phone must be between 3 and 32 characters"))]
    pub phone: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub lat: f64,

    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub lon: f64,
}

/// Request payload for the location fast-path (`update_location`).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriverLocationRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub lat: f64,

    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub lon: f64,
}

/// Request payload to transition a driver's status (`update_status`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriverStatusRequest {
    pub status: DriverStatus,
}

/// Wire representation of a driver returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverResponse {
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

impl From<Driver> for DriverResponse {
    fn from(driver: Driver) -> Self {
        Self {
            id: driver.id,
            name: driver.name,
            phone: driver.phone,
            status: driver.status,
            last_lat: driver.last_lat,
            last_lon: driver.last_lon,
            rating: driver.rating,
            created_at: driver.created_at,
            updated_at: driver.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_status_display_matches_wire_format() {
        assert_eq!(DriverStatus::Offline.to_string(), "OFFLINE");
        assert_eq!(DriverStatus::Available.to_string(), "AVAILABLE");
        assert_eq!(DriverStatus::OnTrip.to_string(), "ON_TRIP");
    }

    #[test]
    fn driver_response_carries_fields_through() {
        let driver = Driver {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            phone: "+15551230000".into(),
            status: DriverStatus::Available,
            last_lat: Some(37.7749),
            last_lon: Some(-122.4194),
            rating: Decimal::new(480, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let response: DriverResponse = driver.clone().into();
        assert_eq!(response.id, driver.id);
        assert_eq!(response.rating, driver.rating);
    }
}
