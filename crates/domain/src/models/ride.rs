//! Ride domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Service tier requested for a ride, with its own fare rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ride_tier", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideTier {
    Economy,
    Premium,
    Luxury,
}

/// Payment method selected by the rider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    Cash,
    Wallet,
    Upi,
}

/// Lifecycle status of a ride.
///
/// {COMPLETED, CANCELLED, EXPIRED} are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ride_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Requested,
    Matching,
    DriverAssigned,
    Completed,
    Cancelled,
    Expired,
}

impl RideStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RideStatus::Completed | RideStatus::Cancelled | RideStatus::Expired
        )
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RideStatus::Requested => "REQUESTED",
            RideStatus::Matching => "MATCHING",
            RideStatus::DriverAssigned => "DRIVER_ASSIGNED",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Cancelled => "CANCELLED",
            RideStatus::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

/// A ride request, tracked from intake through completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
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

/// Request payload to create a ride (Ride Intake).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRideRequest {
    pub rider_id: Uuid,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub pickup_lat: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub pickup_lon: f64,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub drop_lat: f64,
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub drop_lon: f64,

    pub tier: RideTier,
    pub payment_method: PaymentMethod,

    /// Externally supplied; defaults to 1.00. Surge is an input, not derived here.
    #[serde(default = "default_surge")]
    pub surge_multiplier: Decimal,
}

fn default_surge() -> Decimal {
    Decimal::ONE
}

/// One candidate returned by the Matching Service, informational on intake.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDriver {
    pub driver_id: Uuid,
    pub distance_km: f64,
}

/// Wire representation of a ride, plus advisory candidates on creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideResponse {
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<CandidateDriver>>,
}

impl From<Ride> for RideResponse {
    fn from(ride: Ride) -> Self {
        Self {
            id: ride.id,
            rider_id: ride.rider_id,
            pickup_lat: ride.pickup_lat,
            pickup_lon: ride.pickup_lon,
            drop_lat: ride.drop_lat,
            drop_lon: ride.drop_lon,
            tier: ride.tier,
            payment_method: ride.payment_method,
            status: ride.status,
            surge_multiplier: ride.surge_multiplier,
            assigned_driver_id: ride.assigned_driver_id,
            assigned_at: ride.assigned_at,
            created_at: ride.created_at,
            updated_at: ride.updated_at,
            candidates: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_match_spec_r2() {
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
        assert!(RideStatus::Expired.is_terminal());
        assert!(!RideStatus::Requested.is_terminal());
        assert!(!RideStatus::Matching.is_terminal());
        assert!(!RideStatus::DriverAssigned.is_terminal());
    }

    #[test]
    fn default_surge_is_one() {
        assert_eq!(default_surge(), Decimal::ONE);
    }

    #[test]
    fn ride_status_display_matches_wire_format() {
        assert_eq!(RideStatus::DriverAssigned.to_string(), "DRIVER_ASSIGNED");
        assert_eq!(RideStatus::Matching.to_string(), "MATCHING");
    }
}
