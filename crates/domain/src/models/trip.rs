//! Trip domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::ride::{PaymentMethod, RideTier};

/// Lifecycle status of a trip.
///
/// For a given driver, at most one trip with status in
/// {CREATED, STARTED, PAUSED} may exist at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Created,
    Started,
    Paused,
    Ended,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Ended | TripStatus::Cancelled)
    }

    pub fn is_active(self) -> bool {
        matches!(self, TripStatus::Created | TripStatus::Started | TripStatus::Paused)
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TripStatus::Created => "CREATED",
            TripStatus::Started => "STARTED",
            TripStatus::Paused => "PAUSED",
            TripStatus::Ended => "ENDED",
            TripStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

/// A trip, created on driver acceptance of an assigned ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
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

/// Request payload to cancel a trip (`cancel`). The reason is optional and
/// carried through for operator/rider-support visibility only — it has no
/// effect on the transition itself.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelTripRequest {
    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

/// Request payload to end a trip (`end`).
///
/// Both fields are optional: a missing `duration_sec` is derived from
/// `now - started_at`; a missing `distance_km` falls back to zero.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EndTripRequest {
    #[validate(range(min = 0.0, max = 1000.0, message = "distance_km must be within [0, 1000]"))]
    pub distance_km: Option<f64>,

    #[validate(range(min = 0, max = 86400, message = "duration_sec must be within [0, 86400]"))]
    pub duration_sec: Option<i32>,
}

/// Wire representation of a trip.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
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

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id,
            ride_id: trip.ride_id,
            driver_id: trip.driver_id,
            status: trip.status,
            started_at: trip.started_at,
            ended_at: trip.ended_at,
            distance_km: trip.distance_km,
            duration_sec: trip.duration_sec,
            base_fare: trip.base_fare,
            total_fare: trip.total_fare,
            cancel_reason: trip.cancel_reason,
            created_at: trip.created_at,
            updated_at: trip.updated_at,
        }
    }
}

/// Read-only join document produced by `receipt`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripReceipt {
    pub trip_id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub tier: RideTier,
    pub payment_method: PaymentMethod,
    pub distance_km: Decimal,
    pub duration_sec: i32,
    pub base_fare: Decimal,
    pub surge_multiplier: Decimal,
    pub total_fare: Decimal,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub payment_status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_statuses_are_created_started_and_paused() {
        assert!(TripStatus::Created.is_active());
        assert!(TripStatus::Started.is_active());
        assert!(TripStatus::Paused.is_active());
        assert!(!TripStatus::Ended.is_active());
        assert!(!TripStatus::Cancelled.is_active());
    }

    #[test]
    fn terminal_statuses() {
        assert!(TripStatus::Ended.is_terminal());
        assert!(TripStatus::Cancelled.is_terminal());
        assert!(!TripStatus::Started.is_terminal());
    }
}
