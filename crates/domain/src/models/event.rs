//! Live-event envelope for the fan-out bus.
//!
//! Events are emitted via a typed sum rather than a stringly-typed payload:
//! each variant below carries its own strongly-typed fields and serializes
//! to the `{type, payload}` envelope shape via `DispatchEvent::type_name`/
//! `Serialize`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::driver::DriverStatus;
use crate::models::ride::RideStatus;
use crate::models::trip::TripStatus;

/// One of the twelve event types published onto the live-event bus.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DispatchEvent {
    #[serde(rename = "RIDE_CREATED")]
    RideCreated { ride_id: Uuid, rider_id: Uuid },

    #[serde(rename = "RIDE_UPDATED")]
    RideUpdated { ride_id: Uuid, status: RideStatus },

    #[serde(rename = "DRIVER_CREATED")]
    DriverCreated { driver_id: Uuid },

    #[serde(rename = "DRIVER_STATUS_CHANGED")]
    DriverStatusChanged {
        driver_id: Uuid,
        status: DriverStatus,
    },

    #[serde(rename = "DRIVER_LOCATION_UPDATED")]
    DriverLocationUpdated {
        driver_id: Uuid,
        lat: f64,
        lon: f64,
    },

    #[serde(rename = "DRIVER_ASSIGNED")]
    DriverAssigned { ride_id: Uuid, driver_id: Uuid },

    #[serde(rename = "TRIP_ACCEPTED")]
    TripAccepted {
        trip_id: Uuid,
        ride_id: Uuid,
        driver_id: Uuid,
    },

    #[serde(rename = "TRIP_STARTED")]
    TripStarted { trip_id: Uuid, started_at: DateTime<Utc> },

    #[serde(rename = "TRIP_ENDED")]
    TripEnded {
        trip_id: Uuid,
        ride_id: Uuid,
        total_fare: Decimal,
    },

    #[serde(rename = "TRIP_RECEIPT")]
    TripReceipt { trip_id: Uuid },

    #[serde(rename = "PAYMENT_COMPLETED")]
    PaymentCompleted { payment_id: Uuid, trip_id: Uuid },

    #[serde(rename = "PAYMENT_FAILED")]
    PaymentFailed {
        payment_id: Uuid,
        trip_id: Uuid,
        reason: String,
    },
}

impl DispatchEvent {
    /// The string discriminant as it appears on the wire and in metrics labels.
    pub fn type_name(&self) -> &'static str {
        match self {
            DispatchEvent::RideCreated { .. } => "RIDE_CREATED",
            DispatchEvent::RideUpdated { .. } => "RIDE_UPDATED",
            DispatchEvent::DriverCreated { .. } => "DRIVER_CREATED",
            DispatchEvent::DriverStatusChanged { .. } => "DRIVER_STATUS_CHANGED",
            DispatchEvent::DriverLocationUpdated { .. } => "DRIVER_LOCATION_UPDATED",
            DispatchEvent::DriverAssigned { .. } => "DRIVER_ASSIGNED",
            DispatchEvent::TripAccepted { .. } => "TRIP_ACCEPTED",
            DispatchEvent::TripStarted { .. } => "TRIP_STARTED",
            DispatchEvent::TripEnded { .. } => "TRIP_ENDED",
            DispatchEvent::TripReceipt { .. } => "TRIP_RECEIPT",
            DispatchEvent::PaymentCompleted { .. } => "PAYMENT_COMPLETED",
            DispatchEvent::PaymentFailed { .. } => "PAYMENT_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_matches_serialized_tag() {
        let event = DispatchEvent::RideCreated {
            ride_id: Uuid::nil(),
            rider_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RIDE_CREATED");
        assert_eq!(event.type_name(), "RIDE_CREATED");
    }
}
