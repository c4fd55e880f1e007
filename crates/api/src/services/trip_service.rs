//! Trip Service: trip lifecycle from STARTED through the receipt.

use std::sync::Arc;

use chrono::Utc;
use domain::fare::calculate_fare;
use domain::models::{
    DispatchEvent, DriverStatus, EndTripRequest, RideStatus, Trip, TripReceipt, TripResponse,
    TripStatus,
};
use domain::services::{EventPublisher, NotificationService};
use persistence::db::run_in_tx;
use persistence::repositories::trip::TripRepository;
use persistence::repositories::{driver, ride, trip};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

pub struct TripService {
    trips: TripRepository,
    pool: PgPool,
    events: Arc<dyn EventPublisher>,
    notifications: Arc<dyn NotificationService>,
}

impl TripService {
    pub fn new(
        trips: TripRepository,
        pool: PgPool,
        events: Arc<dyn EventPublisher>,
        notifications: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            trips,
            pool,
            events,
            notifications,
        }
    }

    pub async fn get_trip(&self, trip_id: Uuid) -> Result<TripResponse, ApiError> {
        let entity = self
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("trip {trip_id} not found")))?;
        let trip: Trip = entity.into();
        Ok(trip.into())
    }

    /// `start`: CREATED -> STARTED, stamping `started_at`.
    pub async fn start(&self, trip_id: Uuid) -> Result<TripResponse, ApiError> {
        let updated = self
            .transition(trip_id, TripStatus::Started)
            .await?;

        self.events.publish(DispatchEvent::TripStarted {
            trip_id,
            started_at: updated
                .started_at
                .expect("started_at is stamped by validate_and_record_status on entry to STARTED"),
        });

        Ok(updated.into())
    }

    /// `pause`: STARTED -> PAUSED.
    pub async fn pause(&self, trip_id: Uuid) -> Result<TripResponse, ApiError> {
        let updated = self.transition(trip_id, TripStatus::Paused).await?;
        Ok(updated.into())
    }

    /// `resume`: PAUSED -> STARTED.
    pub async fn resume(&self, trip_id: Uuid) -> Result<TripResponse, ApiError> {
        let updated = self.transition(trip_id, TripStatus::Started).await?;
        Ok(updated.into())
    }

    async fn transition(&self, trip_id: Uuid, to: TripStatus) -> Result<Trip, ApiError> {
        let updated = run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
            Box::pin(async move {
                let entity = trip::lock_for_update(tx, trip_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("trip {trip_id} not found")))?;
                let updated = trip::validate_and_record_status(tx, &entity, to).await?;
                Ok(updated)
            })
        })
        .await?;

        Ok(updated.into())
    }

    /// `cancel`: trip -> CANCELLED, driver -> AVAILABLE, ride -> CANCELLED,
    /// all in the same transaction so a reader never observes a cancelled
    /// trip whose driver still looks ON_TRIP. `reason` is stored alongside
    /// the trip for support visibility but doesn't affect the transition.
    pub async fn cancel(
        &self,
        trip_id: Uuid,
        reason: Option<String>,
    ) -> Result<TripResponse, ApiError> {
        let updated = run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
            Box::pin(async move {
                let trip_entity = trip::lock_for_update(tx, trip_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("trip {trip_id} not found")))?;
                let updated =
                    trip::write_cancel(tx, &trip_entity, reason.as_deref()).await?;

                let driver_entity = driver::lock_for_update(tx, trip_entity.driver_id)
                    .await?
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("driver {} not found", trip_entity.driver_id))
                    })?;
                driver::validate_and_record_status(tx, &driver_entity, DriverStatus::Available)
                    .await?;

                let ride_entity = ride::lock_for_update(tx, trip_entity.ride_id)
                    .await?
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("ride {} not found", trip_entity.ride_id))
                    })?;
                ride::validate_and_record_status(tx, &ride_entity, RideStatus::Cancelled).await?;

                Ok(updated)
            })
        })
        .await?;

        let driver_id = updated.driver_id;
        let ride_id = updated.ride_id;
        self.events.publish(DispatchEvent::DriverStatusChanged {
            driver_id,
            status: DriverStatus::Available,
        });
        self.events.publish(DispatchEvent::RideUpdated {
            ride_id,
            status: RideStatus::Cancelled,
        });

        let trip: Trip = updated.into();
        Ok(trip.into())
    }

    /// `end`: derives `duration_sec` from
    /// `now - started_at` when the caller omits it, defaults a missing
    /// `distance_km` to zero, computes the fare, writes it atomically with
    /// the STARTED/PAUSED -> ENDED transition, and releases the driver back
    /// to AVAILABLE and the ride to COMPLETED in the same transaction.
    pub async fn end(
        &self,
        trip_id: Uuid,
        request: EndTripRequest,
    ) -> Result<TripResponse, ApiError> {
        request.validate()?;

        let updated = run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
            Box::pin(async move {
                let trip_entity = trip::lock_for_update(tx, trip_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("trip {trip_id} not found")))?;

                let ride_entity = ride::lock_for_update(tx, trip_entity.ride_id)
                    .await?
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("ride {} not found", trip_entity.ride_id))
                    })?;

                let duration_sec = match request.duration_sec {
                    Some(d) => d,
                    None => {
                        let started_at = trip_entity.started_at.ok_or_else(|| {
                            ApiError::Conflict(format!(
                                "trip {trip_id} has no started_at to derive duration from"
                            ))
                        })?;
                        (Utc::now() - started_at).num_seconds().max(0) as i32
                    }
                };
                let distance_km = request
                    .distance_km
                    .map(Decimal::from_f64)
                    .unwrap_or(Some(Decimal::ZERO))
                    .unwrap_or(Decimal::ZERO);

                let fare = calculate_fare(
                    ride_entity.tier,
                    distance_km,
                    duration_sec as i64,
                    ride_entity.surge_multiplier,
                );

                let updated =
                    trip::write_end(tx, &trip_entity, distance_km, duration_sec, fare).await?;

                let driver_entity = driver::lock_for_update(tx, trip_entity.driver_id)
                    .await?
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("driver {} not found", trip_entity.driver_id))
                    })?;
                driver::validate_and_record_status(tx, &driver_entity, DriverStatus::Available)
                    .await?;

                ride::validate_and_record_status(tx, &ride_entity, RideStatus::Completed).await?;

                Ok(updated)
            })
        })
        .await?;

        let total_fare = updated
            .total_fare
            .expect("write_end always stamps total_fare alongside the ENDED status");
        let driver_id = updated.driver_id;
        let ride_id = updated.ride_id;

        self.events.publish(DispatchEvent::TripEnded {
            trip_id,
            ride_id,
            total_fare,
        });
        self.events.publish(DispatchEvent::DriverStatusChanged {
            driver_id,
            status: DriverStatus::Available,
        });
        self.events.publish(DispatchEvent::RideUpdated {
            ride_id,
            status: RideStatus::Completed,
        });
        self.notifications
            .notify(
                ride_id,
                "Trip complete",
                &format!("Your trip has ended. Total fare: {total_fare}"),
            )
            .await;

        let trip: Trip = updated.into();
        Ok(trip.into())
    }

    /// `receipt`: the read-only join, available only once the trip is ENDED.
    pub async fn receipt(&self, trip_id: Uuid) -> Result<TripReceipt, ApiError> {
        let row = self
            .trips
            .receipt(trip_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("receipt for trip {trip_id} not found")))?;

        self.events.publish(DispatchEvent::TripReceipt { trip_id });

        Ok(TripReceipt {
            trip_id: row.trip_id,
            ride_id: row.ride_id,
            driver_id: row.driver_id,
            driver_name: row.driver_name,
            tier: row.tier,
            payment_method: row.payment_method,
            distance_km: row.distance_km.unwrap_or(Decimal::ZERO),
            duration_sec: row.duration_sec.unwrap_or(0),
            base_fare: row.base_fare.unwrap_or(Decimal::ZERO),
            surge_multiplier: row.surge_multiplier,
            total_fare: row.total_fare.unwrap_or(Decimal::ZERO),
            started_at: row.started_at.unwrap_or_else(Utc::now),
            ended_at: row.ended_at.unwrap_or_else(Utc::now),
            payment_status: row.payment_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_request_defaults_to_zero_not_none() {
        let request = EndTripRequest {
            distance_km: None,
            duration_sec: Some(600),
        };
        let distance_km = request
            .distance_km
            .map(Decimal::from_f64)
            .unwrap_or(Some(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO);
        assert_eq!(distance_km, Decimal::ZERO);
    }
}
