//! Driver Registry: driver lifecycle, status transitions, and the
//! location fast-path write channel.

use std::sync::Arc;

use domain::models::{
    CreateDriverRequest, DispatchEvent, Driver, DriverResponse, DriverStatus,
    UpdateDriverStatusRequest,
};
use domain::services::EventPublisher;
use persistence::db::run_in_tx;
use persistence::geo::DriverGeoIndex;
use persistence::repositories::driver::{self, CreateDriverInput, DriverRepository};
use sqlx::PgPool;
use tokio::sync::mpsc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;

/// One coalescable location write, drained by `jobs::location_writer` with
/// per-driver last-write-wins semantics.
#[derive(Debug, Clone, Copy)]
pub struct LocationUpdate {
    pub driver_id: Uuid,
    pub lat: f64,
    pub lon: f64,
}

/// Bounded channel capacity for the location fast path. Sized generously
/// above the expected burst (~2 req/s/driver) so the writer job only needs
/// to drain faster than the sustained rate, not the instantaneous one.
pub const LOCATION_QUEUE_CAPACITY: usize = 1024;

pub struct DriverRegistryService {
    drivers: DriverRepository,
    pool: PgPool,
    geo_index: Arc<DriverGeoIndex>,
    events: Arc<dyn EventPublisher>,
    location_tx: mpsc::Sender<LocationUpdate>,
}

impl DriverRegistryService {
    pub fn new(
        drivers: DriverRepository,
        pool: PgPool,
        geo_index: Arc<DriverGeoIndex>,
        events: Arc<dyn EventPublisher>,
        location_tx: mpsc::Sender<LocationUpdate>,
    ) -> Self {
        Self {
            drivers,
            pool,
            geo_index,
            events,
            location_tx,
        }
    }

    /// `create`: inserts AVAILABLE, upserts the geo index, emits `DRIVER_CREATED`.
    pub async fn create_driver(
        &self,
        request: CreateDriverRequest,
    ) -> Result<DriverResponse, ApiError> {
        request.validate()?;

        let (lat, lon) = (request.lat, request.lon);
        let entity = self
            .drivers
            .create(CreateDriverInput {
                name: request.name,
                phone: request.phone,
                lat,
                lon,
            })
            .await?;
        let driver: Driver = entity.into();

        self.geo_index.upsert(driver.id, lon, lat);

        self.events.publish(DispatchEvent::DriverCreated {
            driver_id: driver.id,
        });

        Ok(driver.into())
    }

    pub async fn get_driver(&self, driver_id: Uuid) -> Result<DriverResponse, ApiError> {
        let entity = self
            .drivers
            .find_by_id(driver_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("driver {driver_id} not found")))?;
        let driver: Driver = entity.into();
        Ok(driver.into())
    }

    pub async fn list_drivers(
        &self,
        status_filter: Option<DriverStatus>,
        limit: i64,
    ) -> Result<Vec<DriverResponse>, ApiError> {
        let entities = self.drivers.list(status_filter, limit).await?;
        Ok(entities
            .into_iter()
            .map(|e| -> Driver { e.into() })
            .map(DriverResponse::from)
            .collect())
    }

    /// `update_location` fast path: upserts the geo index synchronously
    /// and hands the durable write off to the bounded queue. Store failures
    /// for this path are logged but never surfaced to the caller.
    pub async fn update_location(
        &self,
        driver_id: Uuid,
        lat: f64,
        lon: f64,
    ) -> Result<(), ApiError> {
        self.geo_index.upsert(driver_id, lon, lat);

        if self
            .location_tx
            .try_send(LocationUpdate { driver_id, lat, lon })
            .is_err()
        {
            tracing::warn!(
                driver_id = %driver_id,
                "location write queue full, relying on next update for a fresher write"
            );
        }

        self.events.publish(DispatchEvent::DriverLocationUpdated {
            driver_id,
            lat,
            lon,
        });

        Ok(())
    }

    /// `update_status`: validates and writes the transition, keeping the
    /// geo index's AVAILABLE-only membership consistent *before* the
    /// transaction commit is externally visible — this closes the race
    /// window where a driver could be matched against a stale index entry
    /// just after going OFFLINE or ON_TRIP.
    pub async fn update_status(
        &self,
        driver_id: Uuid,
        request: UpdateDriverStatusRequest,
    ) -> Result<DriverResponse, ApiError> {
        let target = request.status;
        let geo_index = self.geo_index.clone();

        let updated = run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
            Box::pin(async move {
                let entity = driver::lock_for_update(tx, driver_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("driver {driver_id} not found")))?;

                let updated = driver::validate_and_record_status(tx, &entity, target).await?;

                match target {
                    DriverStatus::Available => {
                        if let (Some(lat), Some(lon)) = (updated.last_lat, updated.last_lon) {
                            geo_index.upsert(driver_id, lon, lat);
                        }
                    }
                    DriverStatus::Offline | DriverStatus::OnTrip => {
                        geo_index.remove(driver_id);
                    }
                }

                Ok(updated)
            })
        })
        .await?;

        let driver: Driver = updated.into();
        self.events.publish(DispatchEvent::DriverStatusChanged {
            driver_id: driver.id,
            status: driver.status,
        });

        Ok(driver.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_queue_capacity_is_positive() {
        assert!(LOCATION_QUEUE_CAPACITY > 0);
    }
}
