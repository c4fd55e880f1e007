//! Ride Intake: validates, persists, and publishes new ride requests.

use std::sync::Arc;

use domain::models::{CreateRideRequest, DispatchEvent, Ride, RideResponse};
use domain::services::EventPublisher;
use persistence::geo::DriverGeoIndex;
use persistence::repositories::ride::{CreateRideInput, RideRepository};
use validator::Validate;

use crate::error::ApiError;
use crate::services::matching::{self, MatchPolicy};

/// Dependencies for the ride-intake flow, threaded in rather than reaching
/// for ambient globals.
pub struct RideIntakeService {
    rides: RideRepository,
    geo_index: Arc<DriverGeoIndex>,
    events: Arc<dyn EventPublisher>,
    match_policy: MatchPolicy,
}

impl RideIntakeService {
    pub fn new(
        rides: RideRepository,
        geo_index: Arc<DriverGeoIndex>,
        events: Arc<dyn EventPublisher>,
        match_policy: MatchPolicy,
    ) -> Self {
        Self {
            rides,
            geo_index,
            events,
            match_policy,
        }
    }

    /// `create`: validates the request, inserts the ride directly into
    /// MATCHING, publishes `RIDE_CREATED`, and returns the ride alongside an
    /// advisory candidate list (actual assignment is the Dispatch Worker's job).
    pub async fn create_ride(&self, request: CreateRideRequest) -> Result<RideResponse, ApiError> {
        request.validate()?;

        let input = CreateRideInput {
            rider_id: request.rider_id,
            pickup_lat: request.pickup_lat,
            pickup_lon: request.pickup_lon,
            drop_lat: request.drop_lat,
            drop_lon: request.drop_lon,
            tier: request.tier,
            payment_method: request.payment_method,
            surge_multiplier: request.surge_multiplier,
        };

        let entity = self.rides.create(input).await?;
        let ride: Ride = entity.into();

        self.events.publish(DispatchEvent::RideCreated {
            ride_id: ride.id,
            rider_id: ride.rider_id,
        });

        let candidates = matching::find_nearby(
            &self.geo_index,
            ride.pickup_lat,
            ride.pickup_lon,
            Some(ride.tier),
            self.match_policy,
        );

        let mut response: RideResponse = ride.into();
        response.candidates = Some(candidates);
        Ok(response)
    }

    pub async fn get_ride(&self, ride_id: uuid::Uuid) -> Result<RideResponse, ApiError> {
        let entity = self
            .rides
            .find_by_id(ride_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("ride {ride_id} not found")))?;
        let ride: Ride = entity.into();
        Ok(ride.into())
    }

    pub async fn list_rides(
        &self,
        status_filter: Option<domain::models::RideStatus>,
        limit: i64,
    ) -> Result<Vec<RideResponse>, ApiError> {
        let entities = self.rides.list(status_filter, limit).await?;
        Ok(entities
            .into_iter()
            .map(|e| -> Ride { e.into() })
            .map(RideResponse::from)
            .collect())
    }
}
