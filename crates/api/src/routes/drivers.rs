//! Driver endpoints (Driver Registry) and driver-initiated ride acceptance
//! (Assignment Service `initialize_trip`).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    CreateDriverRequest, DriverResponse, DriverStatus, TripResponse, UpdateDriverLocationRequest,
    UpdateDriverStatusRequest,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

pub async fn create_driver(
    State(state): State<AppState>,
    Json(request): Json<CreateDriverRequest>,
) -> Result<(StatusCode, Json<DriverResponse>), ApiError> {
    let response = state.driver_registry.create_driver(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_driver(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<DriverResponse>, ApiError> {
    let response = state.driver_registry.get_driver(driver_id).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ListDriversQuery {
    pub status: Option<DriverStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_drivers(
    State(state): State<AppState>,
    Query(query): Query<ListDriversQuery>,
) -> Result<Json<Vec<DriverResponse>>, ApiError> {
    let drivers = state
        .driver_registry
        .list_drivers(query.status, query.limit)
        .await?;
    Ok(Json(drivers))
}

/// PUT /api/v1/drivers/:driver_id/location ("Update location").
///
/// Rate-limited to 120/min/driver at the router layer; the body is otherwise
/// unthrottled here to keep the fast path as cheap as possible.
pub async fn update_location(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    Json(request): Json<UpdateDriverLocationRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;
    state
        .driver_registry
        .update_location(driver_id, request.lat, request.lon)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    Json(request): Json<UpdateDriverStatusRequest>,
) -> Result<Json<DriverResponse>, ApiError> {
    let response = state
        .driver_registry
        .update_status(driver_id, request)
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct AcceptRideRequest {
    pub ride_id: Uuid,
}

/// POST /api/v1/drivers/:driver_id/accept ("Driver accept").
///
/// Initializes a trip for the ride currently assigned to this driver
/// (`initialize_trip`); returns the newly created trip.
pub async fn accept_ride(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    Json(request): Json<AcceptRideRequest>,
) -> Result<(StatusCode, Json<TripResponse>), ApiError> {
    let trip_id = state
        .assignment
        .initialize_trip(request.ride_id, driver_id)
        .await?;
    let response = state.trip_service.get_trip(trip_id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
