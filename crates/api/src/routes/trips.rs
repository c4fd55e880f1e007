//! Trip endpoints (Trip Service).

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{CancelTripRequest, EndTripRequest, TripReceipt, TripResponse};
use validator::Validate;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, ApiError> {
    let response = state.trip_service.get_trip(trip_id).await?;
    Ok(Json(response))
}

pub async fn start_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, ApiError> {
    let response = state.trip_service.start(trip_id).await?;
    Ok(Json(response))
}

pub async fn pause_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, ApiError> {
    let response = state.trip_service.pause(trip_id).await?;
    Ok(Json(response))
}

pub async fn resume_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, ApiError> {
    let response = state.trip_service.resume(trip_id).await?;
    Ok(Json(response))
}

pub async fn cancel_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(request): Json<CancelTripRequest>,
) -> Result<Json<TripResponse>, ApiError> {
    request.validate()?;
    let response = state.trip_service.cancel(trip_id, request.reason).await?;
    Ok(Json(response))
}

pub async fn end_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(request): Json<EndTripRequest>,
) -> Result<Json<TripResponse>, ApiError> {
    let response = state.trip_service.end(trip_id, request).await?;
    Ok(Json(response))
}

pub async fn trip_receipt(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripReceipt>, ApiError> {
    let response = state.trip_service.receipt(trip_id).await?;
    Ok(Json(response))
}
