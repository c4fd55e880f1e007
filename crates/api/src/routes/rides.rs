//! Ride endpoints (Ride Intake).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{CreateRideRequest, RideResponse, RideStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OptionalIdempotencyKey;

/// POST /api/v1/rides ("Create ride").
///
/// Honors an `Idempotency-Key` header: a replayed key within the TTL window
/// short-circuits to the previously stored response rather than creating a
/// second ride.
pub async fn create_ride(
    State(state): State<AppState>,
    OptionalIdempotencyKey(idempotency_key): OptionalIdempotencyKey,
    Json(request): Json<CreateRideRequest>,
) -> Result<(StatusCode, Json<RideResponse>), ApiError> {
    if let Some(key) = &idempotency_key {
        if let Some(cached) = state.idempotency_keys.find_by_hash(&key.hash).await? {
            let response: RideResponse = serde_json::from_value(cached.response_body)
                .map_err(|e| ApiError::Internal(format!("corrupt idempotency cache entry: {e}")))?;
            return Ok((StatusCode::from_u16(cached.response_status as u16)
                .unwrap_or(StatusCode::CREATED), Json(response)));
        }
    }

    let response = state.ride_intake.create_ride(request).await?;

    if let Some(key) = &idempotency_key {
        let body = serde_json::to_value(&response)
            .map_err(|e| ApiError::Internal(format!("failed to serialize response: {e}")))?;
        state
            .idempotency_keys
            .store(&key.hash, body, StatusCode::CREATED.as_u16() as i16)
            .await?;
    }

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<RideResponse>, ApiError> {
    let response = state.ride_intake.get_ride(ride_id).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct ListRidesQuery {
    pub status: Option<RideStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_rides(
    State(state): State<AppState>,
    Query(query): Query<ListRidesQuery>,
) -> Result<Json<Vec<RideResponse>>, ApiError> {
    let rides = state
        .ride_intake
        .list_rides(query.status, query.limit)
        .await?;
    Ok(Json(rides))
}
