//! Payment endpoints and the PSP webhook (Payment Service).

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use domain::models::{CreatePaymentRequest, PaymentResponse};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OptionalIdempotencyKey;

pub const PSP_SIGNATURE_HEADER: &str = "X-PSP-Signature";

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let response = state.payment_service.get_payment(payment_id).await?;
    Ok(Json(response))
}

/// POST /api/v1/payments ("Create payment").
pub async fn create_payment(
    State(state): State<AppState>,
    OptionalIdempotencyKey(idempotency_key): OptionalIdempotencyKey,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    if let Some(key) = &idempotency_key {
        if let Some(cached) = state.idempotency_keys.find_by_hash(&key.hash).await? {
            let response: PaymentResponse = serde_json::from_value(cached.response_body)
                .map_err(|e| ApiError::Internal(format!("corrupt idempotency cache entry: {e}")))?;
            return Ok((
                StatusCode::from_u16(cached.response_status as u16)
                    .unwrap_or(StatusCode::CREATED),
                Json(response),
            ));
        }
    }

    let response = state.payment_service.create_payment(request.trip_id).await?;

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

/// POST /api/v1/payments/webhook ("PSP webhook").
///
/// Takes the raw body rather than a parsed `Json<T>` extractor since the HMAC
/// signature in `X-PSP-Signature` is computed over the exact bytes the PSP
/// sent, not over a round-tripped re-serialization.
pub async fn psp_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    raw_payload: String,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get(PSP_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {PSP_SIGNATURE_HEADER} header")))?;

    state
        .payment_service
        .finalize_from_webhook(&raw_payload, signature)
        .await?;

    Ok(StatusCode::OK)
}
