//! Payment domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a payment.
///
/// A payment reaches COMPLETED or FAILED only via a PSP webhook or after
/// exhausting retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// A payment attached to a completed trip, driven to durable completion by
/// the Outbox Worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub psp_transaction_id: Option<String>,
    pub psp_response: Option<serde_json::Value>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload to create a payment for an ended trip (`create_payment`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub trip_id: Uuid,
}

/// Wire representation of a payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub retry_count: i32,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            trip_id: payment.trip_id,
            amount: payment.amount,
            status: payment.status,
            retry_count: payment.retry_count,
            failure_reason: payment.failure_reason,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

/// Default retry budget.
pub const DEFAULT_MAX_RETRIES: i32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_retries_matches_spec() {
        assert_eq!(DEFAULT_MAX_RETRIES, 3);
    }
}
