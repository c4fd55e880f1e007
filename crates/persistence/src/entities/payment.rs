//! Payment entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Payment, PaymentStatus};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `payments` table.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentEntity {
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

impl From<PaymentEntity> for Payment {
    fn from(entity: PaymentEntity) -> Self {
        Self {
            id: entity.id,
            trip_id: entity.trip_id,
            amount: entity.amount,
            status: entity.status,
            psp_transaction_id: entity.psp_transaction_id,
            psp_response: entity.psp_response,
            retry_count: entity.retry_count,
            max_retries: entity.max_retries,
            last_retry_at: entity.last_retry_at,
            next_retry_at: entity.next_retry_at,
            failure_reason: entity.failure_reason,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            amount: dec!(25.00),
            status: PaymentStatus::Pending,
            psp_transaction_id: None,
            psp_response: None,
            retry_count: 0,
            max_retries: 3,
            last_retry_at: None,
            next_retry_at: None,
            failure_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn payment_entity_converts_to_domain_payment() {
        let entity = sample();
        let payment: Payment = entity.clone().into();
        assert_eq!(payment.amount, dec!(25.00));
        assert_eq!(payment.status, PaymentStatus::Pending);
    }
}
