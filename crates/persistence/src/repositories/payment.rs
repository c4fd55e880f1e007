//! Payment repository (Payment Service + Outbox Worker's persistence half).

use chrono::{DateTime, Utc};
use domain::models::{AggregateType, Payment, PaymentStatus, PAYMENT_CREATED};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::PaymentEntity;
use crate::error::RepoError;

/// Repository for payment-related database operations.
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentEntity>, RepoError> {
        let row = sqlx::query_as::<_, PaymentEntity>(
            r#"
            SELECT id, trip_id, amount, status, psp_transaction_id, psp_response,
                   retry_count, max_retries, last_retry_at, next_retry_at, failure_reason,
                   created_at, updated_at
            FROM payments WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_trip_id(&self, trip_id: Uuid) -> Result<Option<PaymentEntity>, RepoError> {
        let row = sqlx::query_as::<_, PaymentEntity>(
            r#"
            SELECT id, trip_id, amount, status, psp_transaction_id, psp_response,
                   retry_count, max_retries, last_retry_at, next_retry_at, failure_reason,
                   created_at, updated_at
            FROM payments WHERE trip_id = $1
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// `create_payment` steps 2-3: inserts the payment row and its
/// PAYMENT_CREATED outbox row in the caller's open transaction, atomic
/// with the domain row.
pub async fn create_with_outbox(
    tx: &mut Transaction<'_, Postgres>,
    trip_id: Uuid,
    amount: Decimal,
) -> Result<PaymentEntity, RepoError> {
    let payment = sqlx::query_as::<_, PaymentEntity>(
        r#"
        INSERT INTO payments (id, trip_id, amount, status, retry_count, max_retries)
        VALUES ($1, $2, $3, $4, 0, 3)
        RETURNING id, trip_id, amount, status, psp_transaction_id, psp_response,
                  retry_count, max_retries, last_retry_at, next_retry_at, failure_reason,
                  created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(trip_id)
    .bind(amount)
    .bind(PaymentStatus::Pending)
    .fetch_one(&mut **tx)
    .await
    .map_err(RepoError::from_insert)?;

    let domain_payment: Payment = payment.clone().into();
    let payload = serde_json::to_value(&domain_payment).unwrap_or(serde_json::Value::Null);

    sqlx::query(
        r#"
        INSERT INTO outbox_events (id, aggregate_type, aggregate_id, event_type, payload, processed)
        VALUES ($1, $2, $3, $4, $5, false)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(AggregateType::Payment)
    .bind(payment.id)
    .bind(PAYMENT_CREATED)
    .bind(payload)
    .execute(&mut **tx)
    .await?;

    Ok(payment)
}

/// Locks a payment row `FOR UPDATE` inside an open transaction.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<PaymentEntity>, RepoError> {
    let row = sqlx::query_as::<_, PaymentEntity>(
        r#"
        SELECT id, trip_id, amount, status, psp_transaction_id, psp_response,
               retry_count, max_retries, last_retry_at, next_retry_at, failure_reason,
               created_at, updated_at
        FROM payments WHERE id = $1 FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

/// Outbox Worker step: PSP accepted the call, move to PROCESSING and record
/// the PSP's transaction id + raw response. Leaves the outbox row
/// unprocessed — the webhook is the source of truth for the terminal state.
pub async fn mark_processing(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    psp_transaction_id: &str,
    psp_response: serde_json::Value,
) -> Result<PaymentEntity, RepoError> {
    let row = sqlx::query_as::<_, PaymentEntity>(
        r#"
        UPDATE payments
        SET status = $2, psp_transaction_id = $3, psp_response = $4, updated_at = now()
        WHERE id = $1
        RETURNING id, trip_id, amount, status, psp_transaction_id, psp_response,
                  retry_count, max_retries, last_retry_at, next_retry_at, failure_reason,
                  created_at, updated_at
        "#,
    )
    .bind(payment_id)
    .bind(PaymentStatus::Processing)
    .bind(psp_transaction_id)
    .bind(psp_response)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// Outbox Worker step: PSP call errored. Increments `retry_count`, stamps
/// `last_retry_at`/`next_retry_at`, and records `failure_reason`.
pub async fn record_retry_failure(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    next_retry_at: DateTime<Utc>,
    failure_reason: &str,
) -> Result<PaymentEntity, RepoError> {
    let row = sqlx::query_as::<_, PaymentEntity>(
        r#"
        UPDATE payments
        SET retry_count = retry_count + 1,
            last_retry_at = now(),
            next_retry_at = $2,
            failure_reason = $3,
            updated_at = now()
        WHERE id = $1
        RETURNING id, trip_id, amount, status, psp_transaction_id, psp_response,
                  retry_count, max_retries, last_retry_at, next_retry_at, failure_reason,
                  created_at, updated_at
        "#,
    )
    .bind(payment_id)
    .bind(next_retry_at)
    .bind(failure_reason)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// Outbox Worker step: retry budget exhausted. Terminal FAILED, independent
/// of any webhook.
pub async fn mark_failed_max_retries(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<PaymentEntity, RepoError> {
    let row = sqlx::query_as::<_, PaymentEntity>(
        r#"
        UPDATE payments
        SET status = $2, failure_reason = 'max retries exceeded', updated_at = now()
        WHERE id = $1
        RETURNING id, trip_id, amount, status, psp_transaction_id, psp_response,
                  retry_count, max_retries, last_retry_at, next_retry_at, failure_reason,
                  created_at, updated_at
        "#,
    )
    .bind(payment_id)
    .bind(PaymentStatus::Failed)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

/// Webhook finalization: moves a payment out of PROCESSING to a terminal
/// state. Status moves out of PROCESSING are irreversible, so this is a
/// plain unconditional write — the caller is expected to have already
/// checked the payment isn't already terminal.
pub async fn finalize_from_webhook(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    status: PaymentStatus,
    psp_transaction_id: Option<&str>,
    psp_response: serde_json::Value,
    failure_reason: Option<&str>,
) -> Result<PaymentEntity, RepoError> {
    let row = sqlx::query_as::<_, PaymentEntity>(
        r#"
        UPDATE payments
        SET status = $2,
            psp_transaction_id = COALESCE($3, psp_transaction_id),
            psp_response = $4,
            failure_reason = $5,
            updated_at = now()
        WHERE id = $1
        RETURNING id, trip_id, amount, status, psp_transaction_id, psp_response,
                  retry_count, max_retries, last_retry_at, next_retry_at, failure_reason,
                  created_at, updated_at
        "#,
    )
    .bind(payment_id)
    .bind(status)
    .bind(psp_transaction_id)
    .bind(psp_response)
    .bind(failure_reason)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_created_constant_matches_event_type() {
        assert_eq!(PAYMENT_CREATED, "PAYMENT_CREATED");
    }
}
