//! Outbox event repository (Outbox Worker's poll + processed-marking half).

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::OutboxEventEntity;
use crate::error::RepoError;

/// Repository for outbox-event database operations.
#[derive(Clone)]
pub struct OutboxEventRepository {
    pool: PgPool,
}

impl OutboxEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Outbox Worker step 1: up to `limit` unprocessed events, oldest first,
    /// gated on the associated payment's retry backoff
    /// (`next_retry_at IS NULL OR next_retry_at <= now()`), so a payment still
    /// inside its backoff window is skipped rather than re-examined every tick.
    pub async fn poll_unprocessed(&self, limit: i64) -> Result<Vec<OutboxEventEntity>, RepoError> {
        let rows = sqlx::query_as::<_, OutboxEventEntity>(
            r#"
            SELECT e.id, e.aggregate_type, e.aggregate_id, e.event_type, e.payload,
                   e.processed, e.created_at
            FROM outbox_events e
            JOIN payments p ON p.id = e.aggregate_id AND e.aggregate_type = 'PAYMENT'
            WHERE e.processed = false
              AND (p.next_retry_at IS NULL OR p.next_retry_at <= now())
            ORDER BY e.created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Marks every unprocessed outbox event for a given payment as processed
    /// (webhook finalization step 3 — a payment should have exactly one
    /// PAYMENT_CREATED row, but this marks by aggregate id rather than
    /// assuming cardinality one).
    pub async fn mark_processed_for_payment(&self, payment_id: Uuid) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE outbox_events
            SET processed = true
            WHERE aggregate_type = 'PAYMENT' AND aggregate_id = $1 AND processed = false
            "#,
        )
        .bind(payment_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Marks a single outbox row processed within the caller's open transaction
/// (used by the Outbox Worker after a successful PSP call or a terminal
/// failure, both of which are transactional alongside the payment write).
pub async fn mark_processed(
    tx: &mut Transaction<'_, Postgres>,
    outbox_event_id: Uuid,
) -> Result<(), RepoError> {
    sqlx::query("UPDATE outbox_events SET processed = true WHERE id = $1")
        .bind(outbox_event_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    // No pure logic to unit-test here beyond what's covered by the entity
    // conversion tests; the poll query's retry-gating behavior is covered by
    // an integration test against a live payments/outbox_events pair.
}
