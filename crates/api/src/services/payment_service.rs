//! Payment Service: payment creation and the Outbox Worker's
//! per-event PSP-call and webhook-finalization logic.

use std::sync::Arc;

use domain::models::{DispatchEvent, Payment, PaymentResponse, PaymentStatus, TripStatus};
use domain::services::EventPublisher;
use persistence::db::run_in_tx;
use persistence::repositories::outbox_event::{self, OutboxEventRepository};
use persistence::repositories::payment::{self, PaymentRepository};
use persistence::repositories::trip;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::error::ApiError;
use crate::services::psp::PspClient;

/// PSP webhook body (External Interfaces). `payload` plus
/// `signature` is verified via `shared::crypto::hmac_verify` before this is
/// ever deserialized into a trusted value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PspWebhookBody {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub psp_transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub psp_response: serde_json::Value,
}

pub struct PaymentService {
    payments: PaymentRepository,
    outbox: OutboxEventRepository,
    pool: PgPool,
    events: Arc<dyn EventPublisher>,
    psp: Arc<dyn PspClient>,
    config: PaymentConfig,
    webhook_secret: String,
}

impl PaymentService {
    pub fn new(
        payments: PaymentRepository,
        outbox: OutboxEventRepository,
        pool: PgPool,
        events: Arc<dyn EventPublisher>,
        psp: Arc<dyn PspClient>,
        config: PaymentConfig,
        webhook_secret: String,
    ) -> Self {
        Self {
            payments,
            outbox,
            pool,
            events,
            psp,
            config,
            webhook_secret,
        }
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> Result<PaymentResponse, ApiError> {
        let entity = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("payment {payment_id} not found")))?;
        let payment: Payment = entity.into();
        Ok(payment.into())
    }

    /// `create_payment`: locks the trip, requires it be ENDED with a
    /// known `total_fare`, and inserts the payment row atomically with its
    /// PAYMENT_CREATED outbox row.
    pub async fn create_payment(&self, trip_id: Uuid) -> Result<PaymentResponse, ApiError> {
        let entity = run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
            Box::pin(async move {
                let trip_entity = trip::lock_for_update(tx, trip_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound(format!("trip {trip_id} not found")))?;

                if trip_entity.status != TripStatus::Ended {
                    return Err(ApiError::Conflict(format!(
                        "trip {trip_id} is not ENDED"
                    )));
                }
                let amount = trip_entity.total_fare.ok_or_else(|| {
                    ApiError::Internal(format!(
                        "trip {trip_id} is ENDED without a total_fare"
                    ))
                })?;

                let payment_entity = payment::create_with_outbox(tx, trip_id, amount).await?;
                Ok(payment_entity)
            })
        })
        .await?;

        let payment: Payment = entity.into();
        Ok(payment.into())
    }

    /// Outbox Worker step 2-3 for one PAYMENT_CREATED event: attempts the
    /// PSP charge and records the outcome. Safe to call more than once for
    /// the same event — a payment already in PROCESSING or COMPLETED is
    /// owned by a prior PSP acceptance or the webhook respectively, and the
    /// outbox row is marked processed right here so the next poll no longer
    /// re-selects it.
    pub async fn process_payment(
        &self,
        outbox_event_id: Uuid,
        payment_id: Uuid,
    ) -> Result<(), ApiError> {
        let entity = self
            .payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("payment {payment_id} not found")))?;

        if entity.status == PaymentStatus::Completed || entity.status == PaymentStatus::Processing
        {
            run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
                Box::pin(async move {
                    outbox_event::mark_processed(tx, outbox_event_id).await?;
                    Ok(())
                })
            })
            .await?;
            return Ok(());
        }

        if entity.status != PaymentStatus::Pending {
            return Ok(());
        }

        match self.psp.charge(payment_id, entity.amount).await {
            Ok(acceptance) => {
                run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
                    Box::pin(async move {
                        payment::mark_processing(
                            tx,
                            payment_id,
                            &acceptance.psp_transaction_id,
                            acceptance.psp_response,
                        )
                        .await?;
                        Ok(())
                    })
                })
                .await?;
                crate::middleware::record_outbox_outcome("accepted");
            }
            Err(err) => {
                let next_retry_count = entity.retry_count + 1;
                if next_retry_count >= self.config.max_retries {
                    run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
                        Box::pin(async move {
                            payment::mark_failed_max_retries(tx, payment_id).await?;
                            outbox_event::mark_processed(tx, outbox_event_id).await?;
                            Ok(())
                        })
                    })
                    .await?;

                    self.events.publish(DispatchEvent::PaymentFailed {
                        payment_id,
                        trip_id: entity.trip_id,
                        reason: "max retries exceeded".into(),
                    });
                    crate::middleware::record_outbox_outcome("failed_max_retries");
                } else {
                    let next_retry_at =
                        chrono::Utc::now() + self.config.backoff_for(next_retry_count);
                    let reason = err.0;
                    run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
                        Box::pin(async move {
                            payment::record_retry_failure(tx, payment_id, next_retry_at, &reason)
                                .await?;
                            Ok(())
                        })
                    })
                    .await?;
                    crate::middleware::record_outbox_outcome("retried");
                }
            }
        }

        Ok(())
    }

    /// Webhook finalization: verifies the HMAC signature over the raw
    /// payload before trusting any of it, then moves the payment out of
    /// PROCESSING to a terminal state. A payment that is already terminal is
    /// treated as an idempotent replay and left untouched (exactly-once
    /// property c) rather than an error.
    pub async fn finalize_from_webhook(
        &self,
        raw_payload: &str,
        signature: &str,
    ) -> Result<(), ApiError> {
        if !shared::crypto::hmac_verify(raw_payload, &self.webhook_secret, signature) {
            return Err(ApiError::Unauthorized("invalid webhook signature".into()));
        }

        let body: PspWebhookBody = serde_json::from_str(raw_payload)
            .map_err(|e| ApiError::Validation(format!("malformed webhook payload: {e}")))?;

        if body.status != PaymentStatus::Completed && body.status != PaymentStatus::Failed {
            return Err(ApiError::Validation(
                "webhook status must be COMPLETED or FAILED".into(),
            ));
        }

        let payment_id = body.payment_id;
        let status = body.status;
        let psp_transaction_id = body.psp_transaction_id.clone();
        let psp_response = body.psp_response.clone();
        let failure_reason = body.failure_reason.clone();

        let outcome = run_in_tx::<_, ApiError, _>(&self.pool, move |tx| {
            Box::pin(async move {
                let entity = payment::lock_for_update(tx, payment_id)
                    .await?
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("payment {payment_id} not found"))
                    })?;

                if entity.status == PaymentStatus::Completed
                    || entity.status == PaymentStatus::Failed
                {
                    return Ok(None);
                }

                let updated = payment::finalize_from_webhook(
                    tx,
                    payment_id,
                    status,
                    psp_transaction_id.as_deref(),
                    psp_response,
                    failure_reason.as_deref(),
                )
                .await?;
                Ok(Some(updated))
            })
        })
        .await?;

        let Some(updated) = outcome else {
            return Ok(());
        };

        self.outbox.mark_processed_for_payment(payment_id).await?;

        match updated.status {
            PaymentStatus::Completed => {
                self.events.publish(DispatchEvent::PaymentCompleted {
                    payment_id,
                    trip_id: updated.trip_id,
                });
            }
            PaymentStatus::Failed => {
                self.events.publish(DispatchEvent::PaymentFailed {
                    payment_id,
                    trip_id: updated.trip_id,
                    reason: updated
                        .failure_reason
                        .unwrap_or_else(|| "payment failed".into()),
                });
            }
            PaymentStatus::Pending | PaymentStatus::Processing => unreachable!(
                "finalize_from_webhook only ever writes a terminal status"
            ),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_body_rejects_non_terminal_status_at_the_call_site() {
        // PaymentStatus itself allows PENDING/PROCESSING; finalize_from_webhook
        // is responsible for narrowing to the two terminal variants.
        assert_ne!(PaymentStatus::Pending, PaymentStatus::Completed);
    }
}
