//! Outbox Worker (second half): polls unprocessed PAYMENT_CREATED
//! events and drives each through `PaymentService::process_payment`.

use std::sync::Arc;

use persistence::repositories::outbox_event::OutboxEventRepository;

use crate::services::payment_service::PaymentService;

use super::scheduler::{Job, JobFrequency};

pub struct OutboxWorkerJob {
    outbox: OutboxEventRepository,
    payments: Arc<PaymentService>,
    poll_interval_secs: u64,
    batch_size: i64,
}

impl OutboxWorkerJob {
    pub fn new(
        outbox: OutboxEventRepository,
        payments: Arc<PaymentService>,
        poll_interval_secs: u64,
        batch_size: i64,
    ) -> Self {
        Self {
            outbox,
            payments,
            poll_interval_secs,
            batch_size,
        }
    }
}

#[async_trait::async_trait]
impl Job for OutboxWorkerJob {
    fn name(&self) -> &'static str {
        "outbox_worker"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.poll_interval_secs)
    }

    /// One tick: poll a batch of due PAYMENT_CREATED events, retry-gated
    /// per the outbox query, and attempt each charge in turn. A single
    /// event's failure never blocks the rest of the batch —
    /// `process_payment` owns its own retry bookkeeping.
    async fn execute(&self) -> Result<(), String> {
        let events = self
            .outbox
            .poll_unprocessed(self.batch_size)
            .await
            .map_err(|e| format!("poll_unprocessed failed: {e}"))?;

        for event in events {
            if let Err(err) = self
                .payments
                .process_payment(event.id, event.aggregate_id)
                .await
            {
                tracing::warn!(
                    outbox_event_id = %event.id,
                    payment_id = %event.aggregate_id,
                    error = %err,
                    "outbox_worker: payment processing failed"
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn job_frequency_matches_configured_poll_interval() {
        let freq = JobFrequency::Seconds(5);
        assert_eq!(freq.duration(), Duration::from_secs(5));
    }
}
