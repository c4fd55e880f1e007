//! Idempotency cache cleanup job: periodically sweeps expired
//! idempotency keys, in the same shape as the other background sweep jobs.

use persistence::repositories::idempotency_key::IdempotencyKeyRepository;

use super::scheduler::{Job, JobFrequency};

pub struct IdempotencyCleanupJob {
    keys: IdempotencyKeyRepository,
}

impl IdempotencyCleanupJob {
    pub fn new(keys: IdempotencyKeyRepository) -> Self {
        Self { keys }
    }
}

#[async_trait::async_trait]
impl Job for IdempotencyCleanupJob {
    fn name(&self) -> &'static str {
        "idempotency_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .keys
            .delete_expired()
            .await
            .map_err(|e| format!("delete_expired failed: {e}"))?;
        if deleted > 0 {
            tracing::info!(deleted, "idempotency_cleanup: removed expired keys");
        }
        Ok(())
    }
}
