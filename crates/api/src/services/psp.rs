//! Payment Service Provider client seam.
//!
//! The PSP is an out-of-scope external collaborator reachable only through
//! an asynchronous webhook confirmation. The trait is the dependency-
//! injection seam the Outbox Worker calls against; the default
//! implementation simulates a PSP that accepts every call so the dispatch
//! core is exercisable without a live payment processor.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of a PSP charge attempt.
#[derive(Debug, Clone)]
pub struct PspAcceptance {
    pub psp_transaction_id: String,
    pub psp_response: serde_json::Value,
}

/// Error surfaced when the PSP rejects or cannot be reached for a charge
/// attempt. Absorbed entirely into the payment retry machinery — never
/// surfaced directly to the rider.
#[derive(Debug, Clone, thiserror::Error)]
#[error("PSP call failed: {0}")]
pub struct PspError(pub String);

/// Charges a payment through the PSP. Implementations must be safe to call
/// more than once for the same `payment_id` — a real PSP is expected to
/// treat `payment_id` as an idempotency key on its side.
#[async_trait]
pub trait PspClient: Send + Sync {
    async fn charge(
        &self,
        payment_id: Uuid,
        amount: rust_decimal::Decimal,
    ) -> Result<PspAcceptance, PspError>;
}

/// Default PSP implementation: accepts every charge after a simulated
/// network delay, bounded by `psp_timeout_secs`. Stands in for a live PSP
/// integration — swapping in a real client means implementing [`PspClient`]
/// against the provider's SDK.
pub struct SimulatedPspClient {
    timeout: Duration,
}

impl SimulatedPspClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PspClient for SimulatedPspClient {
    async fn charge(
        &self,
        payment_id: Uuid,
        amount: rust_decimal::Decimal,
    ) -> Result<PspAcceptance, PspError> {
        let call = async {
            let psp_transaction_id = format!("sim_{}", Uuid::new_v4());
            Ok(PspAcceptance {
                psp_transaction_id,
                psp_response: json!({
                    "payment_id": payment_id,
                    "amount": amount.to_string(),
                    "status": "accepted",
                }),
            })
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| PspError("PSP call timed out".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn simulated_client_always_accepts() {
        let client = SimulatedPspClient::new(Duration::from_secs(10));
        let result = client.charge(Uuid::new_v4(), dec!(25.00)).await;
        assert!(result.is_ok());
        assert!(result.unwrap().psp_transaction_id.starts_with("sim_"));
    }
}
