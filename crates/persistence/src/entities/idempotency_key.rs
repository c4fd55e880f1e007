//! Idempotency key entity (database row mapping).
//!
//! Freshness is evaluated by the repository via `created_at`, not a stored
//! expiry column — a `WHERE created_at > now() - interval` filter per the
//! TTL policy (300s).

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `idempotency_keys` table.
#[derive(Debug, Clone, FromRow)]
pub struct IdempotencyKeyEntity {
    pub id: Uuid,
    pub key_hash: String,
    pub response_body: Value,
    pub response_status: i16,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_entity_fields_round_trip() {
        let entity = IdempotencyKeyEntity {
            id: Uuid::new_v4(),
            key_hash: "a".repeat(64),
            response_body: serde_json::json!({"id": "ride-1"}),
            response_status: 201,
            created_at: Utc::now(),
        };
        assert_eq!(entity.key_hash.len(), 64);
        assert_eq!(entity.response_status, 201);
    }
}
