//! Idempotency key repository: a `created_at`-based freshness window
//! in place of a stored expiry column, per the entity's documented design
//! decision.

use chrono::Duration;
use sqlx::PgPool;

use crate::entities::IdempotencyKeyEntity;
use crate::error::RepoError;

/// Repository for idempotency-key database operations.
#[derive(Clone)]
pub struct IdempotencyKeyRepository {
    pool: PgPool,
    ttl: Duration,
}

impl IdempotencyKeyRepository {
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Looks up a cached response by the hashed `Idempotency-Key`, only
    /// returning rows still within the TTL window. A miss (including an
    /// expired row) is always safe to treat as "no prior call".
    pub async fn find_by_hash(&self, key_hash: &str) -> Result<Option<IdempotencyKeyEntity>, RepoError> {
        let cutoff = chrono::Utc::now() - self.ttl;
        let row = sqlx::query_as::<_, IdempotencyKeyEntity>(
            r#"
            SELECT id, key_hash, response_body, response_status, created_at
            FROM idempotency_keys
            WHERE key_hash = $1 AND created_at > $2
            "#,
        )
        .bind(key_hash)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Stores a response under `key_hash` after a successful (2xx) handler
    /// completion. Uses `ON CONFLICT ... DO UPDATE ... RETURNING` so a
    /// racing duplicate insert returns the already-stored row (whichever
    /// request won) rather than erroring.
    pub async fn store(
        &self,
        key_hash: &str,
        response_body: serde_json::Value,
        response_status: i16,
    ) -> Result<IdempotencyKeyEntity, RepoError> {
        let row = sqlx::query_as::<_, IdempotencyKeyEntity>(
            r#"
            INSERT INTO idempotency_keys (id, key_hash, response_body, response_status, created_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (key_hash) DO UPDATE SET key_hash = idempotency_keys.key_hash
            RETURNING id, key_hash, response_body, response_status, created_at
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(key_hash)
        .bind(response_body)
        .bind(response_status)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Periodic sweep (`jobs::idempotency_cleanup`): deletes rows past TTL.
    pub async fn delete_expired(&self) -> Result<u64, RepoError> {
        let cutoff = chrono::Utc::now() - self.ttl;
        let result = sqlx::query("DELETE FROM idempotency_keys WHERE created_at <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_constructed_from_seconds() {
        let repo_ttl = Duration::seconds(300);
        assert_eq!(repo_ttl.num_seconds(), 300);
    }
}
