//! Outbox event domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of aggregate an outbox event was written against.
///
/// Only `Payment` is populated today (PAYMENT_CREATED); the enum leaves room
/// for future aggregates to adopt the same transactional-outbox discipline
/// without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "aggregate_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateType {
    Payment,
}

/// A transactional outbox row, written in the same transaction as its
/// domain row so that an externally-observed effect (driving the PSP) is
/// never attempted for a write that didn't durably commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_type: AggregateType,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// Event type constant for payment creation, written atomically with a
/// payment row.
pub const PAYMENT_CREATED: &str = "PAYMENT_CREATED";
