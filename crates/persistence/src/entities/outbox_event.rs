//! Outbox event entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{AggregateType, OutboxEvent};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `outbox_events` table.
#[derive(Debug, Clone, FromRow)]
pub struct OutboxEventEntity {
    pub id: Uuid,
    pub aggregate_type: AggregateType,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<OutboxEventEntity> for OutboxEvent {
    fn from(entity: OutboxEventEntity) -> Self {
        Self {
            id: entity.id,
            aggregate_type: entity.aggregate_type,
            aggregate_id: entity.aggregate_id,
            event_type: entity.event_type,
            payload: entity.payload,
            processed: entity.processed,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_event_entity_converts_to_domain() {
        let entity = OutboxEventEntity {
            id: Uuid::new_v4(),
            aggregate_type: AggregateType::Payment,
            aggregate_id: Uuid::new_v4(),
            event_type: "PAYMENT_CREATED".into(),
            payload: serde_json::json!({"amount": "25.00"}),
            processed: false,
            created_at: Utc::now(),
        };
        let event: OutboxEvent = entity.clone().into();
        assert_eq!(event.event_type, "PAYMENT_CREATED");
        assert!(!event.processed);
    }
}
