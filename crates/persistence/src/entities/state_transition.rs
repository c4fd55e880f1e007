//! State transition audit-log entity (append-only, defense-in-depth).
//!
//! Written in the same transaction as every state-machine-validated status
//! write by `repositories::*::validate_and_record`, never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the `state_transitions` table.
#[derive(Debug, Clone, FromRow)]
pub struct StateTransitionEntity {
    pub id: Uuid,
    pub entity_kind: String,
    pub entity_id: Uuid,
    pub from_state: String,
    pub to_state: String,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transition_entity_carries_the_audited_edge() {
        let entity = StateTransitionEntity {
            id: Uuid::new_v4(),
            entity_kind: "ride".into(),
            entity_id: Uuid::new_v4(),
            from_state: "REQUESTED".into(),
            to_state: "MATCHING".into(),
            occurred_at: Utc::now(),
        };
        assert_eq!(entity.entity_kind, "ride");
        assert_eq!(entity.from_state, "REQUESTED");
    }
}
