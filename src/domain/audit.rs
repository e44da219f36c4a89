use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const ENTITY_TRANSACTION: &str = "transaction";
pub const ENTITY_COMMISSION: &str = "commission";

pub const ACTION_TRANSACTION_CREATED: &str = "transaction_created";
pub const ACTION_STATUS_CHANGED: &str = "status_changed";
pub const ACTION_COMMISSION_CREATED: &str = "commission_created";
pub const ACTION_COMMISSION_ADJUSTED: &str = "commission_adjusted";
pub const ACTION_COMMISSION_VOIDED: &str = "commission_voided";
pub const ACTION_INSTALLMENTS_GENERATED: &str = "installments_generated";

/// Append-only record of a state-changing action. The structured
/// previous/new snapshots are the authoritative change history.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub previous_state: Value,
    pub new_state: Value,
    pub metadata: Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        actor_id: Uuid,
        action: &str,
        entity_type: &str,
        entity_id: Uuid,
        previous_state: Value,
        new_state: Value,
        metadata: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            previous_state,
            new_state,
            metadata,
            timestamp: Utc::now(),
        }
    }
}

/// Lightweight per-agent activity feed entry, distinct from the audit
/// log: human-facing, no state snapshots.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub action: String,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn new(agent_id: Uuid, action: &str, detail: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            action: action.to_string(),
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}
