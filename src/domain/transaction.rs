use crate::domain::commission::{AgentTier, CoBrokingTerms, CommissionInput};
use crate::domain::status::TransactionStatus;
use crate::error::{EngineError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A brokered property transaction, the unit of contention in the engine.
///
/// Mutable lifecycle fields (`status`, `version`, `notes`,
/// `commission_amount`, `installments_generated`) change only through the
/// transaction service; `version` increases by exactly 1 on every
/// successful conditional write and never resets.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_date: NaiveDate,
    pub property_ref: String,
    pub transaction_type: String,
    pub transaction_value: Decimal,
    pub commission_rate: Decimal,
    pub agent_id: Uuid,
    pub co_agent_id: Option<Uuid>,
    pub agent_tier: AgentTier,
    pub co_broking: CoBrokingTerms,
    pub status: TransactionStatus,
    pub version: i64,
    pub notes: String,
    pub commission_amount: Option<Decimal>,
    pub installments_generated: bool,
    pub payment_schedule_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Appends a timestamped annotation to the notes log. Display
    /// convenience only; the audit trail is the authoritative history.
    pub fn append_note(&mut self, at: DateTime<Utc>, actor_id: Uuid, text: &str) {
        let line = format!("[{}] ({actor_id}) {text}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        if self.notes.is_empty() {
            self.notes = line;
        } else {
            self.notes.push('\n');
            self.notes.push_str(&line);
        }
    }

    /// Structured state snapshot for audit log entries.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status.to_string(),
            "version": self.version,
            "commission_amount": self.commission_amount.map(|a| a.to_string()),
            "installments_generated": self.installments_generated,
        })
    }

    pub fn commission_input(&self) -> CommissionInput {
        CommissionInput {
            transaction_value: self.transaction_value,
            commission_rate: self.commission_rate,
            agent_tier: self.agent_tier,
            co_broking: self.co_broking,
        }
    }
}

/// Validated input for creating a transaction. The initial status is
/// always forced to `Draft` regardless of what the caller wanted.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct NewTransaction {
    pub transaction_date: NaiveDate,
    pub property_ref: String,
    pub transaction_type: String,
    pub transaction_value: Decimal,
    pub commission_rate: Decimal,
    pub agent_id: Uuid,
    pub co_agent_id: Option<Uuid>,
    pub agent_tier: AgentTier,
    pub co_broking: CoBrokingTerms,
    pub payment_schedule_id: Option<Uuid>,
    /// Caller-supplied provisional commission; computed from the
    /// calculator when absent.
    pub commission_amount: Option<Decimal>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        if self.transaction_value <= Decimal::ZERO {
            return Err(EngineError::Validation(
                "transaction value must be positive".into(),
            ));
        }
        if self.commission_rate <= Decimal::ZERO || self.commission_rate > Decimal::ONE_HUNDRED {
            return Err(EngineError::Validation(
                "commission rate must be in (0, 100]".into(),
            ));
        }
        if self.property_ref.trim().is_empty() {
            return Err(EngineError::Validation("property reference is required".into()));
        }
        if let Some(split) = self.co_broking.commission_split {
            if split < Decimal::ONE || split > Decimal::from(99u32) {
                return Err(EngineError::Validation(
                    "co-broking split must be in [1, 99]".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Filters for the paginated transaction listing.
#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    pub statuses: Option<Vec<TransactionStatus>>,
    pub agent_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&tx.status) {
                return false;
            }
        }
        if let Some(agent_id) = self.agent_id {
            if tx.agent_id != agent_id {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if tx.transaction_date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if tx.transaction_date > to {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// One page of results plus the total count matching the filter (not the
/// page size).
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}
