use crate::application::error_stats::ErrorRateTracker;
use crate::domain::audit::{
    ACTION_STATUS_CHANGED, ACTION_TRANSACTION_CREATED, ActivityLogEntry, AuditLogEntry,
    ENTITY_TRANSACTION,
};
use crate::domain::commission;
use crate::domain::ports::{AuditStoreRef, TransactionStoreRef};
use crate::domain::status::{ActorRole, TransactionStatus, can_transition};
use crate::domain::transaction::{
    NewTransaction, Page, Pagination, Transaction, TransactionFilter,
};
use crate::error::{EngineError, Result};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub const COMPONENT: &str = "transaction_service";

/// Orchestrates transaction CRUD: validation, state-machine gating,
/// notes, and audit emission. All lifecycle writes go through the
/// store's compare-and-swap so concurrent updates surface as version
/// conflicts instead of lost writes.
pub struct TransactionService {
    transactions: TransactionStoreRef,
    audit: AuditStoreRef,
    errors: Arc<ErrorRateTracker>,
}

impl TransactionService {
    pub fn new(
        transactions: TransactionStoreRef,
        audit: AuditStoreRef,
        errors: Arc<ErrorRateTracker>,
    ) -> Self {
        Self {
            transactions,
            audit,
            errors,
        }
    }

    /// Creates a transaction in `Draft`, whatever status the caller had
    /// in mind. A provisional commission amount is derived from the
    /// calculator when the input doesn't carry one.
    #[instrument(skip(self, input), fields(property = %input.property_ref))]
    pub async fn create_transaction(
        &self,
        input: NewTransaction,
        actor_id: Uuid,
    ) -> Result<Transaction> {
        self.track(input.validate())?;

        let commission_amount = match input.commission_amount {
            Some(amount) => amount,
            None => {
                let breakdown = commission::calculate(&commission::CommissionInput {
                    transaction_value: input.transaction_value,
                    commission_rate: input.commission_rate,
                    agent_tier: input.agent_tier,
                    co_broking: input.co_broking,
                });
                commission::round_currency(breakdown.total_commission)
            }
        };

        let now = Utc::now();
        let tx = Transaction {
            id: Uuid::new_v4(),
            transaction_date: input.transaction_date,
            property_ref: input.property_ref,
            transaction_type: input.transaction_type,
            transaction_value: input.transaction_value,
            commission_rate: input.commission_rate,
            agent_id: input.agent_id,
            co_agent_id: input.co_agent_id,
            agent_tier: input.agent_tier,
            co_broking: input.co_broking,
            status: TransactionStatus::Draft,
            version: 1,
            notes: String::new(),
            commission_amount: Some(commission_amount),
            installments_generated: false,
            payment_schedule_id: input.payment_schedule_id,
            created_at: now,
            updated_at: now,
        };

        self.track(self.transactions.insert(tx.clone()).await)?;
        self.track(
            self.audit
                .append(AuditLogEntry::new(
                    actor_id,
                    ACTION_TRANSACTION_CREATED,
                    ENTITY_TRANSACTION,
                    tx.id,
                    json!(null),
                    tx.snapshot(),
                    json!({"property_ref": tx.property_ref.clone()}),
                ))
                .await,
        )?;
        self.track(
            self.audit
                .append_activity(ActivityLogEntry::new(
                    tx.agent_id,
                    ACTION_TRANSACTION_CREATED,
                    format!("created transaction for {}", tx.property_ref),
                ))
                .await,
        )?;

        info!(id = %tx.id, "transaction created");
        Ok(tx)
    }

    /// Moves a transaction to `new_status` if the state machine allows it
    /// for `role`, appending a note line and recording before/after audit
    /// snapshots.
    #[instrument(skip(self, notes))]
    pub async fn update_transaction_status(
        &self,
        id: Uuid,
        new_status: TransactionStatus,
        actor_id: Uuid,
        role: ActorRole,
        notes: Option<&str>,
    ) -> Result<Transaction> {
        let current = self.get_transaction(id).await?;

        if !can_transition(current.status, new_status, role) {
            let err = EngineError::Forbidden {
                current: current.status,
                requested: new_status,
                role,
            };
            self.errors.record(COMPONENT, &err);
            return Err(err);
        }

        let previous = current.snapshot();
        let now = Utc::now();
        let mut updated = current.clone();
        updated.status = new_status;
        updated.updated_at = now;
        let note_text = match notes {
            Some(notes) => format!("{} -> {}: {notes}", current.status, new_status),
            None => format!("{} -> {}", current.status, new_status),
        };
        updated.append_note(now, actor_id, &note_text);

        let stored = self.track(
            self.transactions
                .compare_and_swap(id, current.version, updated)
                .await,
        )?;

        self.track(
            self.audit
                .append(AuditLogEntry::new(
                    actor_id,
                    ACTION_STATUS_CHANGED,
                    ENTITY_TRANSACTION,
                    id,
                    previous,
                    stored.snapshot(),
                    json!({"role": role, "notes": notes}),
                ))
                .await,
        )?;
        self.track(
            self.audit
                .append_activity(ActivityLogEntry::new(
                    actor_id,
                    ACTION_STATUS_CHANGED,
                    format!("{} moved to {}", stored.property_ref, new_status),
                ))
                .await,
        )?;

        info!(%id, status = %new_status, version = stored.version, "status updated");
        Ok(stored)
    }

    pub async fn get_transaction(&self, id: Uuid) -> Result<Transaction> {
        match self.transactions.get(id).await {
            Ok(Some(tx)) => Ok(tx),
            Ok(None) => Err(EngineError::not_found("transaction", id)),
            Err(err) => {
                self.errors.record(COMPONENT, &err);
                Err(err)
            }
        }
    }

    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Pagination,
    ) -> Result<Page<Transaction>> {
        self.track(self.transactions.list(filter, page).await)
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.errors.record(COMPONENT, err);
        }
        result
    }
}
