use crate::application::error_stats::ErrorRateTracker;
use crate::application::scheduler::InstallmentScheduler;
use crate::domain::audit::{
    ACTION_COMMISSION_ADJUSTED, ACTION_COMMISSION_CREATED, ACTION_COMMISSION_VOIDED,
    ACTION_STATUS_CHANGED, ActivityLogEntry, AuditLogEntry, ENTITY_COMMISSION, ENTITY_TRANSACTION,
};
use crate::domain::commission::{calculate, round_currency};
use crate::domain::ports::{
    AuditStoreRef, CommissionStoreRef, RoleResolverRef, TransactionStoreRef,
};
use crate::domain::schedule::{Commission, CommissionAdjustment, CommissionStatus};
use crate::domain::status::{ActorRole, TransactionStatus, can_transition};
use crate::domain::transaction::Transaction;
use crate::error::{EngineError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub const COMPONENT: &str = "approval_workflow";

/// One entry of a batch approval request.
#[derive(Debug, Clone, Copy)]
pub struct BatchApproveItem {
    pub id: Uuid,
    pub expected_version: i64,
}

/// Per-transaction outcome of a batch approval. Failures stay inside the
/// item; they never abort the batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub id: Uuid,
    pub result: Result<Transaction>,
}

/// Version-checked approval and rejection.
///
/// Every write is conditioned on the caller's `expected_version` through
/// the store's compare-and-swap, so two actors racing on one transaction
/// resolve to exactly one winner; the loser gets a version conflict and
/// re-fetches. Commission and installment side effects run only on the
/// winning approve path.
pub struct ApprovalWorkflow {
    transactions: TransactionStoreRef,
    commissions: CommissionStoreRef,
    scheduler: InstallmentScheduler,
    audit: AuditStoreRef,
    roles: RoleResolverRef,
    errors: Arc<ErrorRateTracker>,
}

impl ApprovalWorkflow {
    pub fn new(
        transactions: TransactionStoreRef,
        commissions: CommissionStoreRef,
        scheduler: InstallmentScheduler,
        audit: AuditStoreRef,
        roles: RoleResolverRef,
        errors: Arc<ErrorRateTracker>,
    ) -> Self {
        Self {
            transactions,
            commissions,
            scheduler,
            audit,
            roles,
            errors,
        }
    }

    /// Approves a transaction: version-checked move into `Approved`,
    /// commission record creation, and installment generation when a
    /// payment schedule is attached.
    #[instrument(skip(self, notes))]
    pub async fn approve(
        &self,
        id: Uuid,
        expected_version: i64,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Transaction> {
        let outcome = self
            .approve_inner(id, expected_version, actor_id, notes)
            .await;
        if let Err(err) = &outcome {
            self.errors.record(COMPONENT, err);
        }
        outcome
    }

    async fn approve_inner(
        &self,
        id: Uuid,
        expected_version: i64,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Transaction> {
        let role = self.resolve_role(actor_id).await?;
        let current = self.load(id).await?;
        self.check_version(&current, expected_version)?;
        self.authorize(&current, TransactionStatus::Approved, role)?;

        let breakdown = calculate(&current.commission_input());
        let total = round_currency(breakdown.total_commission);

        let previous = current.snapshot();
        let now = Utc::now();
        let mut updated = current.clone();
        updated.status = TransactionStatus::Approved;
        updated.commission_amount = Some(total);
        updated.updated_at = now;
        updated.append_note(now, actor_id, &note_line("Approved", notes));

        // Sole concurrency gate: from here on this call owns the record.
        let stored = self
            .transactions
            .compare_and_swap(id, expected_version, updated)
            .await?;

        let commission = Commission {
            id: Uuid::new_v4(),
            transaction_id: id,
            agent_id: stored.agent_id,
            amount: total,
            status: CommissionStatus::Pending,
            payment_schedule_id: stored.payment_schedule_id,
            created_at: now,
        };
        self.commissions.insert(commission.clone()).await?;

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
            .await?;
        self.audit
            .append(AuditLogEntry::new(
                actor_id,
                ACTION_COMMISSION_CREATED,
                ENTITY_COMMISSION,
                commission.id,
                json!(null),
                serde_json::to_value(&breakdown)
                    .map_err(|e| EngineError::Validation(e.to_string()))?,
                json!({"transaction_id": id}),
            ))
            .await?;
        self.audit
            .append_activity(ActivityLogEntry::new(
                actor_id,
                ACTION_STATUS_CHANGED,
                format!("approved {} ({})", stored.property_ref, total),
            ))
            .await?;

        let stored = if stored.payment_schedule_id.is_some() {
            match self.scheduler.generate(&stored, &commission, actor_id).await {
                Ok(with_installments) => with_installments,
                Err(err) => {
                    self.flag_for_review(&stored, actor_id).await;
                    return Err(err);
                }
            }
        } else {
            stored
        };

        info!(%id, amount = %total, "transaction approved");
        Ok(stored)
    }

    /// Rejects a transaction. Never creates commission records; a
    /// commission generated by an earlier approval is voided in place,
    /// installment rows untouched.
    #[instrument(skip(self, notes))]
    pub async fn reject(
        &self,
        id: Uuid,
        expected_version: i64,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Transaction> {
        let outcome = self
            .reject_inner(id, expected_version, actor_id, notes)
            .await;
        if let Err(err) = &outcome {
            self.errors.record(COMPONENT, err);
        }
        outcome
    }

    async fn reject_inner(
        &self,
        id: Uuid,
        expected_version: i64,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Transaction> {
        let role = self.resolve_role(actor_id).await?;
        let current = self.load(id).await?;
        self.check_version(&current, expected_version)?;
        self.authorize(&current, TransactionStatus::Rejected, role)?;

        let previous = current.snapshot();
        let now = Utc::now();
        let mut updated = current.clone();
        updated.status = TransactionStatus::Rejected;
        updated.updated_at = now;
        updated.append_note(now, actor_id, &note_line("Rejected", notes));

        let stored = self
            .transactions
            .compare_and_swap(id, expected_version, updated)
            .await?;

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
            .await?;
        self.audit
            .append_activity(ActivityLogEntry::new(
                actor_id,
                ACTION_STATUS_CHANGED,
                format!("rejected {}", stored.property_ref),
            ))
            .await?;

        if let Some(commission) = self.commissions.get_by_transaction(id).await? {
            if commission.status != CommissionStatus::Voided {
                self.void_commission(&commission, actor_id).await?;
            }
        }

        info!(%id, "transaction rejected");
        Ok(stored)
    }

    /// Approves each id independently; one stale or bad id never rolls
    /// back the others.
    pub async fn batch_approve(
        &self,
        items: Vec<BatchApproveItem>,
        actor_id: Uuid,
        notes: Option<&str>,
    ) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            let result = self
                .approve(item.id, item.expected_version, actor_id, notes)
                .await;
            if let Err(err) = &result {
                warn!(id = %item.id, %err, "batch item failed");
            }
            outcomes.push(BatchOutcome {
                id: item.id,
                result,
            });
        }
        outcomes
    }

    /// Corrects a commission amount through an append-only adjustment
    /// record. The previous amount stays on the record; history is never
    /// rewritten.
    pub async fn adjust_commission(
        &self,
        commission_id: Uuid,
        new_amount: Decimal,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<CommissionAdjustment> {
        if new_amount < Decimal::ZERO {
            let err = EngineError::Validation("adjusted amount must not be negative".into());
            self.errors.record(COMPONENT, &err);
            return Err(err);
        }
        let commission = self
            .commissions
            .get(commission_id)
            .await?
            .ok_or_else(|| EngineError::not_found("commission", commission_id))?;

        let adjustment = CommissionAdjustment {
            id: Uuid::new_v4(),
            commission_id,
            previous_amount: commission.amount,
            new_amount,
            reason: reason.to_string(),
            adjusted_by: actor_id,
            adjusted_at: Utc::now(),
        };
        self.commissions.append_adjustment(adjustment.clone()).await?;
        self.audit
            .append(AuditLogEntry::new(
                actor_id,
                ACTION_COMMISSION_ADJUSTED,
                ENTITY_COMMISSION,
                commission_id,
                json!({"amount": commission.amount.to_string()}),
                json!({"amount": new_amount.to_string()}),
                json!({"reason": reason}),
            ))
            .await?;
        Ok(adjustment)
    }

    async fn void_commission(&self, commission: &Commission, actor_id: Uuid) -> Result<()> {
        self.commissions
            .append_adjustment(CommissionAdjustment {
                id: Uuid::new_v4(),
                commission_id: commission.id,
                previous_amount: commission.amount,
                new_amount: Decimal::ZERO,
                reason: "transaction rejected after approval".to_string(),
                adjusted_by: actor_id,
                adjusted_at: Utc::now(),
            })
            .await?;
        self.commissions
            .set_status(commission.id, CommissionStatus::Voided)
            .await?;
        self.audit
            .append(AuditLogEntry::new(
                actor_id,
                ACTION_COMMISSION_VOIDED,
                ENTITY_COMMISSION,
                commission.id,
                json!({"status": "pending", "amount": commission.amount.to_string()}),
                json!({"status": "voided", "amount": "0"}),
                json!({"transaction_id": commission.transaction_id}),
            ))
            .await?;
        Ok(())
    }

    /// Best-effort recovery after a post-approval side effect failed: tag
    /// the record for manual review. A failure here is logged and must
    /// never mask the original error.
    async fn flag_for_review(&self, stored: &Transaction, actor_id: Uuid) {
        let mut flagged = stored.clone();
        let now = Utc::now();
        flagged.updated_at = now;
        flagged.append_note(
            now,
            actor_id,
            "installment generation failed; flagged for manual review",
        );
        if let Err(recovery_err) = self
            .transactions
            .compare_and_swap(stored.id, stored.version, flagged)
            .await
        {
            error!(id = %stored.id, %recovery_err, "manual-review flagging failed");
        }
    }

    async fn resolve_role(&self, actor_id: Uuid) -> Result<ActorRole> {
        self.roles
            .resolve(actor_id)
            .await?
            .ok_or_else(|| EngineError::not_found("actor", actor_id))
    }

    async fn load(&self, id: Uuid) -> Result<Transaction> {
        self.transactions
            .get(id)
            .await?
            .ok_or_else(|| EngineError::not_found("transaction", id))
    }

    /// Fast-fail on a stale read so a concurrent modification reports as
    /// a conflict, not as an authorization error on the newer state. The
    /// store's compare-and-swap re-checks at write time regardless.
    fn check_version(&self, current: &Transaction, expected_version: i64) -> Result<()> {
        if current.version == expected_version {
            Ok(())
        } else {
            Err(EngineError::VersionConflict {
                id: current.id,
                expected: expected_version,
                actual: current.version,
            })
        }
    }

    fn authorize(
        &self,
        current: &Transaction,
        target: TransactionStatus,
        role: ActorRole,
    ) -> Result<()> {
        if can_transition(current.status, target, role) {
            Ok(())
        } else {
            Err(EngineError::Forbidden {
                current: current.status,
                requested: target,
                role,
            })
        }
    }
}

fn note_line(action: &str, notes: Option<&str>) -> String {
    match notes {
        Some(notes) => format!("{action}: {notes}"),
        None => action.to_string(),
    }
}
