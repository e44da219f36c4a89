use crate::application::error_stats::ErrorRateTracker;
use crate::domain::audit::{ACTION_INSTALLMENTS_GENERATED, AuditLogEntry, ENTITY_COMMISSION};
use crate::domain::commission::round_currency;
use crate::domain::ports::{AuditStoreRef, InstallmentStoreRef, ScheduleStoreRef, TransactionStoreRef};
use crate::domain::schedule::{Commission, CommissionInstallment, InstallmentStatus};
use crate::domain::transaction::Transaction;
use crate::error::{EngineError, Result};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

pub const COMPONENT: &str = "installment_scheduler";

/// Expands an approved commission into dated installment rows from a
/// payment-schedule template.
///
/// The write is two-phase: the installment batch lands all-or-nothing,
/// then `installments_generated` is flipped through a version-checked
/// update. If the flag write loses, the batch is rolled back by
/// compensating cleanup so the flag and the rows never disagree.
pub struct InstallmentScheduler {
    transactions: TransactionStoreRef,
    installments: InstallmentStoreRef,
    schedules: ScheduleStoreRef,
    audit: AuditStoreRef,
    errors: Arc<ErrorRateTracker>,
}

impl InstallmentScheduler {
    pub fn new(
        transactions: TransactionStoreRef,
        installments: InstallmentStoreRef,
        schedules: ScheduleStoreRef,
        audit: AuditStoreRef,
        errors: Arc<ErrorRateTracker>,
    ) -> Self {
        Self {
            transactions,
            installments,
            schedules,
            audit,
            errors,
        }
    }

    /// Generates all installments for `commission` and returns the
    /// transaction with `installments_generated` set.
    pub async fn generate(
        &self,
        tx: &Transaction,
        commission: &Commission,
        actor_id: Uuid,
    ) -> Result<Transaction> {
        let outcome = self.generate_inner(tx, commission, actor_id).await;
        if let Err(err) = &outcome {
            self.errors.record(COMPONENT, err);
        }
        outcome
    }

    async fn generate_inner(
        &self,
        tx: &Transaction,
        commission: &Commission,
        actor_id: Uuid,
    ) -> Result<Transaction> {
        if tx.installments_generated {
            return Err(EngineError::Validation(format!(
                "installments already generated for transaction {}",
                tx.id
            )));
        }
        let schedule_id = tx.payment_schedule_id.ok_or_else(|| {
            EngineError::Validation(format!("transaction {} has no payment schedule", tx.id))
        })?;
        let schedule = self
            .schedules
            .get(schedule_id)
            .await?
            .ok_or_else(|| EngineError::not_found("payment schedule", schedule_id))?;

        let rows: Vec<CommissionInstallment> = schedule
            .installments
            .iter()
            .map(|line| CommissionInstallment {
                id: Uuid::new_v4(),
                commission_id: commission.id,
                number: line.number,
                amount: round_currency(
                    commission.amount * line.percentage / Decimal::ONE_HUNDRED,
                ),
                due_date: tx.transaction_date + Duration::days(line.days_offset),
                status: InstallmentStatus::Pending,
                paid_date: None,
                description: line.description.clone(),
            })
            .collect();
        let count = rows.len();

        self.installments.insert_batch(rows).await?;

        let mut updated = tx.clone();
        updated.installments_generated = true;
        updated.updated_at = Utc::now();
        let stored = match self
            .transactions
            .compare_and_swap(tx.id, tx.version, updated)
            .await
        {
            Ok(stored) => stored,
            Err(err) => {
                // Flag write lost; take the batch back out so no orphan
                // rows sit under installments_generated = false.
                if let Err(cleanup_err) =
                    self.installments.delete_by_commission(commission.id).await
                {
                    error!(
                        commission_id = %commission.id,
                        %cleanup_err,
                        "compensating cleanup failed after flag write conflict"
                    );
                }
                return Err(err);
            }
        };

        self.audit
            .append(AuditLogEntry::new(
                actor_id,
                ACTION_INSTALLMENTS_GENERATED,
                ENTITY_COMMISSION,
                commission.id,
                json!({"installments_generated": false}),
                json!({"installments_generated": true, "count": count}),
                json!({"schedule": schedule.name, "transaction_id": tx.id}),
            ))
            .await?;

        info!(
            transaction_id = %tx.id,
            commission_id = %commission.id,
            count,
            "installments generated"
        );
        Ok(stored)
    }
}
