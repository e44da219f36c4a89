use crate::domain::audit::{ActivityLogEntry, AuditLogEntry};
use crate::domain::ports::{
    AuditStore, CommissionStore, InstallmentStore, RoleResolver, ScheduleStore, TransactionStore,
};
use crate::domain::schedule::{
    Commission, CommissionAdjustment, CommissionInstallment, CommissionStatus, PaymentSchedule,
};
use crate::domain::status::ActorRole;
use crate::domain::transaction::{Page, Pagination, Transaction, TransactionFilter};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Thread-safe in-memory transaction store.
///
/// The compare-and-swap runs entirely under one write lock, which is the
/// in-memory equivalent of `UPDATE ... WHERE id = ? AND version = ?`.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<RwLock<HashMap<Uuid, Transaction>>>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn insert(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        transactions.insert(tx.id, tx);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(&id).cloned())
    }

    async fn list(&self, filter: &TransactionFilter, page: Pagination) -> Result<Page<Transaction>> {
        let transactions = self.transactions.read().await;
        let mut matching: Vec<Transaction> = transactions
            .values()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.transaction_date
                .cmp(&a.transaction_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Ok(Page { items, total })
    }

    async fn compare_and_swap(
        &self,
        id: Uuid,
        expected_version: i64,
        mut updated: Transaction,
    ) -> Result<Transaction> {
        let mut transactions = self.transactions.write().await;
        let current = transactions
            .get(&id)
            .ok_or_else(|| EngineError::not_found("transaction", id))?;
        if current.version != expected_version {
            return Err(EngineError::VersionConflict {
                id,
                expected: expected_version,
                actual: current.version,
            });
        }
        updated.id = id;
        updated.version = expected_version + 1;
        transactions.insert(id, updated.clone());
        Ok(updated)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCommissionStore {
    commissions: Arc<RwLock<HashMap<Uuid, Commission>>>,
    adjustments: Arc<RwLock<HashMap<Uuid, Vec<CommissionAdjustment>>>>,
}

impl InMemoryCommissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommissionStore for InMemoryCommissionStore {
    async fn insert(&self, commission: Commission) -> Result<()> {
        let mut commissions = self.commissions.write().await;
        commissions.insert(commission.id, commission);
        Ok(())
    }

    async fn get(&self, commission_id: Uuid) -> Result<Option<Commission>> {
        let commissions = self.commissions.read().await;
        Ok(commissions.get(&commission_id).cloned())
    }

    async fn get_by_transaction(&self, transaction_id: Uuid) -> Result<Option<Commission>> {
        let commissions = self.commissions.read().await;
        Ok(commissions
            .values()
            .find(|c| c.transaction_id == transaction_id)
            .cloned())
    }

    async fn set_status(&self, commission_id: Uuid, status: CommissionStatus) -> Result<()> {
        let mut commissions = self.commissions.write().await;
        let commission = commissions
            .get_mut(&commission_id)
            .ok_or_else(|| EngineError::not_found("commission", commission_id))?;
        commission.status = status;
        Ok(())
    }

    async fn append_adjustment(&self, adjustment: CommissionAdjustment) -> Result<()> {
        {
            let mut commissions = self.commissions.write().await;
            let commission = commissions
                .get_mut(&adjustment.commission_id)
                .ok_or_else(|| EngineError::not_found("commission", adjustment.commission_id))?;
            commission.amount = adjustment.new_amount;
        }
        let mut adjustments = self.adjustments.write().await;
        adjustments
            .entry(adjustment.commission_id)
            .or_default()
            .push(adjustment);
        Ok(())
    }

    async fn adjustments(&self, commission_id: Uuid) -> Result<Vec<CommissionAdjustment>> {
        let adjustments = self.adjustments.read().await;
        Ok(adjustments.get(&commission_id).cloned().unwrap_or_default())
    }
}

/// In-memory installment store with a fault-injection knob used by the
/// atomicity tests: after `fail_after` successful inserts the batch
/// aborts, and compensating cleanup removes the rows already written.
#[derive(Default, Clone)]
pub struct InMemoryInstallmentStore {
    installments: Arc<RwLock<HashMap<Uuid, CommissionInstallment>>>,
    fail_after: Arc<AtomicUsize>,
}

const NO_FAILURE: usize = usize::MAX;

impl InMemoryInstallmentStore {
    pub fn new() -> Self {
        Self {
            installments: Arc::default(),
            fail_after: Arc::new(AtomicUsize::new(NO_FAILURE)),
        }
    }

    /// Makes the next batch insert fail after `n` rows.
    pub fn fail_after_inserts(&self, n: usize) {
        self.fail_after.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl InstallmentStore for InMemoryInstallmentStore {
    async fn insert_batch(&self, batch: Vec<CommissionInstallment>) -> Result<()> {
        let mut installments = self.installments.write().await;
        let fail_after = self.fail_after.swap(NO_FAILURE, Ordering::SeqCst);
        let mut written = Vec::with_capacity(batch.len());
        for (i, installment) in batch.into_iter().enumerate() {
            if i >= fail_after {
                for id in written {
                    installments.remove(&id);
                }
                return Err(EngineError::Storage(io::Error::other(
                    "injected batch insert failure",
                )));
            }
            written.push(installment.id);
            installments.insert(installment.id, installment);
        }
        Ok(())
    }

    async fn delete_by_commission(&self, commission_id: Uuid) -> Result<()> {
        let mut installments = self.installments.write().await;
        installments.retain(|_, i| i.commission_id != commission_id);
        Ok(())
    }

    async fn list_by_commission(&self, commission_id: Uuid) -> Result<Vec<CommissionInstallment>> {
        let installments = self.installments.read().await;
        let mut rows: Vec<CommissionInstallment> = installments
            .values()
            .filter(|i| i.commission_id == commission_id)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.number);
        Ok(rows)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAuditStore {
    entries: Arc<RwLock<Vec<AuditLogEntry>>>,
    activities: Arc<RwLock<Vec<ActivityLogEntry>>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn activities(&self) -> Vec<ActivityLogEntry> {
        self.activities.read().await.clone()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, entry: AuditLogEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        Ok(())
    }

    async fn append_activity(&self, entry: ActivityLogEntry) -> Result<()> {
        let mut activities = self.activities.write().await;
        activities.push(entry);
        Ok(())
    }

    async fn entries_for(&self, entity_id: Uuid) -> Result<Vec<AuditLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryScheduleStore {
    schedules: Arc<RwLock<HashMap<Uuid, PaymentSchedule>>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a template. Seeding only; the engine reads templates, it
    /// never writes them.
    pub async fn seed(&self, schedule: PaymentSchedule) {
        let mut schedules = self.schedules.write().await;
        schedules.insert(schedule.id, schedule);
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn get(&self, id: Uuid) -> Result<Option<PaymentSchedule>> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(&id).cloned())
    }
}

/// Fixed actor-to-role mapping, for tests and the CLI driver.
#[derive(Default, Clone)]
pub struct StaticRoleResolver {
    roles: Arc<RwLock<HashMap<Uuid, ActorRole>>>,
}

impl StaticRoleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn assign(&self, actor_id: Uuid, role: ActorRole) {
        let mut roles = self.roles.write().await;
        roles.insert(actor_id, role);
    }
}

#[async_trait]
impl RoleResolver for StaticRoleResolver {
    async fn resolve(&self, actor_id: Uuid) -> Result<Option<ActorRole>> {
        let roles = self.roles.read().await;
        Ok(roles.get(&actor_id).copied())
    }
}
