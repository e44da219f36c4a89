use crate::domain::audit::{ActivityLogEntry, AuditLogEntry};
use crate::domain::schedule::{
    Commission, CommissionAdjustment, CommissionInstallment, CommissionStatus, PaymentSchedule,
};
use crate::domain::status::ActorRole;
use crate::domain::transaction::{Page, Pagination, Transaction, TransactionFilter};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Primary store for transactions. The conditional update is the only
/// write path for lifecycle mutations: the version predicate lives here,
/// at the data-store boundary, not in application memory.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn insert(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<Transaction>>;
    /// Filtered, offset/limit-paginated listing ordered by transaction
    /// date descending. `total` counts all rows matching the filter.
    async fn list(&self, filter: &TransactionFilter, page: Pagination) -> Result<Page<Transaction>>;
    /// Applies `updated` only if the stored version still equals
    /// `expected_version`, bumping the version by exactly 1 in the same
    /// step. A mismatch fails with `VersionConflict` and mutates nothing.
    async fn compare_and_swap(
        &self,
        id: Uuid,
        expected_version: i64,
        updated: Transaction,
    ) -> Result<Transaction>;
}

#[async_trait]
pub trait CommissionStore: Send + Sync {
    async fn insert(&self, commission: Commission) -> Result<()>;
    async fn get(&self, commission_id: Uuid) -> Result<Option<Commission>>;
    async fn get_by_transaction(&self, transaction_id: Uuid) -> Result<Option<Commission>>;
    async fn set_status(&self, commission_id: Uuid, status: CommissionStatus) -> Result<()>;
    async fn append_adjustment(&self, adjustment: CommissionAdjustment) -> Result<()>;
    async fn adjustments(&self, commission_id: Uuid) -> Result<Vec<CommissionAdjustment>>;
}

#[async_trait]
pub trait InstallmentStore: Send + Sync {
    /// Inserts the whole batch or nothing at all.
    async fn insert_batch(&self, installments: Vec<CommissionInstallment>) -> Result<()>;
    async fn list_by_commission(&self, commission_id: Uuid) -> Result<Vec<CommissionInstallment>>;
    /// Compensating cleanup for a batch whose follow-up flag write failed.
    async fn delete_by_commission(&self, commission_id: Uuid) -> Result<()>;
}

/// Append-only audit and activity sinks. Entries are never mutated or
/// deleted.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: AuditLogEntry) -> Result<()>;
    async fn append_activity(&self, entry: ActivityLogEntry) -> Result<()>;
    async fn entries_for(&self, entity_id: Uuid) -> Result<Vec<AuditLogEntry>>;
}

/// Read-only access to payment schedule templates.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<PaymentSchedule>>;
}

/// Maps an actor to a role. The single authoritative source for
/// authorization input; replaces ad-hoc admin lists.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve(&self, actor_id: Uuid) -> Result<Option<ActorRole>>;
}

pub type TransactionStoreRef = Arc<dyn TransactionStore>;
pub type CommissionStoreRef = Arc<dyn CommissionStore>;
pub type InstallmentStoreRef = Arc<dyn InstallmentStore>;
pub type AuditStoreRef = Arc<dyn AuditStore>;
pub type ScheduleStoreRef = Arc<dyn ScheduleStore>;
pub type RoleResolverRef = Arc<dyn RoleResolver>;
