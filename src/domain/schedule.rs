use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reusable installment plan template. Read-only from the engine's
/// perspective; per-transaction rows are generated from it at approval.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentSchedule {
    pub id: Uuid,
    pub name: String,
    pub installments: Vec<ScheduleInstallment>,
}

/// One line of a payment schedule template.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ScheduleInstallment {
    pub number: u32,
    /// Percentage of the commission due on this line.
    pub percentage: Decimal,
    /// Days after the transaction date this line falls due.
    pub days_offset: i64,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Paid,
    /// Set when the owning transaction is rejected after approval. The
    /// record and its installments stay in place; only the status moves.
    Voided,
}

/// Commission owed on an approved transaction. Created exactly once, at
/// the moment the transaction enters `Approved`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Commission {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub agent_id: Uuid,
    pub amount: Decimal,
    pub status: CommissionStatus,
    pub payment_schedule_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Append-only correction to a commission amount. Prior state is carried
/// in the record itself, never overwritten.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CommissionAdjustment {
    pub id: Uuid,
    pub commission_id: Uuid,
    pub previous_amount: Decimal,
    pub new_amount: Decimal,
    pub reason: String,
    pub adjusted_by: Uuid,
    pub adjusted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Paid,
}

/// A dated partial payment of a commission. Immutable once paid.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CommissionInstallment {
    pub id: Uuid,
    pub commission_id: Uuid,
    pub number: u32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub paid_date: Option<NaiveDate>,
    pub description: Option<String>,
}
