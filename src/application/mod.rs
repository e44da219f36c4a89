//! Application layer: orchestration of the transaction lifecycle.
//!
//! The transaction service handles create/read/update, the approval
//! workflow wraps version-checked status transitions with their
//! commission side effects, and the scheduler expands commissions into
//! installment rows.

pub mod approval;
pub mod error_stats;
pub mod scheduler;
pub mod service;
