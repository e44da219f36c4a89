use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a transaction.
///
/// `Completed` and `Cancelled` are terminal: no role may move a
/// transaction out of either.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Draft,
    Pending,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 8] = [
        TransactionStatus::Draft,
        TransactionStatus::Pending,
        TransactionStatus::Submitted,
        TransactionStatus::UnderReview,
        TransactionStatus::Approved,
        TransactionStatus::Rejected,
        TransactionStatus::Completed,
        TransactionStatus::Cancelled,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "Draft",
            Self::Pending => "Pending",
            Self::Submitted => "Submitted",
            Self::UnderReview => "Under Review",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Agent,
    Admin,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent => f.write_str("agent"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

/// Which roles may trigger a given edge.
#[derive(Debug, PartialEq, Clone, Copy)]
enum Gate {
    Agent,
    Admin,
    AgentOrAdmin,
}

impl Gate {
    fn permits(&self, role: ActorRole) -> bool {
        match self {
            Gate::Agent => role == ActorRole::Agent,
            Gate::Admin => role == ActorRole::Admin,
            Gate::AgentOrAdmin => true,
        }
    }
}

/// The single authoritative transition table. Any (source, target) pair
/// absent here is illegal for every role.
fn edges(current: TransactionStatus) -> &'static [(TransactionStatus, Gate)] {
    use TransactionStatus::*;
    match current {
        Draft => &[(Pending, Gate::Agent), (Cancelled, Gate::AgentOrAdmin)],
        Pending => &[
            (Submitted, Gate::Agent),
            (Draft, Gate::Agent),
            (Cancelled, Gate::AgentOrAdmin),
        ],
        Submitted => &[
            (UnderReview, Gate::Admin),
            (Rejected, Gate::Admin),
            (Cancelled, Gate::AgentOrAdmin),
        ],
        UnderReview => &[
            (Approved, Gate::Admin),
            (Rejected, Gate::Admin),
            (Submitted, Gate::Admin),
        ],
        Approved => &[(Completed, Gate::Admin), (UnderReview, Gate::Admin)],
        Rejected => &[(Submitted, Gate::Agent), (Cancelled, Gate::Agent)],
        Completed | Cancelled => &[],
    }
}

/// Consults both the adjacency table and the role gate; anything not
/// explicitly listed is denied.
pub fn can_transition(
    current: TransactionStatus,
    target: TransactionStatus,
    role: ActorRole,
) -> bool {
    edges(current)
        .iter()
        .any(|(dest, gate)| *dest == target && gate.permits(role))
}

/// Legal destinations from `current` visible to `role`. Drives UI
/// affordances, but authorization always goes back through
/// [`can_transition`].
pub fn available_statuses(current: TransactionStatus, role: ActorRole) -> Vec<TransactionStatus> {
    edges(current)
        .iter()
        .filter(|(_, gate)| gate.permits(role))
        .map(|(dest, _)| *dest)
        .collect()
}
