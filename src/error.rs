use crate::domain::status::{ActorRole, TransactionStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("transition {current} -> {requested} is not permitted for role {role}")]
    Forbidden {
        current: TransactionStatus,
        requested: TransactionStatus,
        role: ActorRole,
    },

    #[error(
        "version conflict on transaction {id}: expected {expected}, found {actual}; refresh and try again"
    )]
    VersionConflict {
        id: uuid::Uuid,
        expected: i64,
        actual: i64,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the caller can recover by re-fetching and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
