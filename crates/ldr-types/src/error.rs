use thiserror::Error;

use crate::transaction::{TransactionId, TransactionState};

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed identifier {id}: {reason}")]
    MalformedIdentifier { id: String, reason: String },

    #[error("invalid memento label: {0}")]
    InvalidMementoLabel(String),

    #[error("unknown interaction model: {0}")]
    UnknownInteractionModel(String),
}

impl TypeError {
    pub(crate) fn malformed(id: &str, reason: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors produced by transaction handling and transactional overlays.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction {0} is read-only")]
    ReadOnly(TransactionId),

    #[error("transaction {id} is not open (state: {state:?})")]
    NotOpen {
        id: TransactionId,
        state: TransactionState,
    },

    #[error("transaction {id} was already terminated as {state:?}")]
    AlreadyTerminated {
        id: TransactionId,
        state: TransactionState,
    },

    #[error("commit of {id} rejected by {participant}: {reason}")]
    Conflict {
        id: TransactionId,
        participant: String,
        reason: String,
    },

    #[error("{0} transaction(s) still hold pending edits")]
    PendingEdits(usize),

    #[error("participant {participant} failed: {reason}")]
    Participant { participant: String, reason: String },

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}
