//! Error types for the containment index crate.

use ldr_types::{ResourceId, TransactionError};
use thiserror::Error;

/// Errors from containment index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("invalid containment edge {parent} -> {child}: {reason}")]
    InvalidEdge {
        parent: ResourceId,
        child: ResourceId,
        reason: String,
    },

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// Result alias for containment index operations.
pub type IndexResult<T> = Result<T, IndexError>;
