use ldr_types::{Instant, TransactionError};

/// Errors produced by membership index operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("membership entry ends ({end}) before it starts ({start})")]
    InvalidRange { start: Instant, end: Instant },

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

/// Result alias for membership index operations.
pub type MembershipResult<T> = Result<T, MembershipError>;
