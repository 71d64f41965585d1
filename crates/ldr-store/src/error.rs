use ldr_types::TransactionError;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record (or no version of it) exists under the requested id.
    #[error("persistent item not found: {0}")]
    NotFound(String),

    /// Stored triples could not be accepted or decoded.
    #[error("malformed RDF for {id}: {reason}")]
    MalformedRdf { id: String, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
