use ldr_index::IndexError;
use ldr_membership::MembershipError;
use ldr_store::StoreError;
use ldr_types::{TransactionError, TypeError};

/// Errors produced by the resource kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// No resource exists at the requested id (or version).
    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] TypeError),

    /// Stored headers carry an interaction model no variant handles.
    #[error("resource {id} has an unrecognized interaction model: {model}")]
    ResourceType { id: String, model: String },

    /// Any storage failure other than not-found.
    #[error("repository runtime fault: {0}")]
    Repository(StoreError),

    #[error("containment index: {0}")]
    Containment(#[from] IndexError),

    #[error("membership index: {0}")]
    Membership(#[from] MembershipError),

    #[error("transaction: {0}")]
    Transaction(#[from] TransactionError),

    #[error("{operation} is not supported by {id}")]
    Unsupported { id: String, operation: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KernelError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound(_))
    }
}

impl From<StoreError> for KernelError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::PathNotFound(id),
            other => Self::Repository(other),
        }
    }
}

/// Result alias for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;
