use thiserror::Error;

use ldr_index::IndexError;
use ldr_kernel::KernelError;
use ldr_membership::MembershipError;
use ldr_store::StoreError;
use ldr_types::TransactionError;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("parent not found: {0}")]
    ParentNotFound(String),

    /// The resource was deleted and must be purged before the id is reused.
    #[error("resource is gone: {0}")]
    Gone(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),
}

impl SdkError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Kernel(e) if e.is_not_found())
    }
}

impl From<StoreError> for SdkError {
    fn from(e: StoreError) -> Self {
        Self::Kernel(e.into())
    }
}

impl From<IndexError> for SdkError {
    fn from(e: IndexError) -> Self {
        Self::Kernel(e.into())
    }
}

impl From<MembershipError> for SdkError {
    fn from(e: MembershipError) -> Self {
        Self::Kernel(e.into())
    }
}

impl From<TransactionError> for SdkError {
    fn from(e: TransactionError) -> Self {
        Self::Kernel(e.into())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
