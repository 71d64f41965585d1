//! High-level SDK for the linked-data repository.
//!
//! Wires storage, the containment and membership indexes, and the resource
//! kernel into one [`Repository`]. This is the main entry point for
//! applications embedding the repository core.
//!
//! # Example Flow
//!
//! 1. [`Repository::begin`] opens a transaction.
//! 2. Lifecycle calls (`create_container`, `create_binary`, `delete`, ...)
//!    stage writes in every participant.
//! 3. [`Repository::commit`] publishes them atomically, or fails with a
//!    conflict and leaves the committed state untouched.

pub mod error;
pub mod repository;
pub mod request;

pub use error::{SdkError, SdkResult};
pub use repository::Repository;
pub use request::{BinaryRequest, ContainerRequest};

// Re-export key types
pub use ldr_kernel::{
    Containable, FedoraResource, KernelConfig, ResourceKind, Typed, Versionable,
};
pub use ldr_types::{Instant, InteractionModel, ResourceId, Term, Transaction, Triple};
