//! Foundation types for the linked-data repository (LDR).
//!
//! This crate provides the identity, temporal, vocabulary, and transaction
//! types used throughout the repository core. Every other LDR crate depends
//! on `ldr-types`.
//!
//! # Key Types
//!
//! - [`ResourceId`] — Internal identifier with version, ACL, and description qualifiers
//! - [`Instant`] — Second-precision UTC timestamp used for mementos
//! - [`InteractionModel`] — The persisted resource shape (container kinds, binary, description, ACL)
//! - [`Triple`] / [`Term`] — Minimal RDF statement model
//! - [`Transaction`] — Unit-of-work handle gating index and storage visibility
//! - [`TxOverlay`] — Committed state plus a per-transaction op log

pub mod error;
pub mod id;
pub mod model;
pub mod overlay;
pub mod rdf;
pub mod temporal;
pub mod transaction;
pub mod vocab;

pub use error::{TransactionError, TypeError};
pub use id::{ResourceId, Suffix};
pub use model::InteractionModel;
pub use overlay::{CommitGate, OpLog, Replay, Staging, TxOverlay};
pub use rdf::{Term, Triple};
pub use temporal::Instant;
pub use transaction::{Transaction, TransactionId, TransactionParticipant, TransactionState};
