//! Membership index for the linked-data repository.
//!
//! Direct and indirect containers derive membership triples from their
//! children. This crate stores those derived triples with a lifetime
//! (`start`, optional `end`) so that current membership, membership as of a
//! memento, and the last membership change of a resource can all be
//! answered. It provides:
//! - `MembershipIndexWriter` / `MembershipIndexReader` trait boundaries
//! - `InMemoryMembershipIndex`, a transaction-overlay implementation
//! - `MembershipEntry`, one derived triple and its provenance

pub mod entry;
pub mod error;
pub mod memory;
pub mod traits;

pub use entry::{MembershipEntry, MembershipOp, MembershipState};
pub use error::{MembershipError, MembershipResult};
pub use memory::InMemoryMembershipIndex;
pub use traits::{MembershipIndex, MembershipIndexReader, MembershipIndexWriter};
