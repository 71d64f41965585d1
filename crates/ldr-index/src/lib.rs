//! Containment index for the linked-data repository.
//!
//! Tracks which resource contains which, with a start and (once removed)
//! end time per edge so that historical containment can be answered for
//! mementos. Edits are buffered per transaction and merged atomically on
//! commit.
//!
//! # Key Types
//!
//! - [`ContainmentIndex`] — Transactional containment contract
//! - [`InMemoryContainmentIndex`] — Overlay-backed reference engine
//! - [`ContainmentEdge`] — One parent/child edge and its lifetime

pub mod edge;
pub mod error;
pub mod memory;
pub mod traits;

pub use edge::{ContainmentEdge, ContainmentOp, ContainmentState};
pub use error::{IndexError, IndexResult};
pub use memory::InMemoryContainmentIndex;
pub use traits::ContainmentIndex;
