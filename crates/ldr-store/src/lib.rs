//! Storage collaborator for the linked-data repository.
//!
//! The repository core never owns persisted bytes. It reads flat
//! [`ResourceHeaders`] records, stored triples, and version lists through the
//! [`PersistentStorageSession`] trait, and lifecycle services write through
//! [`StorageWriter`].
//!
//! # Storage Backends
//!
//! - [`InMemoryStorage`] -- transactional `HashMap`-based storage for tests
//!   and embedding
//!
//! # Design Rules
//!
//! 1. Records are keyed by the id with version qualifiers removed.
//! 2. A version is an exact-instant snapshot of a record's headers and triples.
//! 3. Writes are buffered per transaction and invisible to other transactions.
//! 4. A commit either applies all of a transaction's writes or is rejected.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod headers;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use headers::{BinaryHeaders, ResourceHeaders, ResourceSnapshot};
pub use memory::InMemoryStorage;
pub use traits::{PersistentStorageSession, StorageWriter};
