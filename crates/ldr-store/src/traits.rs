use ldr_types::{Instant, ResourceId, Transaction, Triple};

use crate::error::StoreResult;
use crate::headers::ResourceHeaders;

/// Read side of the storage collaborator.
///
/// Every call is scoped to a transaction and observes the committed state
/// plus that transaction's own writes. Records are looked up by
/// `id.resource_id()`; pass `version` to read a stored memento instead of
/// the head.
pub trait PersistentStorageSession: Send + Sync {
    /// Headers of a record. Fails with `NotFound` if absent.
    fn get_headers(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        version: Option<Instant>,
    ) -> StoreResult<ResourceHeaders>;

    /// All stored memento instants of a record, ascending.
    fn list_versions(&self, tx: &Transaction, id: &ResourceId) -> StoreResult<Vec<Instant>>;

    /// Stored triples of a record.
    fn get_triples(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        version: Option<Instant>,
    ) -> StoreResult<Vec<Triple>>;

    /// Check whether a head record exists, deleted or not.
    fn exists(&self, tx: &Transaction, id: &ResourceId) -> StoreResult<bool> {
        match self.get_headers(tx, id, None) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Write side of the storage collaborator.
pub trait StorageWriter: Send + Sync {
    /// Replace the head record under `headers.id`. Returns the headers as
    /// stored, with the state token assigned.
    fn write(
        &self,
        tx: &Transaction,
        headers: ResourceHeaders,
        triples: Vec<Triple>,
    ) -> StoreResult<ResourceHeaders>;

    /// Snapshot the head record as the memento at `at`. An existing
    /// memento at the same instant is replaced.
    fn create_version(&self, tx: &Transaction, id: &ResourceId, at: Instant) -> StoreResult<()>;

    /// Remove a record and its whole version history.
    fn purge(&self, tx: &Transaction, id: &ResourceId) -> StoreResult<()>;
}
