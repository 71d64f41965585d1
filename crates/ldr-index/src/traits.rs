use ldr_types::{Instant, ResourceId, Transaction, TransactionParticipant};

use crate::error::IndexResult;

/// Transactional parent/child index.
///
/// Every read observes the committed state plus the calling transaction's
/// own buffered edits, and nothing buffered by any other transaction.
/// Commit and rollback go through [`TransactionParticipant`]. Failed edits
/// leave the transaction's buffered state unchanged.
pub trait ContainmentIndex: TransactionParticipant {
    /// Live children of `parent`. For a memento id, the children of the
    /// base resource at the memento instant.
    fn get_contains(&self, tx: &Transaction, parent: &ResourceId) -> IndexResult<Vec<ResourceId>>;

    /// Removed children of `parent`.
    fn get_contains_deleted(
        &self,
        tx: &Transaction,
        parent: &ResourceId,
    ) -> IndexResult<Vec<ResourceId>>;

    /// The live parent of `child`.
    fn get_contained_by(&self, tx: &Transaction, child: &ResourceId)
        -> IndexResult<Option<ResourceId>>;

    /// The former parent of a removed `child`.
    fn get_contained_by_deleted(
        &self,
        tx: &Transaction,
        child: &ResourceId,
    ) -> IndexResult<Option<ResourceId>>;

    /// Record `child` under `parent`. `start` defaults to now. A pending
    /// purge of the child in this transaction is undone.
    fn add_contained_by(
        &self,
        tx: &Transaction,
        parent: &ResourceId,
        child: &ResourceId,
        start: Option<Instant>,
        end: Option<Instant>,
    ) -> IndexResult<()>;

    /// Remove the edge from `parent` to `child`. An edge added in this same
    /// transaction is forgotten; a committed edge is ended now.
    fn remove_contained_by(
        &self,
        tx: &Transaction,
        parent: &ResourceId,
        child: &ResourceId,
    ) -> IndexResult<()>;

    /// Remove `child` from whatever currently contains it.
    fn remove_resource(&self, tx: &Transaction, child: &ResourceId) -> IndexResult<()>;

    /// Drop every trace of `child`, undoing removals pending in this
    /// transaction.
    fn purge_resource(&self, tx: &Transaction, child: &ResourceId) -> IndexResult<()>;

    /// Whether the base resource of `id` is tracked. The root always exists.
    fn resource_exists(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        include_deleted: bool,
    ) -> IndexResult<bool>;

    /// The container of `id`: its indexed parent if it has one, else the
    /// nearest existing ancestor path, else the root.
    fn get_container_id_by_path(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        check_deleted: bool,
    ) -> IndexResult<ResourceId>;

    /// Whether anything, live or removed, is tracked below `id`. Used for
    /// ghost-node detection.
    fn has_resources_starting_with(&self, tx: &Transaction, id: &ResourceId) -> IndexResult<bool>;

    /// Latest containment change below `parent`.
    fn containment_last_updated(
        &self,
        tx: &Transaction,
        parent: &ResourceId,
    ) -> IndexResult<Option<Instant>>;

    /// Truncate the committed index. Refused while any transaction has
    /// buffered edits.
    fn reset(&self) -> IndexResult<()>;
}
