use ldr_types::{Instant, ResourceId, Transaction, TransactionParticipant, Triple};

use crate::entry::MembershipEntry;
use crate::error::MembershipResult;

/// Write boundary for membership index edits. Every edit is buffered in the
/// calling transaction.
pub trait MembershipIndexWriter: Send + Sync {
    /// Record a membership triple produced by `source` via `proxy`.
    fn add_membership(
        &self,
        tx: &Transaction,
        source: &ResourceId,
        proxy: &ResourceId,
        triple: Triple,
        start: Instant,
        end: Option<Instant>,
    ) -> MembershipResult<()>;

    /// End every open entry of `source` at `at`.
    fn end_membership_for_source(
        &self,
        tx: &Transaction,
        source: &ResourceId,
        at: Instant,
    ) -> MembershipResult<()>;

    /// End the open entries `proxy` contributes to `source`. Open entries
    /// added earlier in the same transaction are dropped instead.
    fn end_membership_from_child(
        &self,
        tx: &Transaction,
        source: &ResourceId,
        proxy: &ResourceId,
        at: Instant,
    ) -> MembershipResult<()>;

    /// Forget the whole history of `source`.
    fn delete_membership_for_source(&self, tx: &Transaction, source: &ResourceId)
        -> MembershipResult<()>;

    /// Forget every entry `target` produced or contributed.
    fn delete_membership_references(&self, tx: &Transaction, target: &ResourceId)
        -> MembershipResult<()>;

    /// Truncate the committed index. Refused while any transaction has
    /// buffered edits.
    fn reset(&self) -> MembershipResult<()>;
}

/// Read boundary for membership queries.
pub trait MembershipIndexReader: Send + Sync {
    /// Membership triples whose subject is `subject`. A memento subject is
    /// answered as of its instant.
    fn get_membership(&self, tx: &Transaction, subject: &ResourceId) -> MembershipResult<Vec<Triple>>;

    /// Latest membership change about `subject`.
    fn get_last_updated(
        &self,
        tx: &Transaction,
        subject: &ResourceId,
    ) -> MembershipResult<Option<Instant>>;

    /// Every entry produced by `source`, open and closed.
    fn entries_for_source(
        &self,
        tx: &Transaction,
        source: &ResourceId,
    ) -> MembershipResult<Vec<MembershipEntry>>;
}

/// A complete transactional membership index.
pub trait MembershipIndex:
    MembershipIndexReader + MembershipIndexWriter + TransactionParticipant
{
}

impl<T> MembershipIndex for T where
    T: MembershipIndexReader + MembershipIndexWriter + TransactionParticipant
{
}
