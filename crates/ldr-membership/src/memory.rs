use tracing::{debug, info};

use ldr_types::{
    CommitGate, Instant, ResourceId, Transaction, TransactionError, TransactionParticipant, Triple,
    TxOverlay,
};

use crate::entry::{MembershipEntry, MembershipOp, MembershipState};
use crate::error::{MembershipError, MembershipResult};
use crate::traits::{MembershipIndexReader, MembershipIndexWriter};

/// In-memory membership index backed by a [`TxOverlay`].
pub struct InMemoryMembershipIndex {
    state: TxOverlay<MembershipState>,
}

impl InMemoryMembershipIndex {
    pub fn new() -> Self {
        Self::with_gate(CommitGate::new())
    }

    /// Share `gate` with the other participants of one repository.
    pub fn with_gate(gate: CommitGate) -> Self {
        Self {
            state: TxOverlay::with_gate(gate),
        }
    }

    fn push(&self, tx: &Transaction, op: MembershipOp) -> MembershipResult<()> {
        self.state.stage(tx, |staging| {
            staging.ops.push(op);
            Ok::<_, MembershipError>(())
        })
    }
}

impl Default for InMemoryMembershipIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl MembershipIndexWriter for InMemoryMembershipIndex {
    fn add_membership(
        &self,
        tx: &Transaction,
        source: &ResourceId,
        proxy: &ResourceId,
        triple: Triple,
        start: Instant,
        end: Option<Instant>,
    ) -> MembershipResult<()> {
        if let Some(end) = end.filter(|end| *end < start) {
            return Err(MembershipError::InvalidRange { start, end });
        }
        debug!(tx = %tx.id(), source = %source, proxy = %proxy, triple = %triple, "staged membership");
        self.push(
            tx,
            MembershipOp::Add(MembershipEntry {
                source: source.clone(),
                proxy: proxy.clone(),
                triple,
                start,
                end,
            }),
        )
    }

    fn end_membership_for_source(
        &self,
        tx: &Transaction,
        source: &ResourceId,
        at: Instant,
    ) -> MembershipResult<()> {
        debug!(tx = %tx.id(), source = %source, "staged end of source membership");
        self.push(
            tx,
            MembershipOp::End {
                source: source.clone(),
                proxy: None,
                at,
            },
        )
    }

    fn end_membership_from_child(
        &self,
        tx: &Transaction,
        source: &ResourceId,
        proxy: &ResourceId,
        at: Instant,
    ) -> MembershipResult<()> {
        self.state.stage(tx, |staging| {
            staging.ops.retain(|op| {
                !matches!(op, MembershipOp::Add(e)
                    if e.is_active() && &e.source == source && &e.proxy == proxy)
            });
            staging.ops.push(MembershipOp::End {
                source: source.clone(),
                proxy: Some(proxy.clone()),
                at,
            });
            Ok::<_, MembershipError>(())
        })?;
        debug!(tx = %tx.id(), source = %source, proxy = %proxy, "staged end of child membership");
        Ok(())
    }

    fn delete_membership_for_source(
        &self,
        tx: &Transaction,
        source: &ResourceId,
    ) -> MembershipResult<()> {
        debug!(tx = %tx.id(), source = %source, "staged membership history delete");
        self.push(
            tx,
            MembershipOp::DeleteForSource {
                source: source.clone(),
            },
        )
    }

    fn delete_membership_references(
        &self,
        tx: &Transaction,
        target: &ResourceId,
    ) -> MembershipResult<()> {
        debug!(tx = %tx.id(), target = %target, "staged membership reference delete");
        self.push(
            tx,
            MembershipOp::DeleteReferences {
                target: target.clone(),
            },
        )
    }

    fn reset(&self) -> MembershipResult<()> {
        self.state.reset()?;
        info!("membership index reset");
        Ok(())
    }
}

impl MembershipIndexReader for InMemoryMembershipIndex {
    fn get_membership(&self, tx: &Transaction, subject: &ResourceId) -> MembershipResult<Vec<Triple>> {
        let base = subject.as_base_id();
        let triples = match subject.memento_instant() {
            Some(at) => self.state.read(tx, |s| s.as_of(base.full_id(), at))?,
            None => self.state.read(tx, |s| s.current(base.full_id()))?,
        };
        Ok(triples)
    }

    fn get_last_updated(
        &self,
        tx: &Transaction,
        subject: &ResourceId,
    ) -> MembershipResult<Option<Instant>> {
        let base = subject.as_base_id();
        Ok(self.state.read(tx, |s| s.last_updated(base.full_id()))?)
    }

    fn entries_for_source(
        &self,
        tx: &Transaction,
        source: &ResourceId,
    ) -> MembershipResult<Vec<MembershipEntry>> {
        Ok(self.state.read(tx, |s| s.for_source(source))?)
    }
}

impl TransactionParticipant for InMemoryMembershipIndex {
    fn participant_name(&self) -> &str {
        "membership"
    }

    fn commit(&self, tx: &Transaction) -> Result<(), TransactionError> {
        let ops = self.state.commit(tx)?;
        debug!(tx = %tx.id(), ops, "committed membership edits");
        Ok(())
    }

    fn rollback(&self, tx: &Transaction) -> Result<(), TransactionError> {
        self.state.rollback(tx).map(|_| ())
    }
}
