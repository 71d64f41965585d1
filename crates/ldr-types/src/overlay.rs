//! Transaction overlays.
//!
//! A [`TxOverlay`] holds a committed state plus one op log per transaction.
//! Each transaction also keeps a cached view: the committed state with its
//! own log applied. New ops are applied to that view as they are staged, so
//! a transaction observes its own edits and never anyone else's without
//! replaying its whole log on every call. The view is rebuilt only after
//! the committed state moves on or the log is rewritten.
//!
//! Commit replays the log into the committed state under a single write
//! lock; rollback drops the log.
//!
//! Lock order is always gate, then `committed`, then `pending`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::TransactionError;
use crate::transaction::{Transaction, TransactionId};

/// State that can be rebuilt by replaying ops in order.
pub trait Replay: Clone + Default + Send + Sync {
    type Op: Clone + fmt::Debug + Send + Sync;

    fn apply(&mut self, op: &Self::Op);
}

/// Visibility gate shared by every overlay of one repository.
///
/// Reads and staging hold the shared side. The transaction manager holds
/// the exclusive side while it commits all participants, so no reader sees
/// one participant's half of a commit without the others.
#[derive(Clone, Debug, Default)]
pub struct CommitGate(Arc<RwLock<()>>);

impl CommitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Result<RwLockReadGuard<'_, ()>, TransactionError> {
        self.0.read().map_err(poisoned)
    }

    pub fn exclusive(&self) -> Result<RwLockWriteGuard<'_, ()>, TransactionError> {
        self.0.write().map_err(poisoned)
    }
}

/// A transaction's op log as seen by a staging closure.
///
/// Appends are cheap. Removing ops with [`OpLog::retain`] marks the log as
/// rewritten; the cached view is then rebuilt from scratch.
pub struct OpLog<Op> {
    ops: Vec<Op>,
    base_len: usize,
    original: Option<Vec<Op>>,
}

impl<Op: Clone> OpLog<Op> {
    fn open(ops: Vec<Op>) -> Self {
        let base_len = ops.len();
        Self {
            ops,
            base_len,
            original: None,
        }
    }

    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Keep only the ops for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Op) -> bool) {
        if self.ops.iter().all(&mut keep) {
            return;
        }
        if self.original.is_none() {
            self.original = Some(self.ops[..self.base_len].to_vec());
        }
        self.ops.retain(keep);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Op> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn rewritten(&self) -> bool {
        self.original.is_some()
    }

    fn appended(&self) -> &[Op] {
        &self.ops[self.base_len..]
    }

    /// The log as it was before the closure ran.
    fn restore(mut self) -> Vec<Op> {
        match self.original.take() {
            Some(original) => original,
            None => {
                self.ops.truncate(self.base_len);
                self.ops
            }
        }
    }
}

/// Inputs to a staging closure.
pub struct Staging<'a, S: Replay> {
    /// The committed state.
    pub committed: &'a S,
    /// The committed state with the transaction's existing ops applied.
    pub view: &'a S,
    /// The transaction's op log. Kept only if the closure succeeds.
    pub ops: &'a mut OpLog<S::Op>,
}

struct Committed<S> {
    state: S,
    /// Bumped whenever `state` changes; cached views built at an older
    /// epoch are stale.
    epoch: u64,
}

struct Pending<S: Replay> {
    ops: Vec<S::Op>,
    view: Option<(u64, S)>,
}

impl<S: Replay> Pending<S> {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            view: None,
        }
    }
}

fn replay<S: Replay>(committed: &S, ops: &[S::Op]) -> S {
    let mut view = committed.clone();
    for op in ops {
        view.apply(op);
    }
    view
}

/// The cached view in `slot`, rebuilt first if it is stale.
fn fresh_view<'a, S: Replay>(
    slot: &'a mut Option<(u64, S)>,
    ops: &[S::Op],
    committed: &Committed<S>,
) -> &'a mut S {
    let fresh = matches!(slot, Some((epoch, _)) if *epoch == committed.epoch);
    if !fresh {
        *slot = None;
    }
    &mut slot
        .get_or_insert_with(|| (committed.epoch, replay(&committed.state, ops)))
        .1
}

/// Committed state plus per-transaction op logs.
pub struct TxOverlay<S: Replay> {
    gate: CommitGate,
    committed: RwLock<Committed<S>>,
    pending: RwLock<HashMap<TransactionId, Pending<S>>>,
}

fn poisoned<E: fmt::Display>(e: E) -> TransactionError {
    TransactionError::LockPoisoned(e.to_string())
}

impl<S: Replay> TxOverlay<S> {
    /// An overlay with a private gate.
    pub fn new() -> Self {
        Self::with_gate(CommitGate::new())
    }

    /// An overlay whose reads are held back while `gate` is exclusively
    /// locked.
    pub fn with_gate(gate: CommitGate) -> Self {
        Self {
            gate,
            committed: RwLock::new(Committed {
                state: S::default(),
                epoch: 0,
            }),
            pending: RwLock::new(HashMap::new()),
        }
    }

    pub fn gate(&self) -> &CommitGate {
        &self.gate
    }

    /// Read through `tx`: committed state plus `tx`'s own edits.
    pub fn read<R>(&self, tx: &Transaction, f: impl FnOnce(&S) -> R) -> Result<R, TransactionError> {
        let _visible = self.gate.shared()?;
        let committed = self.committed.read().map_err(poisoned)?;
        {
            let pending = self.pending.read().map_err(poisoned)?;
            match pending.get(&tx.id()) {
                None => return Ok(f(&committed.state)),
                Some(p) if p.ops.is_empty() => return Ok(f(&committed.state)),
                Some(Pending {
                    view: Some((epoch, view)),
                    ..
                }) if *epoch == committed.epoch => return Ok(f(view)),
                Some(_) => {}
            }
        }

        let mut pending = self.pending.write().map_err(poisoned)?;
        match pending.get_mut(&tx.id()) {
            Some(Pending { ops, view }) => Ok(f(fresh_view(view, ops, &committed))),
            None => Ok(f(&committed.state)),
        }
    }

    /// Read the committed state only.
    pub fn read_committed<R>(&self, f: impl FnOnce(&S) -> R) -> Result<R, TransactionError> {
        let _visible = self.gate.shared()?;
        let committed = self.committed.read().map_err(poisoned)?;
        Ok(f(&committed.state))
    }

    /// Edit `tx`'s op log.
    ///
    /// When the closure returns `Err` the log is restored to what it was
    /// before the call, so a failed edit leaves the buffered state
    /// untouched.
    pub fn stage<R, E>(
        &self,
        tx: &Transaction,
        f: impl FnOnce(Staging<'_, S>) -> Result<R, E>,
    ) -> Result<R, E>
    where
        E: From<TransactionError>,
    {
        tx.ensure_writable()?;
        let _visible = self.gate.shared()?;
        let committed = self.committed.read().map_err(poisoned)?;
        let mut pending = self.pending.write().map_err(poisoned)?;

        let Pending { ops, view } = pending.entry(tx.id()).or_insert_with(Pending::new);
        let view = fresh_view(view, ops, &committed);
        let mut log = OpLog::open(std::mem::take(ops));

        let result = f(Staging {
            committed: &committed.state,
            view: &*view,
            ops: &mut log,
        });
        match result {
            Ok(r) => {
                if log.rewritten() {
                    *view = replay(&committed.state, &log.ops);
                } else {
                    for op in log.appended() {
                        view.apply(op);
                    }
                }
                *ops = log.ops;
                Ok(r)
            }
            Err(e) => {
                *ops = log.restore();
                Err(e)
            }
        }
    }

    /// A copy of `tx`'s op log.
    pub fn pending_ops(&self, tx: &Transaction) -> Result<Vec<S::Op>, TransactionError> {
        let pending = self.pending.read().map_err(poisoned)?;
        Ok(pending.get(&tx.id()).map(|p| p.ops.clone()).unwrap_or_default())
    }

    /// Replay `tx`'s log into the committed state. Returns the op count.
    ///
    /// Does not touch the gate; the caller holds it exclusively when
    /// several overlays commit together.
    pub fn commit(&self, tx: &Transaction) -> Result<usize, TransactionError> {
        let mut committed = self.committed.write().map_err(poisoned)?;
        let ops = self
            .pending
            .write()
            .map_err(poisoned)?
            .remove(&tx.id())
            .map(|p| p.ops)
            .unwrap_or_default();
        for op in &ops {
            committed.state.apply(op);
        }
        if !ops.is_empty() {
            committed.epoch += 1;
        }
        debug!(tx = %tx.id(), ops = ops.len(), "merged transaction overlay");
        Ok(ops.len())
    }

    /// Discard `tx`'s log. Returns the number of discarded ops.
    pub fn rollback(&self, tx: &Transaction) -> Result<usize, TransactionError> {
        let ops = self
            .pending
            .write()
            .map_err(poisoned)?
            .remove(&tx.id())
            .map(|p| p.ops.len())
            .unwrap_or_default();
        debug!(tx = %tx.id(), ops, "discarded transaction overlay");
        Ok(ops)
    }

    /// Number of transactions holding a non-empty op log.
    pub fn transactions_with_edits(&self) -> Result<usize, TransactionError> {
        let pending = self.pending.read().map_err(poisoned)?;
        Ok(pending.values().filter(|p| !p.ops.is_empty()).count())
    }

    /// Truncate the committed state. Refused while any transaction holds
    /// edits.
    pub fn reset(&self) -> Result<(), TransactionError> {
        let mut committed = self.committed.write().map_err(poisoned)?;
        let pending = self.pending.read().map_err(poisoned)?;
        let open = pending.values().filter(|p| !p.ops.is_empty()).count();
        if open > 0 {
            return Err(TransactionError::PendingEdits(open));
        }
        committed.state = S::default();
        committed.epoch += 1;
        Ok(())
    }
}

impl<S: Replay> Default for TxOverlay<S> {
    fn default() -> Self {
        Self::new()
    }
}
