use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use ldr_types::{
    CommitGate, Transaction, TransactionError, TransactionId, TransactionParticipant,
    TransactionState,
};

use crate::cache::UserTypesCache;
use crate::error::KernelResult;

/// Opens transactions and drives every participant through commit or
/// rollback.
///
/// Commits are serialized: all participants are prepared, then all are
/// committed. When any prepare fails the transaction is rolled back
/// everywhere and the failure is returned.
///
/// The commit-all phase holds the [`CommitGate`] exclusively. Participants
/// built over the same gate therefore publish a transaction to readers all
/// at once.
pub struct TransactionManager {
    participants: Vec<Arc<dyn TransactionParticipant>>,
    gate: CommitGate,
    user_types: Arc<dyn UserTypesCache>,
    open: RwLock<HashMap<TransactionId, Transaction>>,
    commit_lock: Mutex<()>,
}

impl TransactionManager {
    pub fn new(user_types: Arc<dyn UserTypesCache>) -> Self {
        Self {
            participants: Vec::new(),
            gate: CommitGate::new(),
            user_types,
            open: RwLock::new(HashMap::new()),
            commit_lock: Mutex::new(()),
        }
    }

    /// Add a participant. Participants are prepared and committed in
    /// registration order.
    pub fn register(&mut self, participant: Arc<dyn TransactionParticipant>) {
        debug!(participant = participant.participant_name(), "registered transaction participant");
        self.participants.push(participant);
    }

    /// The gate participants must share to be published atomically.
    pub fn gate(&self) -> &CommitGate {
        &self.gate
    }

    pub fn participant_names(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.participant_name()).collect()
    }

    pub fn begin(&self) -> KernelResult<Transaction> {
        self.track(Transaction::begin())
    }

    pub fn begin_read_only(&self) -> KernelResult<Transaction> {
        self.track(Transaction::read_only())
    }

    /// An open transaction by id.
    pub fn get(&self, id: &TransactionId) -> KernelResult<Option<Transaction>> {
        let open = self.open.read().map_err(|_| poisoned())?;
        Ok(open.get(id).cloned())
    }

    pub fn open_count(&self) -> KernelResult<usize> {
        Ok(self.open.read().map_err(|_| poisoned())?.len())
    }

    pub fn commit(&self, tx: &Transaction) -> KernelResult<()> {
        tx.ensure_open()?;
        let _serial = self.commit_lock.lock().map_err(|_| poisoned())?;

        if !tx.is_read_only() {
            for participant in &self.participants {
                if let Err(e) = participant.prepare(tx) {
                    warn!(tx = %tx.id(), participant = participant.participant_name(), error = %e, "commit rejected");
                    self.abort(tx)?;
                    return Err(e.into());
                }
            }
            let _publish = self.gate.exclusive()?;
            for participant in &self.participants {
                participant.commit(tx)?;
            }
        }

        tx.finish(TransactionState::Committed)?;
        self.release(tx)?;
        info!(tx = %tx.id(), read_only = tx.is_read_only(), "transaction committed");
        Ok(())
    }

    pub fn rollback(&self, tx: &Transaction) -> KernelResult<()> {
        tx.ensure_open()?;
        self.abort(tx)?;
        info!(tx = %tx.id(), "transaction rolled back");
        Ok(())
    }

    fn abort(&self, tx: &Transaction) -> KernelResult<()> {
        for participant in &self.participants {
            participant.rollback(tx)?;
        }
        tx.finish(TransactionState::RolledBack)?;
        self.release(tx)
    }

    fn track(&self, tx: Transaction) -> KernelResult<Transaction> {
        self.open
            .write()
            .map_err(|_| poisoned())?
            .insert(tx.id(), tx.clone());
        debug!(tx = %tx.id(), read_only = tx.is_read_only(), "transaction opened");
        Ok(tx)
    }

    fn release(&self, tx: &Transaction) -> KernelResult<()> {
        self.open.write().map_err(|_| poisoned())?.remove(&tx.id());
        self.user_types.invalidate_session(&tx.session_token())
    }
}

fn poisoned() -> TransactionError {
    TransactionError::LockPoisoned("transaction manager".into())
}
