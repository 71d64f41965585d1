//! Transactions: the unit-of-work boundary for storage and index edits.
//!
//! A [`Transaction`] is a cheap, clonable handle. Every storage and index
//! call takes one; edits made under it stay invisible to every other
//! transaction until a [`TransactionParticipant`] commit merges them.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::TransactionError;
use crate::temporal::{self, Instant};

/// Unique identifier for a transaction (UUID v7, time-ordered).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(uuid::Uuid);

impl TransactionId {
    /// Generate a new time-ordered transaction ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

struct TxInner {
    id: TransactionId,
    read_only: bool,
    started: Instant,
    state: RwLock<TransactionState>,
}

/// Handle to an open (or terminated) transaction.
///
/// Clones share state: terminating one clone terminates them all.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TxInner>,
}

impl Transaction {
    /// Start a read-write transaction.
    pub fn begin() -> Self {
        Self::with_mode(false)
    }

    /// Start a read-only transaction. It sees committed state only and
    /// rejects every mutation.
    pub fn read_only() -> Self {
        Self::with_mode(true)
    }

    fn with_mode(read_only: bool) -> Self {
        Self {
            inner: Arc::new(TxInner {
                id: TransactionId::new(),
                read_only,
                started: temporal::now(),
                state: RwLock::new(TransactionState::Open),
            }),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    /// Token identifying this transaction's session in shared caches.
    pub fn session_token(&self) -> String {
        self.inner.id.to_string()
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.read_only
    }

    pub fn started(&self) -> Instant {
        self.inner.started
    }

    pub fn state(&self) -> Result<TransactionState, TransactionError> {
        let state = self
            .inner
            .state
            .read()
            .map_err(|e| TransactionError::LockPoisoned(e.to_string()))?;
        Ok(*state)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state(), Ok(TransactionState::Open))
    }

    /// Fails unless the transaction is still open.
    pub fn ensure_open(&self) -> Result<(), TransactionError> {
        match self.state()? {
            TransactionState::Open => Ok(()),
            state => Err(TransactionError::NotOpen {
                id: self.id(),
                state,
            }),
        }
    }

    /// Fails unless the transaction is open and accepts mutations.
    pub fn ensure_writable(&self) -> Result<(), TransactionError> {
        self.ensure_open()?;
        if self.inner.read_only {
            return Err(TransactionError::ReadOnly(self.id()));
        }
        Ok(())
    }

    /// Move the transaction into a terminal state. Succeeds exactly once.
    pub fn finish(&self, outcome: TransactionState) -> Result<(), TransactionError> {
        let mut state = self
            .inner
            .state
            .write()
            .map_err(|e| TransactionError::LockPoisoned(e.to_string()))?;
        if state.is_terminal() {
            return Err(TransactionError::AlreadyTerminated {
                id: self.id(),
                state: *state,
            });
        }
        if !outcome.is_terminal() {
            return Err(TransactionError::NotOpen {
                id: self.id(),
                state: *state,
            });
        }
        *state = outcome;
        Ok(())
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Transaction {}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.inner.id)
            .field("read_only", &self.inner.read_only)
            .field("state", &self.state().ok())
            .finish()
    }
}

/// A component holding transactionally buffered state.
///
/// The transaction manager calls [`prepare`](Self::prepare) on every
/// participant before calling [`commit`](Self::commit) on any of them, so a
/// participant that can reject a commit must do so in `prepare`.
pub trait TransactionParticipant: Send + Sync {
    /// Short name used in logs and conflict reports.
    fn participant_name(&self) -> &str;

    /// Validate that the transaction's buffered edits can be applied.
    fn prepare(&self, _tx: &Transaction) -> Result<(), TransactionError> {
        Ok(())
    }

    /// Merge the transaction's buffered edits into the committed state.
    fn commit(&self, tx: &Transaction) -> Result<(), TransactionError>;

    /// Discard the transaction's buffered edits.
    fn rollback(&self, tx: &Transaction) -> Result<(), TransactionError>;
}
