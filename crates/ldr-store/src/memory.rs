use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use ldr_types::temporal::format_memento_label;
use ldr_types::{
    CommitGate, Instant, Replay, ResourceId, Transaction, TransactionError, TransactionParticipant,
    Triple, TxOverlay,
};

use crate::error::{StoreError, StoreResult};
use crate::headers::{ResourceHeaders, ResourceSnapshot};
use crate::traits::{PersistentStorageSession, StorageWriter};

#[derive(Clone, Debug)]
struct StoredRecord {
    head: ResourceSnapshot,
    versions: BTreeMap<Instant, ResourceSnapshot>,
}

/// Every record, keyed by full storage key.
#[derive(Clone, Debug, Default)]
pub struct StorageState {
    records: HashMap<String, StoredRecord>,
}

/// A buffered storage edit.
///
/// `expected` holds the committed state token seen the first time the
/// transaction touched the key (`None` if the record did not exist). Later
/// edits of the same key carry no expectation.
#[derive(Clone, Debug)]
pub enum StorageOp {
    Put {
        key: String,
        snapshot: ResourceSnapshot,
        expected: Option<Option<String>>,
    },
    Version {
        key: String,
        at: Instant,
        expected: Option<Option<String>>,
    },
    Purge {
        key: String,
        expected: Option<Option<String>>,
    },
}

impl StorageOp {
    fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Version { key, .. } | Self::Purge { key, .. } => key,
        }
    }

    fn expected(&self) -> Option<&Option<String>> {
        match self {
            Self::Put { expected, .. }
            | Self::Version { expected, .. }
            | Self::Purge { expected, .. } => expected.as_ref(),
        }
    }
}

impl Replay for StorageState {
    type Op = StorageOp;

    fn apply(&mut self, op: &StorageOp) {
        match op {
            StorageOp::Put { key, snapshot, .. } => {
                self.records
                    .entry(key.clone())
                    .and_modify(|record| record.head = snapshot.clone())
                    .or_insert_with(|| StoredRecord {
                        head: snapshot.clone(),
                        versions: BTreeMap::new(),
                    });
            }
            StorageOp::Version { key, at, .. } => {
                if let Some(record) = self.records.get_mut(key) {
                    let snapshot = record.head.clone();
                    record.versions.insert(*at, snapshot);
                }
            }
            StorageOp::Purge { key, .. } => {
                self.records.remove(key);
            }
        }
    }
}

impl StorageState {
    fn token(&self, key: &str) -> Option<String> {
        self.records
            .get(key)
            .map(|record| record.head.headers.state_token.clone())
    }

    fn snapshot(&self, key: &str, version: Option<Instant>) -> StoreResult<&ResourceSnapshot> {
        let record = self
            .records
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        match version {
            None => Ok(&record.head),
            Some(at) => record.versions.get(&at).ok_or_else(|| {
                StoreError::NotFound(format!(
                    "{key}/{}/{}",
                    ldr_types::id::FCR_VERSIONS,
                    format_memento_label(&at)
                ))
            }),
        }
    }
}

/// Transactional in-memory storage.
///
/// Writes are buffered in a [`TxOverlay`]. At prepare time every record the
/// transaction touched is checked against the committed state token it saw
/// on first touch; a mismatch rejects the commit.
pub struct InMemoryStorage {
    state: TxOverlay<StorageState>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_gate(CommitGate::new())
    }

    /// Share `gate` with the other participants of one repository.
    pub fn with_gate(gate: CommitGate) -> Self {
        Self {
            state: TxOverlay::with_gate(gate),
        }
    }

    /// Number of committed records.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.state.read_committed(|s| s.records.len())?)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn key(id: &ResourceId) -> String {
        id.resource_id().full_id().to_string()
    }

    fn stage_op(
        &self,
        tx: &Transaction,
        key: String,
        build: impl FnOnce(&StorageState, Option<Option<String>>) -> StoreResult<StorageOp>,
    ) -> StoreResult<()> {
        self.state.stage(tx, |staging| {
            let first_touch = !staging.ops.iter().any(|op| op.key() == key);
            let expected = first_touch.then(|| staging.committed.token(&key));
            let op = build(staging.view, expected)?;
            staging.ops.push(op);
            Ok(())
        })
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistentStorageSession for InMemoryStorage {
    fn get_headers(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        version: Option<Instant>,
    ) -> StoreResult<ResourceHeaders> {
        let key = Self::key(id);
        self.state
            .read(tx, |s| s.snapshot(&key, version).map(|snap| snap.headers.clone()))?
    }

    fn list_versions(&self, tx: &Transaction, id: &ResourceId) -> StoreResult<Vec<Instant>> {
        let key = Self::key(id);
        self.state.read(tx, |s| {
            s.records
                .get(&key)
                .map(|record| record.versions.keys().copied().collect())
                .ok_or(StoreError::NotFound(key.clone()))
        })?
    }

    fn get_triples(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        version: Option<Instant>,
    ) -> StoreResult<Vec<Triple>> {
        let key = Self::key(id);
        self.state
            .read(tx, |s| s.snapshot(&key, version).map(|snap| snap.triples.clone()))?
    }
}

impl StorageWriter for InMemoryStorage {
    fn write(
        &self,
        tx: &Transaction,
        mut headers: ResourceHeaders,
        triples: Vec<Triple>,
    ) -> StoreResult<ResourceHeaders> {
        let key = Self::key(&headers.id);
        let mut snapshot = ResourceSnapshot::new(headers.clone(), triples);
        snapshot.validate()?;
        headers.state_token = snapshot.compute_state_token()?;
        snapshot.headers.state_token = headers.state_token.clone();

        self.stage_op(tx, key.clone(), |_, expected| {
            Ok(StorageOp::Put {
                key: key.clone(),
                snapshot,
                expected,
            })
        })?;
        debug!(tx = %tx.id(), key = %key, token = %headers.state_token, "staged record write");
        Ok(headers)
    }

    fn create_version(&self, tx: &Transaction, id: &ResourceId, at: Instant) -> StoreResult<()> {
        let key = Self::key(id);
        self.stage_op(tx, key.clone(), |view, expected| {
            if !view.records.contains_key(&key) {
                return Err(StoreError::NotFound(key.clone()));
            }
            Ok(StorageOp::Version {
                key: key.clone(),
                at,
                expected,
            })
        })?;
        debug!(tx = %tx.id(), key = %key, version = %format_memento_label(&at), "staged version");
        Ok(())
    }

    fn purge(&self, tx: &Transaction, id: &ResourceId) -> StoreResult<()> {
        let key = Self::key(id);
        self.stage_op(tx, key.clone(), |view, expected| {
            if !view.records.contains_key(&key) {
                return Err(StoreError::NotFound(key.clone()));
            }
            Ok(StorageOp::Purge {
                key: key.clone(),
                expected,
            })
        })?;
        debug!(tx = %tx.id(), key = %key, "staged purge");
        Ok(())
    }
}

impl TransactionParticipant for InMemoryStorage {
    fn participant_name(&self) -> &str {
        "storage"
    }

    fn prepare(&self, tx: &Transaction) -> Result<(), TransactionError> {
        let ops = self.state.pending_ops(tx)?;
        self.state.read_committed(|committed| {
            for op in &ops {
                let Some(expected) = op.expected() else {
                    continue;
                };
                let current = committed.token(op.key());
                if &current != expected {
                    warn!(tx = %tx.id(), key = %op.key(), "concurrent modification detected");
                    return Err(TransactionError::Conflict {
                        id: tx.id(),
                        participant: self.participant_name().to_string(),
                        reason: format!("{} was modified by another transaction", op.key()),
                    });
                }
            }
            Ok(())
        })?
    }

    fn commit(&self, tx: &Transaction) -> Result<(), TransactionError> {
        self.state.commit(tx).map(|_| ())
    }

    fn rollback(&self, tx: &Transaction) -> Result<(), TransactionError> {
        self.state.rollback(tx).map(|_| ())
    }
}
