use tracing::{debug, info};

use ldr_types::temporal;
use ldr_types::{
    CommitGate, Instant, ResourceId, Transaction, TransactionError, TransactionParticipant,
    TxOverlay,
};

use crate::edge::{ContainmentEdge, ContainmentOp, ContainmentState};
use crate::error::{IndexError, IndexResult};
use crate::traits::ContainmentIndex;

/// In-memory implementation of [`ContainmentIndex`].
///
/// The committed edges live in a [`TxOverlay`]; each transaction's edits are
/// an op log replayed over them.
pub struct InMemoryContainmentIndex {
    state: TxOverlay<ContainmentState>,
}

impl InMemoryContainmentIndex {
    pub fn new() -> Self {
        Self::with_gate(CommitGate::new())
    }

    /// Share `gate` with the other participants of one repository.
    pub fn with_gate(gate: CommitGate) -> Self {
        Self {
            state: TxOverlay::with_gate(gate),
        }
    }

    fn read<R>(&self, tx: &Transaction, f: impl FnOnce(&ContainmentState) -> R) -> IndexResult<R> {
        Ok(self.state.read(tx, f)?)
    }
}

impl Default for InMemoryContainmentIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn is_add_of(op: &ContainmentOp, parent: Option<&ResourceId>, child: &ResourceId) -> bool {
    match op {
        ContainmentOp::Add(edge) => &edge.child == child && parent.map_or(true, |p| &edge.parent == p),
        _ => false,
    }
}

impl ContainmentIndex for InMemoryContainmentIndex {
    fn get_contains(&self, tx: &Transaction, parent: &ResourceId) -> IndexResult<Vec<ResourceId>> {
        match parent.memento_instant() {
            Some(at) => {
                let base = parent.as_base_id();
                self.read(tx, |s| s.contains_as_of(&base, at))
            }
            None => self.read(tx, |s| s.contains(parent)),
        }
    }

    fn get_contains_deleted(
        &self,
        tx: &Transaction,
        parent: &ResourceId,
    ) -> IndexResult<Vec<ResourceId>> {
        self.read(tx, |s| s.contains_deleted(parent))
    }

    fn get_contained_by(
        &self,
        tx: &Transaction,
        child: &ResourceId,
    ) -> IndexResult<Option<ResourceId>> {
        self.read(tx, |s| s.contained_by(child))
    }

    fn get_contained_by_deleted(
        &self,
        tx: &Transaction,
        child: &ResourceId,
    ) -> IndexResult<Option<ResourceId>> {
        self.read(tx, |s| s.contained_by_deleted(child))
    }

    fn add_contained_by(
        &self,
        tx: &Transaction,
        parent: &ResourceId,
        child: &ResourceId,
        start: Option<Instant>,
        end: Option<Instant>,
    ) -> IndexResult<()> {
        if parent == child {
            return Err(IndexError::InvalidEdge {
                parent: parent.clone(),
                child: child.clone(),
                reason: "a resource can not contain itself".into(),
            });
        }
        let start = start.unwrap_or_else(temporal::now);
        if end.is_some_and(|end| end < start) {
            return Err(IndexError::InvalidEdge {
                parent: parent.clone(),
                child: child.clone(),
                reason: "edge ends before it starts".into(),
            });
        }
        self.state.stage(tx, |staging| {
            staging
                .ops
                .retain(|op| !matches!(op, ContainmentOp::Purge { child: c, .. } if c == child));
            staging.ops.push(ContainmentOp::Add(ContainmentEdge {
                parent: parent.clone(),
                child: child.clone(),
                start,
                end,
            }));
            Ok::<_, IndexError>(())
        })?;
        debug!(tx = %tx.id(), parent = %parent, child = %child, "staged containment edge");
        Ok(())
    }

    fn remove_contained_by(
        &self,
        tx: &Transaction,
        parent: &ResourceId,
        child: &ResourceId,
    ) -> IndexResult<()> {
        self.state.stage(tx, |staging| {
            let before = staging.ops.len();
            staging.ops.retain(|op| !is_add_of(op, Some(parent), child));
            if staging.ops.len() < before {
                return Ok::<_, IndexError>(());
            }
            if staging.view.contained_by(child).as_ref() == Some(parent) {
                staging.ops.push(ContainmentOp::End {
                    parent: parent.clone(),
                    child: child.clone(),
                    at: temporal::now(),
                });
            }
            Ok(())
        })?;
        debug!(tx = %tx.id(), parent = %parent, child = %child, "staged containment removal");
        Ok(())
    }

    fn remove_resource(&self, tx: &Transaction, child: &ResourceId) -> IndexResult<()> {
        self.state.stage(tx, |staging| {
            let before = staging.ops.len();
            staging.ops.retain(|op| !is_add_of(op, None, child));
            if staging.ops.len() < before {
                return Ok::<_, IndexError>(());
            }
            if let Some(parent) = staging.view.contained_by(child) {
                staging.ops.push(ContainmentOp::End {
                    parent,
                    child: child.clone(),
                    at: temporal::now(),
                });
            }
            Ok(())
        })?;
        debug!(tx = %tx.id(), child = %child, "staged resource removal");
        Ok(())
    }

    fn purge_resource(&self, tx: &Transaction, child: &ResourceId) -> IndexResult<()> {
        self.state.stage(tx, |staging| {
            let parent = staging
                .view
                .contained_by_deleted(child)
                .or_else(|| staging.view.contained_by(child));
            staging
                .ops
                .retain(|op| !matches!(op, ContainmentOp::End { child: c, .. } if c == child));
            if let Some(parent) = parent {
                staging.ops.push(ContainmentOp::Purge {
                    parent,
                    child: child.clone(),
                });
            }
            Ok::<_, IndexError>(())
        })?;
        debug!(tx = %tx.id(), child = %child, "staged resource purge");
        Ok(())
    }

    fn resource_exists(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        include_deleted: bool,
    ) -> IndexResult<bool> {
        let base = id.as_base_id();
        if base.is_root() {
            return Ok(true);
        }
        self.read(tx, |s| s.exists(&base, include_deleted))
    }

    fn get_container_id_by_path(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        check_deleted: bool,
    ) -> IndexResult<ResourceId> {
        let base = id.as_base_id();
        if base.is_root() {
            return Ok(base);
        }
        self.read(tx, |s| {
            let indexed = s.contained_by(&base).or_else(|| {
                check_deleted
                    .then(|| s.contained_by_deleted(&base))
                    .flatten()
            });
            if let Some(parent) = indexed {
                return parent;
            }
            base.ancestors()
                .into_iter()
                .find(|ancestor| ancestor.is_root() || s.exists(ancestor, check_deleted))
                .unwrap_or_else(ResourceId::root)
        })
    }

    fn has_resources_starting_with(&self, tx: &Transaction, id: &ResourceId) -> IndexResult<bool> {
        let base = id.as_base_id();
        self.read(tx, |s| s.has_descendants(&base))
    }

    fn containment_last_updated(
        &self,
        tx: &Transaction,
        parent: &ResourceId,
    ) -> IndexResult<Option<Instant>> {
        let base = parent.as_base_id();
        self.read(tx, |s| s.last_updated(&base))
    }

    fn reset(&self) -> IndexResult<()> {
        self.state.reset()?;
        info!("containment index reset");
        Ok(())
    }
}

impl TransactionParticipant for InMemoryContainmentIndex {
    fn participant_name(&self) -> &str {
        "containment"
    }

    fn commit(&self, tx: &Transaction) -> Result<(), TransactionError> {
        let ops = self.state.commit(tx)?;
        debug!(tx = %tx.id(), ops, "committed containment edits");
        Ok(())
    }

    fn rollback(&self, tx: &Transaction) -> Result<(), TransactionError> {
        self.state.rollback(tx).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn id(raw: &str) -> ResourceId {
        ResourceId::parse(raw).unwrap()
    }

    fn at(minute: u32) -> Instant {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, minute, 0).unwrap()
    }

    fn seeded(edges: &[(&str, &str)]) -> InMemoryContainmentIndex {
        let index = InMemoryContainmentIndex::new();
        let tx = Transaction::begin();
        for (parent, child) in edges {
            index
                .add_contained_by(&tx, &id(parent), &id(child), Some(at(0)), None)
                .unwrap();
        }
        index.commit(&tx).unwrap();
        index
    }

    // ---- Test 1: Isolation ----

    #[test]
    fn edge_visible_only_to_its_transaction_until_commit() {
        let index = InMemoryContainmentIndex::new();
        let a = Transaction::begin();
        let b = Transaction::begin();
        let no_tx = Transaction::read_only();

        index
            .add_contained_by(&a, &id("/p"), &id("/p/c"), None, None)
            .unwrap();

        assert_eq!(index.get_contains(&a, &id("/p")).unwrap(), vec![id("/p/c")]);
        assert!(index.get_contains(&b, &id("/p")).unwrap().is_empty());
        assert!(index.get_contains(&no_tx, &id("/p")).unwrap().is_empty());
        assert!(!index.resource_exists(&b, &id("/p/c"), false).unwrap());

        index.commit(&a).unwrap();
        assert_eq!(index.get_contains(&b, &id("/p")).unwrap(), vec![id("/p/c")]);
        assert_eq!(index.get_contains(&no_tx, &id("/p")).unwrap(), vec![id("/p/c")]);
    }

    #[test]
    fn rollback_hides_edge_from_every_view() {
        let index = InMemoryContainmentIndex::new();
        let a = Transaction::begin();
        index
            .add_contained_by(&a, &id("/p"), &id("/p/c"), None, None)
            .unwrap();
        index.rollback(&a).unwrap();

        assert!(index.get_contains(&a, &id("/p")).unwrap().is_empty());
        assert!(index
            .get_contains(&Transaction::read_only(), &id("/p"))
            .unwrap()
            .is_empty());
        assert_eq!(index.get_contained_by(&a, &id("/p/c")).unwrap(), None);
    }

    // ---- Test 2: Removal ----

    #[test]
    fn removing_an_uncommitted_edge_leaves_no_trace() {
        let index = InMemoryContainmentIndex::new();
        let tx = Transaction::begin();
        index
            .add_contained_by(&tx, &id("/p"), &id("/p/c"), None, None)
            .unwrap();
        index.remove_resource(&tx, &id("/p/c")).unwrap();
        index.commit(&tx).unwrap();

        let ro = Transaction::read_only();
        assert!(!index.resource_exists(&ro, &id("/p/c"), true).unwrap());
        assert!(index.get_contains_deleted(&ro, &id("/p")).unwrap().is_empty());
    }

    #[test]
    fn removing_a_committed_edge_keeps_a_tombstone_record() {
        let index = seeded(&[("/p", "/p/c")]);
        let tx = Transaction::begin();
        index.remove_contained_by(&tx, &id("/p"), &id("/p/c")).unwrap();

        assert!(index.get_contains(&tx, &id("/p")).unwrap().is_empty());
        assert_eq!(
            index.get_contains(&Transaction::read_only(), &id("/p")).unwrap(),
            vec![id("/p/c")]
        );
        index.commit(&tx).unwrap();

        let ro = Transaction::read_only();
        assert!(!index.resource_exists(&ro, &id("/p/c"), false).unwrap());
        assert!(index.resource_exists(&ro, &id("/p/c"), true).unwrap());
        assert_eq!(
            index.get_contained_by_deleted(&ro, &id("/p/c")).unwrap(),
            Some(id("/p"))
        );
        assert_eq!(index.get_contains_deleted(&ro, &id("/p")).unwrap(), vec![id("/p/c")]);
    }

    #[test]
    fn remove_with_wrong_parent_is_a_no_op() {
        let index = seeded(&[("/p", "/p/c")]);
        let tx = Transaction::begin();
        index.remove_contained_by(&tx, &id("/q"), &id("/p/c")).unwrap();
        assert_eq!(index.get_contained_by(&tx, &id("/p/c")).unwrap(), Some(id("/p")));
    }

    // ---- Test 3: Purge ----

    #[test]
    fn purge_after_delete_in_same_transaction() {
        let index = seeded(&[("/p", "/p/c")]);
        let tx = Transaction::begin();
        index.remove_resource(&tx, &id("/p/c")).unwrap();
        index.purge_resource(&tx, &id("/p/c")).unwrap();
        index.commit(&tx).unwrap();

        let ro = Transaction::read_only();
        assert!(!index.resource_exists(&ro, &id("/p/c"), true).unwrap());
        assert!(index.get_contains(&ro, &id("/p")).unwrap().is_empty());
    }

    #[test]
    fn re_adding_undoes_pending_purge() {
        let index = seeded(&[("/p", "/p/c")]);
        let tx = Transaction::begin();
        index.remove_resource(&tx, &id("/p/c")).unwrap();
        index.commit(&tx).unwrap();

        let tx = Transaction::begin();
        index.purge_resource(&tx, &id("/p/c")).unwrap();
        index
            .add_contained_by(&tx, &id("/p"), &id("/p/c"), None, None)
            .unwrap();
        index.commit(&tx).unwrap();

        let ro = Transaction::read_only();
        assert_eq!(index.get_contains(&ro, &id("/p")).unwrap(), vec![id("/p/c")]);
    }

    // ---- Test 4: Existence and paths ----

    #[test]
    fn root_always_exists() {
        let index = InMemoryContainmentIndex::new();
        let ro = Transaction::read_only();
        assert!(index.resource_exists(&ro, &ResourceId::root(), false).unwrap());
        assert!(index.resource_exists(&ro, &id("/fcr:acl"), false).unwrap());
    }

    #[test]
    fn existence_checks_the_base_id() {
        let index = seeded(&[("/", "/b")]);
        let ro = Transaction::read_only();
        assert!(index.resource_exists(&ro, &id("/b/fcr:metadata"), false).unwrap());
        assert!(index
            .resource_exists(&ro, &id("/b/fcr:versions/20200101000000"), false)
            .unwrap());
    }

    #[test]
    fn container_by_path_walks_up_to_existing_ancestor() {
        let index = seeded(&[("/", "/a"), ("/a", "/a/b")]);
        let ro = Transaction::read_only();
        assert_eq!(
            index.get_container_id_by_path(&ro, &id("/a/b"), false).unwrap(),
            id("/a")
        );
        assert_eq!(
            index.get_container_id_by_path(&ro, &id("/a/b/x/y"), false).unwrap(),
            id("/a/b")
        );
        assert_eq!(
            index.get_container_id_by_path(&ro, &id("/z/y"), false).unwrap(),
            ResourceId::root()
        );
        assert_eq!(
            index.get_container_id_by_path(&ro, &ResourceId::root(), false).unwrap(),
            ResourceId::root()
        );
    }

    #[test]
    fn ghost_nodes_have_descendants_but_no_record() {
        let index = seeded(&[("/", "/g/h")]);
        let ro = Transaction::read_only();
        assert!(!index.resource_exists(&ro, &id("/g"), true).unwrap());
        assert!(index.has_resources_starting_with(&ro, &id("/g")).unwrap());
        assert!(!index.has_resources_starting_with(&ro, &id("/g/h")).unwrap());
    }

    // ---- Test 5: History ----

    #[test]
    fn memento_parent_answers_as_of_its_instant() {
        let index = InMemoryContainmentIndex::new();
        let tx = Transaction::begin();
        index
            .add_contained_by(&tx, &id("/p"), &id("/p/old"), Some(at(0)), Some(at(10)))
            .unwrap();
        index
            .add_contained_by(&tx, &id("/p"), &id("/p/new"), Some(at(20)), None)
            .unwrap();
        index.commit(&tx).unwrap();

        let ro = Transaction::read_only();
        let early = id("/p").as_memento(at(5));
        let late = id("/p").as_memento(at(25));
        assert_eq!(index.get_contains(&ro, &early).unwrap(), vec![id("/p/old")]);
        assert_eq!(index.get_contains(&ro, &late).unwrap(), vec![id("/p/new")]);
        assert_eq!(
            index.containment_last_updated(&ro, &id("/p")).unwrap(),
            Some(at(20))
        );
    }

    // ---- Test 6: Errors leave state unchanged ----

    #[test]
    fn invalid_edges_are_rejected() {
        let index = InMemoryContainmentIndex::new();
        let tx = Transaction::begin();
        assert!(index
            .add_contained_by(&tx, &id("/p"), &id("/p"), None, None)
            .is_err());
        assert!(index
            .add_contained_by(&tx, &id("/p"), &id("/p/c"), Some(at(5)), Some(at(1)))
            .is_err());
        assert!(index.get_contains(&tx, &id("/p")).unwrap().is_empty());
    }

    #[test]
    fn read_only_transaction_can_not_mutate() {
        let index = InMemoryContainmentIndex::new();
        let ro = Transaction::read_only();
        let err = index
            .add_contained_by(&ro, &id("/p"), &id("/p/c"), None, None)
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::Transaction(TransactionError::ReadOnly(_))
        ));
    }

    #[test]
    fn reset_waits_for_open_edits() {
        let index = seeded(&[("/p", "/p/c")]);
        let tx = Transaction::begin();
        index.remove_resource(&tx, &id("/p/c")).unwrap();
        assert!(index.reset().is_err());
        index.rollback(&tx).unwrap();
        index.reset().unwrap();
        assert!(!index
            .resource_exists(&Transaction::read_only(), &id("/p/c"), true)
            .unwrap());
    }
}
