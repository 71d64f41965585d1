//! Containment edges and the replayable containment state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use ldr_types::{Instant, Replay, ResourceId};

/// One parent/child edge. `end` is set once the child is removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainmentEdge {
    pub parent: ResourceId,
    pub child: ResourceId,
    pub start: Instant,
    pub end: Option<Instant>,
}

impl ContainmentEdge {
    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }

    /// Whether the edge existed at `at`.
    pub fn covers(&self, at: Instant) -> bool {
        self.start <= at && self.end.map_or(true, |end| at < end)
    }
}

/// A buffered containment edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainmentOp {
    /// Record a new edge.
    Add(ContainmentEdge),
    /// End the child's active edge under `parent`.
    End {
        parent: ResourceId,
        child: ResourceId,
        at: Instant,
    },
    /// Drop every edge of the child under `parent`.
    Purge {
        parent: ResourceId,
        child: ResourceId,
    },
}

impl ContainmentOp {
    pub fn child(&self) -> &ResourceId {
        match self {
            Self::Add(edge) => &edge.child,
            Self::End { child, .. } | Self::Purge { child, .. } => child,
        }
    }
}

/// Every edge ever recorded, indexed by child and by parent.
#[derive(Clone, Debug, Default)]
pub struct ContainmentState {
    by_child: BTreeMap<ResourceId, Vec<ContainmentEdge>>,
    by_parent: BTreeMap<ResourceId, BTreeSet<ResourceId>>,
}

impl Replay for ContainmentState {
    type Op = ContainmentOp;

    fn apply(&mut self, op: &ContainmentOp) {
        match op {
            ContainmentOp::Add(edge) => {
                self.by_child
                    .entry(edge.child.clone())
                    .or_default()
                    .push(edge.clone());
                self.by_parent
                    .entry(edge.parent.clone())
                    .or_default()
                    .insert(edge.child.clone());
            }
            ContainmentOp::End { parent, child, at } => {
                if let Some(edge) = self.by_child.get_mut(child).and_then(|edges| {
                    edges
                        .iter_mut()
                        .rev()
                        .find(|e| e.is_active() && &e.parent == parent)
                }) {
                    edge.end = Some(*at);
                }
            }
            ContainmentOp::Purge { parent, child } => {
                if let Some(edges) = self.by_child.get_mut(child) {
                    edges.retain(|e| &e.parent != parent);
                    if edges.is_empty() {
                        self.by_child.remove(child);
                    }
                }
                if let Some(children) = self.by_parent.get_mut(parent) {
                    children.remove(child);
                    if children.is_empty() {
                        self.by_parent.remove(parent);
                    }
                }
            }
        }
    }
}

impl ContainmentState {
    fn edges(&self, child: &ResourceId) -> &[ContainmentEdge] {
        self.by_child.get(child).map(Vec::as_slice).unwrap_or_default()
    }

    fn active_edge(&self, child: &ResourceId) -> Option<&ContainmentEdge> {
        self.edges(child).iter().rev().find(|e| e.is_active())
    }

    fn children_ever(&self, parent: &ResourceId) -> impl Iterator<Item = &ResourceId> {
        self.by_parent.get(parent).into_iter().flatten()
    }

    /// Live children of `parent`, in id order.
    pub fn contains(&self, parent: &ResourceId) -> Vec<ResourceId> {
        self.children_ever(parent)
            .filter(|child| {
                self.active_edge(child)
                    .is_some_and(|edge| &edge.parent == parent)
            })
            .cloned()
            .collect()
    }

    /// Children of `parent` at `at`.
    pub fn contains_as_of(&self, parent: &ResourceId, at: Instant) -> Vec<ResourceId> {
        self.children_ever(parent)
            .filter(|child| {
                self.edges(child)
                    .iter()
                    .any(|edge| &edge.parent == parent && edge.covers(at))
            })
            .cloned()
            .collect()
    }

    /// Removed children of `parent` that have not been re-added anywhere.
    pub fn contains_deleted(&self, parent: &ResourceId) -> Vec<ResourceId> {
        self.children_ever(parent)
            .filter(|child| self.contained_by_deleted(child).as_ref() == Some(parent))
            .cloned()
            .collect()
    }

    pub fn contained_by(&self, child: &ResourceId) -> Option<ResourceId> {
        self.active_edge(child).map(|edge| edge.parent.clone())
    }

    /// Parent of the child's most recent edge, if the child is removed.
    pub fn contained_by_deleted(&self, child: &ResourceId) -> Option<ResourceId> {
        if self.active_edge(child).is_some() {
            return None;
        }
        self.edges(child).last().map(|edge| edge.parent.clone())
    }

    pub fn exists(&self, child: &ResourceId, include_deleted: bool) -> bool {
        if include_deleted {
            !self.edges(child).is_empty()
        } else {
            self.active_edge(child).is_some()
        }
    }

    /// Whether any tracked resource, live or removed, sits below `id`.
    pub fn has_descendants(&self, id: &ResourceId) -> bool {
        let base = id.base_id();
        if base == "/" {
            return self.by_child.keys().any(|k| !k.is_root());
        }
        let prefix = format!("{base}/");
        self.by_child
            .range(id.clone()..)
            .map(|(k, _)| k)
            .take_while(|k| k.full_id().starts_with(base))
            .any(|k| k.full_id().starts_with(&prefix))
    }

    /// Latest start or end among the edges below `parent`.
    pub fn last_updated(&self, parent: &ResourceId) -> Option<Instant> {
        self.children_ever(parent)
            .flat_map(|child| self.edges(child))
            .filter(|edge| &edge.parent == parent)
            .flat_map(|edge| std::iter::once(edge.start).chain(edge.end))
            .max()
    }
}
