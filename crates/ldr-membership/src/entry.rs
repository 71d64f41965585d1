use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use ldr_types::{Instant, Replay, ResourceId, Triple};

/// One derived membership triple.
///
/// `source` is the container whose membership configuration produced the
/// triple, `proxy` the child that contributed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipEntry {
    pub source: ResourceId,
    pub proxy: ResourceId,
    pub triple: Triple,
    pub start: Instant,
    pub end: Option<Instant>,
}

impl MembershipEntry {
    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }

    pub fn covers(&self, at: Instant) -> bool {
        self.start <= at && self.end.map_or(true, |end| at < end)
    }

    fn from_source(&self, source: &ResourceId, proxy: Option<&ResourceId>) -> bool {
        &self.source == source && proxy.map_or(true, |p| &self.proxy == p)
    }
}

/// A buffered membership edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipOp {
    Add(MembershipEntry),
    /// End the open entries of `source` (optionally only those contributed
    /// by `proxy`).
    End {
        source: ResourceId,
        proxy: Option<ResourceId>,
        at: Instant,
    },
    /// Forget every entry of `source`, open or closed.
    DeleteForSource { source: ResourceId },
    /// Forget every entry `target` produced or contributed.
    DeleteReferences { target: ResourceId },
}

/// Every membership entry, open and closed.
#[derive(Clone, Debug, Default)]
pub struct MembershipState {
    entries: Vec<MembershipEntry>,
}

impl Replay for MembershipState {
    type Op = MembershipOp;

    fn apply(&mut self, op: &MembershipOp) {
        match op {
            MembershipOp::Add(entry) => self.entries.push(entry.clone()),
            MembershipOp::End { source, proxy, at } => {
                for entry in self
                    .entries
                    .iter_mut()
                    .filter(|e| e.is_active() && e.from_source(source, proxy.as_ref()))
                {
                    entry.end = Some(*at);
                }
            }
            MembershipOp::DeleteForSource { source } => {
                self.entries.retain(|e| &e.source != source);
            }
            MembershipOp::DeleteReferences { target } => {
                self.entries
                    .retain(|e| &e.source != target && &e.proxy != target);
            }
        }
    }
}

impl MembershipState {
    fn about<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a MembershipEntry> {
        self.entries.iter().filter(move |e| e.triple.subject == subject)
    }

    /// Open triples about `subject`, deduplicated and sorted.
    pub fn current(&self, subject: &str) -> Vec<Triple> {
        self.about(subject)
            .filter(|e| e.is_active())
            .map(|e| e.triple.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Triples about `subject` at `at`, deduplicated and sorted.
    pub fn as_of(&self, subject: &str, at: Instant) -> Vec<Triple> {
        self.about(subject)
            .filter(|e| e.covers(at))
            .map(|e| e.triple.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Latest start or end among entries about `subject`.
    pub fn last_updated(&self, subject: &str) -> Option<Instant> {
        self.about(subject)
            .flat_map(|e| std::iter::once(e.start).chain(e.end))
            .max()
    }

    pub fn for_source(&self, source: &ResourceId) -> Vec<MembershipEntry> {
        self.entries
            .iter()
            .filter(|e| &e.source == source)
            .cloned()
            .collect()
    }
}
