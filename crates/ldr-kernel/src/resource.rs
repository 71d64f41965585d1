//! Resource variants.
//!
//! Every resource the factory hands out is a [`FedoraResource`]: shared
//! header-derived state plus a [`ResourceKind`] tag. Dispatch on the tag is
//! exhaustive, so adding a variant is a compile error everywhere it matters.

use std::fmt;
use std::sync::OnceLock;

use ldr_store::{BinaryHeaders, ResourceHeaders};
use ldr_types::vocab::{ldp, memento};
use ldr_types::{Instant, InteractionModel, ResourceId, Transaction, Triple};

use crate::error::KernelResult;
use crate::factory::ResourceFactory;
use crate::types::SystemTypes;

/// The closed set of resource variants.
#[derive(Clone, Debug)]
pub enum ResourceKind {
    /// Basic, direct, or indirect container.
    Container,
    /// Non-RDF content, with its binary headers.
    Binary(BinaryHeaders),
    /// The RDF description paired with a binary.
    BinaryDescription,
    Acl,
    /// Virtual list of the mementos of the wrapped original resource.
    TimeMap(Box<FedoraResource>),
    /// Stand-in for the wrapped deleted resource.
    Tombstone(Box<FedoraResource>),
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Container => "Container",
            Self::Binary(_) => "Binary",
            Self::BinaryDescription => "BinaryDescription",
            Self::Acl => "Acl",
            Self::TimeMap(_) => "TimeMap",
            Self::Tombstone(_) => "Tombstone",
        }
    }
}

/// Header-derived attributes shared by every variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    pub interaction_model: InteractionModel,
    pub parent_id: Option<ResourceId>,
    pub archival_group_id: Option<ResourceId>,
    pub archival_group: bool,
    pub created_by: Option<String>,
    pub created_date: Instant,
    pub last_modified_by: Option<String>,
    pub last_modified_date: Instant,
    pub state_token: String,
}

impl ResourceInfo {
    pub(crate) fn from_headers(headers: &ResourceHeaders, model: InteractionModel) -> Self {
        Self {
            interaction_model: model,
            parent_id: headers.parent.clone(),
            archival_group_id: headers.archival_group_id.clone(),
            archival_group: headers.archival_group,
            created_by: headers.created_by.clone(),
            created_date: headers.created_date,
            last_modified_by: headers.last_modified_by.clone(),
            last_modified_date: headers.last_modified_date,
            state_token: headers.state_token.clone(),
        }
    }
}

/// A resource as seen by one transaction.
#[derive(Clone)]
pub struct FedoraResource {
    id: ResourceId,
    kind: ResourceKind,
    info: ResourceInfo,
    /// Set on the object wrapped by a tombstone: it keeps its identity but
    /// exposes no types, triples, or children.
    deleted_object: bool,
    tx: Transaction,
    factory: ResourceFactory,
    system_types: OnceLock<SystemTypes>,
}

impl FedoraResource {
    pub(crate) fn new(
        id: ResourceId,
        kind: ResourceKind,
        info: ResourceInfo,
        tx: Transaction,
        factory: ResourceFactory,
    ) -> Self {
        Self {
            id,
            kind,
            info,
            deleted_object: false,
            tx,
            factory,
            system_types: OnceLock::new(),
        }
    }

    /// Wrap this resource as the deleted object of a tombstone.
    pub(crate) fn into_tombstone(self) -> Self {
        let mut deleted = self;
        deleted.deleted_object = true;
        deleted.system_types = OnceLock::new();
        Self {
            id: deleted.id.clone(),
            info: deleted.info.clone(),
            tx: deleted.tx.clone(),
            factory: deleted.factory.clone(),
            deleted_object: false,
            system_types: OnceLock::new(),
            kind: ResourceKind::Tombstone(Box::new(deleted)),
        }
    }

    /// The virtual TimeMap of `original`.
    pub(crate) fn timemap_of(original: FedoraResource) -> Self {
        Self {
            id: original.id.resource_id().as_timemap(),
            info: original.info.clone(),
            tx: original.tx.clone(),
            factory: original.factory.clone(),
            deleted_object: false,
            system_types: OnceLock::new(),
            kind: ResourceKind::TimeMap(Box::new(original)),
        }
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn info(&self) -> &ResourceInfo {
        &self.info
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub(crate) fn factory(&self) -> &ResourceFactory {
        &self.factory
    }

    pub(crate) fn cached_system_types(&self) -> &SystemTypes {
        self.system_types.get_or_init(|| SystemTypes::for_resource(self))
    }

    pub fn interaction_model(&self) -> InteractionModel {
        self.info.interaction_model
    }

    pub fn parent_id(&self) -> Option<&ResourceId> {
        self.info.parent_id.as_ref()
    }

    pub fn archival_group_id(&self) -> Option<&ResourceId> {
        self.info.archival_group_id.as_ref()
    }

    pub fn is_archival_group(&self) -> bool {
        self.info.archival_group
    }

    pub fn created_date(&self) -> Instant {
        self.info.created_date
    }

    pub fn last_modified_date(&self) -> Instant {
        self.info.last_modified_date
    }

    pub fn state_token(&self) -> &str {
        &self.info.state_token
    }

    /// Weak entity tag derived from the state token.
    pub fn etag(&self) -> String {
        format!("W/\"{}\"", self.info.state_token)
    }

    pub fn binary(&self) -> Option<&BinaryHeaders> {
        match &self.kind {
            ResourceKind::Binary(binary) => Some(binary),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, ResourceKind::Container)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.kind, ResourceKind::Binary(_))
    }

    pub fn is_description(&self) -> bool {
        matches!(self.kind, ResourceKind::BinaryDescription)
    }

    pub fn is_acl(&self) -> bool {
        matches!(self.kind, ResourceKind::Acl)
    }

    pub fn is_timemap(&self) -> bool {
        matches!(self.kind, ResourceKind::TimeMap(_))
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self.kind, ResourceKind::Tombstone(_))
    }

    /// Whether this is the object wrapped by a tombstone.
    pub fn is_deleted_object(&self) -> bool {
        self.deleted_object
    }

    /// The resource a tombstone stands in for.
    pub fn deleted_object(&self) -> Option<&FedoraResource> {
        match &self.kind {
            ResourceKind::Tombstone(deleted) => Some(deleted),
            _ => None,
        }
    }

    /// Unwrap a tombstone to its deleted object; anything else is returned
    /// as is.
    pub fn into_deleted_object(self) -> FedoraResource {
        match self.kind {
            ResourceKind::Tombstone(deleted) => *deleted,
            kind => Self { kind, ..self },
        }
    }

    /// The subject stored triples are exposed under: the described binary
    /// for a description, the full (possibly memento) id otherwise.
    pub fn exposed_subject(&self) -> ResourceId {
        match self.kind {
            ResourceKind::BinaryDescription => self.id.as_described(),
            _ => self.id.clone(),
        }
    }

    /// The RDF description of this resource: the paired description for a
    /// binary, the resource itself otherwise. Memento-ness is kept.
    pub fn description(&self) -> KernelResult<FedoraResource> {
        match self.kind {
            ResourceKind::Binary(_) => self.factory.get_resource(&self.tx, &self.id.as_description()),
            _ => Ok(self.clone()),
        }
    }

    /// The resource this one describes: the binary for a description, the
    /// resource itself otherwise. Memento-ness is kept.
    pub fn described_resource(&self) -> KernelResult<FedoraResource> {
        match self.kind {
            ResourceKind::BinaryDescription => {
                self.factory.get_resource(&self.tx, &self.id.as_described())
            }
            _ => Ok(self.clone()),
        }
    }

    /// The ACL protecting this resource, or `None` when there is none.
    pub fn acl(&self) -> KernelResult<Option<FedoraResource>> {
        match self.kind {
            ResourceKind::Acl => return Ok(Some(self.clone())),
            ResourceKind::Tombstone(_) => return Ok(None),
            _ => {}
        }
        match self.factory.get_resource(&self.tx, &self.id.as_acl()) {
            Ok(acl) if acl.is_tombstone() => Ok(None),
            Ok(acl) => Ok(Some(acl)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Triples of this resource, subjects rewritten to the exposed subject.
    /// A TimeMap synthesizes its own; tombstones and deleted objects have
    /// none.
    pub fn triples(&self) -> KernelResult<Vec<Triple>> {
        if self.deleted_object {
            return Ok(Vec::new());
        }
        match &self.kind {
            ResourceKind::Tombstone(_) => Ok(Vec::new()),
            ResourceKind::TimeMap(original) => {
                let subject = self.id.full_id();
                let mut triples = vec![Triple::iri(subject, memento::ORIGINAL, original.id.full_id())];
                for memento_id in self.memento_ids()? {
                    triples.push(Triple::iri(subject, ldp::CONTAINS, memento_id.full_id()));
                }
                Ok(triples)
            }
            _ => {
                let stored = self.factory.storage().get_triples(
                    &self.tx,
                    &self.id,
                    self.id.memento_instant(),
                )?;
                let key = self.id.resource_id();
                let described = key.as_described();
                let exposed = self.exposed_subject();
                Ok(stored
                    .into_iter()
                    .map(|t| {
                        if t.subject == key.full_id() || t.subject == described.full_id() {
                            t.with_subject(exposed.full_id())
                        } else {
                            t
                        }
                    })
                    .collect())
            }
        }
    }

    /// Ids of every memento of the original resource behind this one,
    /// ascending.
    pub(crate) fn memento_ids(&self) -> KernelResult<Vec<ResourceId>> {
        let original = match &self.kind {
            ResourceKind::TimeMap(original) => original.id.resource_id(),
            _ => self.id.resource_id(),
        };
        let versions = self.factory.storage().list_versions(&self.tx, &original)?;
        Ok(versions.into_iter().map(|at| original.as_memento(at)).collect())
    }
}

impl fmt::Debug for FedoraResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FedoraResource")
            .field("id", &self.id.full_id())
            .field("kind", &self.kind.name())
            .field("deleted_object", &self.deleted_object)
            .field("tx", &self.tx.id())
            .finish()
    }
}

/// Lazy sequence of the children of a resource. Each child is resolved
/// through the factory when it is reached.
pub struct Children {
    ids: std::vec::IntoIter<ResourceId>,
    scope: Option<(ResourceFactory, Transaction)>,
}

impl Children {
    pub(crate) fn new(ids: Vec<ResourceId>, factory: ResourceFactory, tx: Transaction) -> Self {
        Self {
            ids: ids.into_iter(),
            scope: Some((factory, tx)),
        }
    }

    pub fn empty() -> Self {
        Self {
            ids: Vec::new().into_iter(),
            scope: None,
        }
    }

    /// Ids not yet resolved.
    pub fn ids(&self) -> &[ResourceId] {
        self.ids.as_slice()
    }
}

impl Iterator for Children {
    type Item = KernelResult<FedoraResource>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.ids.next()?;
        let (factory, tx) = self.scope.as_ref()?;
        Some(factory.get_resource(tx, &id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for Children {}
