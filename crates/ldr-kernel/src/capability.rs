//! Capability interfaces shared by every resource variant.

use tracing::debug;

use ldr_types::vocab::rdf;
use ldr_types::{Instant, Term};

use crate::cache::UserTypesKey;
use crate::error::{KernelError, KernelResult};
use crate::memento::select_nearest;
use crate::resource::{Children, FedoraResource, ResourceKind};

/// Type resolution.
pub trait Typed {
    /// Structural types. With `for_rdf`, internal-only markers (archival
    /// group, memento, versioned resource, time map) are left out.
    fn system_types(&self, for_rdf: bool) -> &[String];

    /// `rdf:type` objects asserted in the resource's description.
    fn user_types(&self) -> KernelResult<Vec<String>>;

    /// System types followed by user types, without duplicates.
    fn types(&self) -> KernelResult<Vec<String>> {
        let mut all = self.system_types(false).to_vec();
        for t in self.user_types()? {
            if !all.contains(&t) {
                all.push(t);
            }
        }
        Ok(all)
    }

    fn has_type(&self, uri: &str) -> KernelResult<bool> {
        if self.system_types(false).iter().any(|t| t == uri) {
            return Ok(true);
        }
        Ok(self.user_types()?.iter().any(|t| t == uri))
    }
}

/// Version navigation.
pub trait Versionable {
    fn is_memento(&self) -> bool;

    fn memento_datetime(&self) -> Option<Instant>;

    /// Whether this is a current (non-memento) resource with a version
    /// history of its own.
    fn is_original_resource(&self) -> bool;

    /// The current resource behind a memento or TimeMap.
    fn original_resource(&self) -> KernelResult<FedoraResource>;

    /// The TimeMap of the original resource.
    fn timemap(&self) -> KernelResult<FedoraResource>;

    /// Instants of every memento of the original resource, ascending.
    fn memento_datetimes(&self) -> KernelResult<Vec<Instant>>;

    /// The memento nearest to `target`: closest at or before it, else the
    /// earliest after it. `None` when there are no mementos.
    fn find_memento_by_datetime(&self, target: Instant) -> KernelResult<Option<FedoraResource>>;
}

/// Containment navigation.
pub trait Containable {
    /// Live children from the containment index. A memento container lists
    /// its children as of the memento instant; a TimeMap lists its
    /// mementos.
    fn children(&self) -> KernelResult<Children>;

    /// The containing resource according to the containment index, or
    /// `None` for the root.
    fn container(&self) -> KernelResult<Option<FedoraResource>>;

    /// The parent recorded in the headers.
    fn parent(&self) -> KernelResult<Option<FedoraResource>>;
}

impl Typed for FedoraResource {
    fn system_types(&self, for_rdf: bool) -> &[String] {
        self.cached_system_types().get(for_rdf)
    }

    fn user_types(&self) -> KernelResult<Vec<String>> {
        if self.is_deleted_object() {
            return Ok(Vec::new());
        }
        if matches!(self.kind(), ResourceKind::Tombstone(_) | ResourceKind::TimeMap(_)) {
            return Ok(Vec::new());
        }
        let description = match self.description() {
            Ok(description) => description,
            Err(e) if e.is_not_found() && self.is_binary() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        if description.is_tombstone() {
            return Ok(Vec::new());
        }

        let subject = description.exposed_subject();
        let loader = || -> KernelResult<Vec<String>> {
            let mut types: Vec<String> = Vec::new();
            for triple in description.triples()? {
                if triple.subject != subject.full_id() || triple.predicate != rdf::TYPE {
                    continue;
                }
                if let Term::Iri(uri) = triple.object {
                    if !types.contains(&uri) {
                        types.push(uri);
                    }
                }
            }
            Ok(types)
        };

        if self.is_memento() {
            return loader();
        }
        let key = UserTypesKey::new(
            description.id().full_id(),
            self.transaction().session_token(),
        );
        self.factory().user_types().get_or_load(&key, &loader)
    }
}

impl Versionable for FedoraResource {
    fn is_memento(&self) -> bool {
        match self.kind() {
            ResourceKind::TimeMap(_) => false,
            ResourceKind::Tombstone(deleted) => deleted.is_memento(),
            _ => self.id().is_memento(),
        }
    }

    fn memento_datetime(&self) -> Option<Instant> {
        match self.kind() {
            ResourceKind::TimeMap(_) => None,
            ResourceKind::Tombstone(deleted) => deleted.memento_datetime(),
            _ => self.id().memento_instant(),
        }
    }

    fn is_original_resource(&self) -> bool {
        match self.kind() {
            ResourceKind::TimeMap(_) | ResourceKind::Acl => false,
            _ => !self.is_memento(),
        }
    }

    fn original_resource(&self) -> KernelResult<FedoraResource> {
        match self.kind() {
            ResourceKind::TimeMap(original) => Ok((**original).clone()),
            _ if self.is_memento() => self
                .factory()
                .get_resource(self.transaction(), &self.id().resource_id()),
            _ => Ok(self.clone()),
        }
    }

    fn timemap(&self) -> KernelResult<FedoraResource> {
        match self.kind() {
            ResourceKind::TimeMap(_) => Ok(self.clone()),
            ResourceKind::Tombstone(_) => Err(KernelError::Unsupported {
                id: self.id().to_string(),
                operation: "timemap",
            }),
            ResourceKind::Acl => Err(KernelError::Unsupported {
                id: self.id().to_string(),
                operation: "versioning",
            }),
            _ => Ok(FedoraResource::timemap_of(self.original_resource()?)),
        }
    }

    fn memento_datetimes(&self) -> KernelResult<Vec<Instant>> {
        match self.kind() {
            ResourceKind::Tombstone(_) | ResourceKind::Acl => Ok(Vec::new()),
            _ => Ok(self
                .memento_ids()?
                .iter()
                .filter_map(|id| id.memento_instant())
                .collect()),
        }
    }

    fn find_memento_by_datetime(&self, target: Instant) -> KernelResult<Option<FedoraResource>> {
        let timemap = self.timemap()?;
        let mementos = timemap.memento_ids()?;
        let instants: Vec<Instant> = mementos.iter().filter_map(|id| id.memento_instant()).collect();
        let Some(matched) = select_nearest(&instants, target) else {
            return Ok(None);
        };
        debug!(id = %self.id(), %target, %matched, "selected memento");
        let Some(id) = mementos.into_iter().find(|id| id.memento_instant() == Some(matched)) else {
            return Ok(None);
        };
        self.factory().get_resource(self.transaction(), &id).map(Some)
    }
}

impl Containable for FedoraResource {
    fn children(&self) -> KernelResult<Children> {
        if self.is_deleted_object() {
            return Ok(Children::empty());
        }
        let ids = match self.kind() {
            ResourceKind::Container => self
                .factory()
                .containment()
                .get_contains(self.transaction(), self.id())?,
            ResourceKind::TimeMap(_) => self.memento_ids()?,
            ResourceKind::Binary(_)
            | ResourceKind::BinaryDescription
            | ResourceKind::Acl
            | ResourceKind::Tombstone(_) => return Ok(Children::empty()),
        };
        Ok(Children::new(
            ids,
            self.factory().clone(),
            self.transaction().clone(),
        ))
    }

    fn container(&self) -> KernelResult<Option<FedoraResource>> {
        let factory = self.factory();
        let tx = self.transaction();
        match self.kind() {
            ResourceKind::Acl => factory.get_resource(tx, &self.id().as_base_id()).map(Some),
            ResourceKind::BinaryDescription => self.described_resource()?.container(),
            ResourceKind::TimeMap(original) => original.container(),
            ResourceKind::Tombstone(deleted) => {
                match factory
                    .containment()
                    .get_contained_by_deleted(tx, deleted.id())?
                {
                    Some(parent) => factory.get_resource(tx, &parent).map(Some),
                    None => Ok(None),
                }
            }
            ResourceKind::Container | ResourceKind::Binary(_) => {
                if self.is_memento() {
                    return self.original_resource()?.container();
                }
                if self.id().is_root() {
                    return Ok(None);
                }
                let parent = factory
                    .containment()
                    .get_container_id_by_path(tx, self.id(), false)?;
                factory.get_resource(tx, &parent).map(Some)
            }
        }
    }

    fn parent(&self) -> KernelResult<Option<FedoraResource>> {
        if let ResourceKind::TimeMap(original) = self.kind() {
            return Ok(Some((**original).clone()));
        }
        match self.parent_id() {
            Some(parent) => self
                .factory()
                .get_resource(self.transaction(), parent)
                .map(Some),
            None => Ok(None),
        }
    }
}
