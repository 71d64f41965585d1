use std::sync::Arc;

use tracing::debug;

use ldr_index::ContainmentIndex;
use ldr_store::{PersistentStorageSession, ResourceHeaders};
use ldr_types::{InteractionModel, ResourceId, Transaction};

use crate::cache::UserTypesCache;
use crate::capability::{Containable, Versionable};
use crate::error::{KernelError, KernelResult};
use crate::resource::{Children, FedoraResource, ResourceInfo, ResourceKind};

/// Builds the variant payload from stored headers.
pub type VariantConstructor = fn(&ResourceHeaders) -> ResourceKind;

fn container(_: &ResourceHeaders) -> ResourceKind {
    ResourceKind::Container
}

fn binary(headers: &ResourceHeaders) -> ResourceKind {
    ResourceKind::Binary(headers.binary.clone().unwrap_or_default())
}

fn binary_description(_: &ResourceHeaders) -> ResourceKind {
    ResourceKind::BinaryDescription
}

fn acl(_: &ResourceHeaders) -> ResourceKind {
    ResourceKind::Acl
}

/// The variant registry: exactly one constructor per interaction model.
pub fn variant_constructor(model: InteractionModel) -> VariantConstructor {
    match model {
        InteractionModel::BasicContainer
        | InteractionModel::DirectContainer
        | InteractionModel::IndirectContainer => container,
        InteractionModel::NonRdfSource => binary,
        InteractionModel::NonRdfSourceDescription => binary_description,
        InteractionModel::Acl => acl,
    }
}

struct FactoryInner {
    storage: Arc<dyn PersistentStorageSession>,
    containment: Arc<dyn ContainmentIndex>,
    user_types: Arc<dyn UserTypesCache>,
}

/// The single dispatch point from (transaction, id) to a resource.
///
/// Cloning is cheap; every resource it builds carries a clone so it can
/// navigate to related resources.
#[derive(Clone)]
pub struct ResourceFactory {
    inner: Arc<FactoryInner>,
}

impl ResourceFactory {
    pub fn new(
        storage: Arc<dyn PersistentStorageSession>,
        containment: Arc<dyn ContainmentIndex>,
        user_types: Arc<dyn UserTypesCache>,
    ) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                storage,
                containment,
                user_types,
            }),
        }
    }

    pub fn storage(&self) -> &dyn PersistentStorageSession {
        self.inner.storage.as_ref()
    }

    pub fn containment(&self) -> &dyn ContainmentIndex {
        self.inner.containment.as_ref()
    }

    pub fn user_types(&self) -> &dyn UserTypesCache {
        self.inner.user_types.as_ref()
    }

    /// Resolve `id` to exactly one variant.
    ///
    /// A TimeMap id yields the TimeMap of its base resource. Deleted
    /// headers yield a tombstone. Fails with `PathNotFound` when no record
    /// exists and with `ResourceType` when the stored interaction model is
    /// unknown.
    pub fn get_resource(&self, tx: &Transaction, id: &ResourceId) -> KernelResult<FedoraResource> {
        if id.is_timemap() {
            let original = self.get_resource(tx, &id.resource_id())?;
            if original.is_tombstone() {
                return Ok(original);
            }
            debug!(id = %id, tx = %tx.id(), "resolved timemap");
            return Ok(FedoraResource::timemap_of(original));
        }
        let headers = self.storage().get_headers(tx, id, id.memento_instant())?;
        self.resource_from_headers(tx, id, &headers)
    }

    /// Parse `raw` and resolve it.
    pub fn get_resource_by_path(&self, tx: &Transaction, raw: &str) -> KernelResult<FedoraResource> {
        let id = ResourceId::parse(raw)?;
        self.get_resource(tx, &id)
    }

    /// Build the variant `headers` describe, exposed under `id`.
    pub fn resource_from_headers(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        headers: &ResourceHeaders,
    ) -> KernelResult<FedoraResource> {
        let model = headers.model().ok_or_else(|| KernelError::ResourceType {
            id: id.to_string(),
            model: headers.interaction_model.clone(),
        })?;
        let kind = variant_constructor(model)(headers);
        debug!(id = %id, tx = %tx.id(), variant = kind.name(), deleted = headers.deleted, "resolved resource");

        let resource = FedoraResource::new(
            id.clone(),
            kind,
            ResourceInfo::from_headers(headers, model),
            tx.clone(),
            self.clone(),
        );
        if headers.deleted {
            return Ok(resource.into_tombstone());
        }
        Ok(resource)
    }

    /// Lazy children of the resource at `id`.
    pub fn get_children(&self, tx: &Transaction, id: &ResourceId) -> KernelResult<Children> {
        self.get_resource(tx, id)?.children()
    }

    /// Whether `id` is a ghost node: no resource of its own, live or
    /// deleted, but something tracked below it.
    pub fn is_ghost_node(&self, tx: &Transaction, id: &ResourceId) -> KernelResult<bool> {
        if self.containment().resource_exists(tx, id, true)? {
            return Ok(false);
        }
        if self.storage().exists(tx, &id.resource_id())? {
            return Ok(false);
        }
        Ok(self.containment().has_resources_starting_with(tx, id)?)
    }

    /// The string the storage layer addresses `resource` by: the TimeMap
    /// path for a TimeMap, the memento path for a memento, the plain id
    /// otherwise.
    pub fn resolve_for_storage(resource: &FedoraResource) -> String {
        match resource.kind() {
            ResourceKind::TimeMap(original) => {
                original.id().resource_id().as_timemap().full_id().to_string()
            }
            ResourceKind::Tombstone(deleted) => Self::resolve_for_storage(deleted),
            _ => match resource.memento_datetime() {
                Some(at) => resource.id().resource_id().as_memento(at).full_id().to_string(),
                None => resource.id().full_id().to_string(),
            },
        }
    }
}
