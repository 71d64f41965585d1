//! Derivation of LDP membership from lifecycle events.

use std::sync::Arc;

use tracing::{debug, info};

use ldr_membership::MembershipIndex;
use ldr_types::vocab::ldp;
use ldr_types::{Instant, InteractionModel, ResourceId, Transaction, Triple};

use crate::capability::Versionable;
use crate::error::KernelResult;
use crate::factory::ResourceFactory;
use crate::resource::FedoraResource;

/// The membership-producing container flavors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerType {
    Direct,
    Indirect,
}

impl ContainerType {
    fn of(resource: &FedoraResource) -> Option<Self> {
        if !resource.is_container() {
            return None;
        }
        match resource.interaction_model() {
            InteractionModel::DirectContainer => Some(Self::Direct),
            InteractionModel::IndirectContainer => Some(Self::Indirect),
            _ => None,
        }
    }
}

/// Membership properties of one container at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipConfig {
    pub container_type: ContainerType,
    pub membership_resource: String,
    pub has_member_relation: Option<String>,
    pub is_member_of_relation: Option<String>,
    /// Only meaningful for indirect containers.
    pub inserted_content_relation: String,
}

impl MembershipConfig {
    /// Read the membership properties of `container`. `None` when it does
    /// not produce membership.
    pub fn from_resource(container: &FedoraResource) -> KernelResult<Option<Self>> {
        let Some(container_type) = ContainerType::of(container) else {
            return Ok(None);
        };
        let mut config = Self {
            container_type,
            membership_resource: container.id().as_base_id().full_id().to_string(),
            has_member_relation: None,
            is_member_of_relation: None,
            inserted_content_relation: ldp::MEMBER_SUBJECT.to_string(),
        };
        for triple in container.triples()? {
            let Some(object) = triple.object.as_iri() else {
                continue;
            };
            match triple.predicate.as_str() {
                ldp::MEMBERSHIP_RESOURCE => config.membership_resource = object.to_string(),
                ldp::HAS_MEMBER_RELATION => config.has_member_relation = Some(object.to_string()),
                ldp::IS_MEMBER_OF_RELATION => {
                    config.is_member_of_relation = Some(object.to_string())
                }
                ldp::INSERTED_CONTENT_RELATION if container_type == ContainerType::Indirect => {
                    config.inserted_content_relation = object.to_string()
                }
                _ => {}
            }
        }
        if config.has_member_relation.is_none() && config.is_member_of_relation.is_none() {
            config.has_member_relation = Some(ldp::MEMBER.to_string());
        }
        Ok(Some(config))
    }

    fn uses_inserted_content(&self) -> bool {
        self.container_type == ContainerType::Indirect
            && self.inserted_content_relation != ldp::MEMBER_SUBJECT
    }

    /// The membership triple `child` contributes, if any.
    pub fn membership_triple(&self, child: &FedoraResource) -> KernelResult<Option<Triple>> {
        let content = if self.uses_inserted_content() {
            child.description()?.triples()?
        } else {
            Vec::new()
        };
        Ok(self.membership_triple_from(child, &content))
    }

    /// As [`Self::membership_triple`], reading inserted content from
    /// `content` instead of the child's description.
    fn membership_triple_from(&self, child: &FedoraResource, content: &[Triple]) -> Option<Triple> {
        let member = if self.uses_inserted_content() {
            content
                .iter()
                .filter(|triple| triple.predicate == self.inserted_content_relation)
                .find_map(|triple| triple.object.as_iri())?
                .to_string()
        } else {
            child.id().as_base_id().full_id().to_string()
        };

        let triple = match (&self.is_member_of_relation, &self.has_member_relation) {
            (Some(relation), _) => Triple::iri(member, relation, &self.membership_resource),
            (None, Some(relation)) => Triple::iri(&self.membership_resource, relation, member),
            (None, None) => Triple::iri(&self.membership_resource, ldp::MEMBER, member),
        };
        Some(triple)
    }
}

/// One span of a container's property history.
#[derive(Clone, Debug)]
struct TimelineEntry {
    config: Option<MembershipConfig>,
    start: Instant,
    end: Option<Instant>,
}

/// Keeps the membership index in step with resource lifecycle events.
pub struct MembershipService {
    factory: ResourceFactory,
    index: Arc<dyn MembershipIndex>,
    auto_versioning: bool,
}

impl MembershipService {
    pub fn new(factory: ResourceFactory, index: Arc<dyn MembershipIndex>, auto_versioning: bool) -> Self {
        Self {
            factory,
            index,
            auto_versioning,
        }
    }

    /// A container or binary was created under `id`.
    pub fn resource_created(&self, tx: &Transaction, id: &ResourceId) -> KernelResult<()> {
        let resource = self.factory.get_resource(tx, id)?;
        if !(resource.is_container() || resource.is_binary()) {
            return Ok(());
        }
        let Some(parent) = self.membership_parent(tx, &resource)? else {
            return Ok(());
        };
        let Some(config) = MembershipConfig::from_resource(&parent)? else {
            return Ok(());
        };
        if let Some(triple) = config.membership_triple(&resource)? {
            self.index.add_membership(
                tx,
                parent.id(),
                resource.id(),
                triple,
                resource.created_date(),
                None,
            )?;
        }
        Ok(())
    }

    /// The resource at `id` (or the binary a description at `id` describes)
    /// was modified.
    pub fn resource_modified(&self, tx: &Transaction, id: &ResourceId) -> KernelResult<()> {
        let resource = self.factory.get_resource(tx, id)?.described_resource()?;
        if resource.is_tombstone() {
            return Ok(());
        }

        if let Some(config) = MembershipConfig::from_resource(&resource)? {
            if self.auto_versioning {
                let at = resource.last_modified_date();
                self.index.end_membership_for_source(tx, resource.id(), at)?;
                self.add_for_live_children(tx, &resource, &config, at)?;
            } else {
                self.populate_membership_history(tx, resource.id())?;
            }
        }

        if !(resource.is_container() || resource.is_binary()) {
            return Ok(());
        }
        let Some(parent) = self.membership_parent(tx, &resource)? else {
            return Ok(());
        };
        let Some(config) = MembershipConfig::from_resource(&parent)? else {
            return Ok(());
        };
        if config.uses_inserted_content() {
            let at = resource.last_modified_date();
            self.index
                .end_membership_from_child(tx, parent.id(), resource.id(), at)?;
            if let Some(triple) = config.membership_triple(&resource)? {
                self.index
                    .add_membership(tx, parent.id(), resource.id(), triple, at, None)?;
            }
        }
        Ok(())
    }

    /// The resource at `id` was deleted (tombstoned) or purged.
    pub fn resource_deleted(&self, tx: &Transaction, id: &ResourceId) -> KernelResult<()> {
        let resource = match self.factory.get_resource(tx, id) {
            Ok(resource) => resource.into_deleted_object(),
            Err(e) if e.is_not_found() => {
                debug!(tx = %tx.id(), id = %id, "purged resource, dropping membership references");
                self.index.delete_membership_references(tx, &id.as_base_id())?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let at = resource.last_modified_date();

        if ContainerType::of(&resource).is_some() {
            self.index.end_membership_for_source(tx, resource.id(), at)?;
        }
        if let Some(parent) = self.membership_parent(tx, &resource)? {
            let parent = parent.into_deleted_object();
            if ContainerType::of(&parent).is_some() {
                self.index
                    .end_membership_from_child(tx, parent.id(), resource.id(), at)?;
            }
        }
        Ok(())
    }

    /// Membership triples about `id`. A description id is answered for
    /// the described resource, a memento id as of its instant.
    pub fn get_membership(&self, tx: &Transaction, id: &ResourceId) -> KernelResult<Vec<Triple>> {
        let subject = if id.is_description() { id.as_described() } else { id.clone() };
        Ok(self.index.get_membership(tx, &subject)?)
    }

    pub fn get_last_updated_timestamp(
        &self,
        tx: &Transaction,
        id: &ResourceId,
    ) -> KernelResult<Option<Instant>> {
        Ok(self.index.get_last_updated(tx, &id.as_base_id())?)
    }

    /// Rebuild the whole membership history of one container from its
    /// mementos and current state. Running it twice yields the same
    /// entries. Deleted proxies contribute the inserted content they held
    /// when they were deleted.
    pub fn populate_membership_history(
        &self,
        tx: &Transaction,
        container_id: &ResourceId,
    ) -> KernelResult<()> {
        let container_id = container_id.as_base_id();
        self.index.delete_membership_for_source(tx, &container_id)?;

        let container = self.factory.get_resource(tx, &container_id)?;
        if container.is_tombstone() {
            return Ok(());
        }
        let timeline = self.property_timeline(&container)?;
        if timeline.iter().all(|span| span.config.is_none()) {
            return Ok(());
        }

        let containment = self.factory.containment();
        let mut child_ids = containment.get_contains(tx, &container_id)?;
        for deleted in containment.get_contains_deleted(tx, &container_id)? {
            if !child_ids.contains(&deleted) {
                child_ids.push(deleted);
            }
        }

        let mut added = 0usize;
        for child_id in child_ids {
            let child = match self.factory.get_resource(tx, &child_id) {
                Ok(child) => child,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            let child_end = child.is_tombstone().then(|| child.last_modified_date());
            let child = child.into_deleted_object();
            if !(child.is_container() || child.is_binary()) {
                continue;
            }
            let retained = match child_end {
                Some(_) => Some(self.retained_content(tx, &child)?),
                None => None,
            };
            for span in &timeline {
                let Some(config) = &span.config else {
                    continue;
                };
                let start = span.start.max(child.created_date());
                let end = match (span.end, child_end) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                };
                if end.is_some_and(|end| end <= start) {
                    continue;
                }
                let triple = match &retained {
                    Some(content) => config.membership_triple_from(&child, content),
                    None => config.membership_triple(&child)?,
                };
                if let Some(triple) = triple {
                    self.index
                        .add_membership(tx, &container_id, child.id(), triple, start, end)?;
                    added += 1;
                }
            }
        }
        info!(tx = %tx.id(), container = %container_id, spans = timeline.len(), entries = added, "rebuilt membership history");
        Ok(())
    }

    /// Stored triples of a deleted resource's description. Deletion keeps
    /// them in storage even though the tombstone exposes none.
    fn retained_content(&self, tx: &Transaction, deleted: &FedoraResource) -> KernelResult<Vec<Triple>> {
        let description = if deleted.is_binary() {
            deleted.id().as_description()
        } else {
            deleted.id().clone()
        };
        match self.factory.storage().get_triples(tx, &description, None) {
            Ok(triples) => Ok(triples),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Truncate the membership index. Refused while any transaction has
    /// pending edits.
    pub fn reset(&self) -> KernelResult<()> {
        self.index.reset()?;
        Ok(())
    }

    fn add_for_live_children(
        &self,
        tx: &Transaction,
        container: &FedoraResource,
        config: &MembershipConfig,
        at: Instant,
    ) -> KernelResult<()> {
        for child_id in self.factory.containment().get_contains(tx, container.id())? {
            let child = self.factory.get_resource(tx, &child_id)?;
            if !(child.is_container() || child.is_binary()) {
                continue;
            }
            if let Some(triple) = config.membership_triple(&child)? {
                self.index
                    .add_membership(tx, container.id(), child.id(), triple, at, None)?;
            }
        }
        Ok(())
    }

    fn membership_parent(
        &self,
        tx: &Transaction,
        resource: &FedoraResource,
    ) -> KernelResult<Option<FedoraResource>> {
        let Some(parent_id) = resource.parent_id() else {
            return Ok(None);
        };
        match self.factory.get_resource(tx, parent_id) {
            Ok(parent) => Ok(Some(parent)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Membership configuration over time: one span per memento, plus the
    /// head when versions are not taken on every write. Adjacent spans with
    /// the same configuration are merged; the first span starts at
    /// creation.
    fn property_timeline(&self, container: &FedoraResource) -> KernelResult<Vec<TimelineEntry>> {
        let tx = container.transaction();
        let mut states: Vec<(Instant, Option<MembershipConfig>)> = Vec::new();
        for at in container.memento_datetimes()? {
            let memento = self.factory.get_resource(tx, &container.id().as_memento(at))?;
            states.push((at, MembershipConfig::from_resource(&memento)?));
        }
        if !self.auto_versioning || states.is_empty() {
            let head_start = states
                .last()
                .map_or(container.last_modified_date(), |(last, _)| {
                    container.last_modified_date().max(*last)
                });
            states.push((head_start, MembershipConfig::from_resource(container)?));
        }

        let mut timeline: Vec<TimelineEntry> = Vec::new();
        for (at, config) in states {
            match timeline.last_mut() {
                Some(previous) if previous.config == config => continue,
                Some(previous) => {
                    previous.end = Some(at);
                }
                None => {}
            }
            let start = if timeline.is_empty() { container.created_date().min(at) } else { at };
            timeline.push(TimelineEntry { config, start, end: None });
        }
        Ok(timeline)
    }
}
