use std::sync::Arc;

use tracing::{debug, info};

use ldr_index::{ContainmentIndex, InMemoryContainmentIndex};
use ldr_kernel::{
    FedoraResource, InMemoryUserTypesCache, KernelConfig, MembershipService, ResourceFactory,
    TransactionManager, UserTypesKey,
};
use ldr_membership::{InMemoryMembershipIndex, MembershipIndexWriter};
use ldr_store::{
    BinaryHeaders, InMemoryStorage, PersistentStorageSession, ResourceHeaders, StorageWriter,
};
use ldr_types::temporal::{self, Instant};
use ldr_types::{InteractionModel, ResourceId, Transaction, Triple};

use crate::error::{SdkError, SdkResult};
use crate::request::{BinaryRequest, ContainerRequest};

/// High-level repository API over in-memory backends.
///
/// Every operation runs inside a caller-supplied transaction; nothing is
/// visible to other transactions until [`Repository::commit`].
pub struct Repository {
    config: KernelConfig,
    storage: Arc<InMemoryStorage>,
    containment: Arc<InMemoryContainmentIndex>,
    membership_index: Arc<InMemoryMembershipIndex>,
    factory: ResourceFactory,
    membership: MembershipService,
    transactions: TransactionManager,
}

impl Repository {
    /// Build a repository and seed its root container.
    pub fn new(config: KernelConfig) -> SdkResult<Self> {
        let user_types = Arc::new(InMemoryUserTypesCache::new(config.user_types_cache_capacity));
        let mut transactions = TransactionManager::new(user_types.clone());

        // Readers must never see one backend's commit without the others'.
        let gate = transactions.gate().clone();
        let storage = Arc::new(InMemoryStorage::with_gate(gate.clone()));
        let containment = Arc::new(InMemoryContainmentIndex::with_gate(gate.clone()));
        let membership_index = Arc::new(InMemoryMembershipIndex::with_gate(gate));

        let factory = ResourceFactory::new(storage.clone(), containment.clone(), user_types);
        let membership =
            MembershipService::new(factory.clone(), membership_index.clone(), config.auto_versioning);

        transactions.register(storage.clone());
        transactions.register(containment.clone());
        transactions.register(membership_index.clone());

        let repo = Self {
            config,
            storage,
            containment,
            membership_index,
            factory,
            membership,
            transactions,
        };
        repo.seed_root()?;
        Ok(repo)
    }

    /// A repository with the default configuration.
    pub fn in_memory() -> SdkResult<Self> {
        Self::new(KernelConfig::default())
    }

    fn seed_root(&self) -> SdkResult<()> {
        let tx = self.begin()?;
        let headers =
            ResourceHeaders::new(ResourceId::root(), InteractionModel::BasicContainer, temporal::now());
        self.write(&tx, headers, Vec::new())?;
        self.commit(&tx)?;
        info!("seeded repository root");
        Ok(())
    }

    // ---- Transactions ----

    pub fn begin(&self) -> SdkResult<Transaction> {
        Ok(self.transactions.begin()?)
    }

    pub fn begin_read_only(&self) -> SdkResult<Transaction> {
        Ok(self.transactions.begin_read_only()?)
    }

    pub fn commit(&self, tx: &Transaction) -> SdkResult<()> {
        Ok(self.transactions.commit(tx)?)
    }

    pub fn rollback(&self, tx: &Transaction) -> SdkResult<()> {
        Ok(self.transactions.rollback(tx)?)
    }

    // ---- Lifecycle operations ----

    /// Create a container below a live parent.
    ///
    /// Storage, containment and membership are staged one after another.
    /// When a later step fails the earlier ones stay staged; roll the
    /// transaction back.
    pub fn create_container(
        &self,
        tx: &Transaction,
        request: &ContainerRequest,
    ) -> SdkResult<FedoraResource> {
        if !request.model.is_container() {
            return Err(SdkError::InvalidOperation(format!(
                "{} is not a container model",
                request.model
            )));
        }
        tx.ensure_writable()?;
        let id = &request.id;
        let parent = self.creatable_parent(tx, id)?;
        let at = temporal::now();

        let mut headers = ResourceHeaders::new(id.clone(), request.model, at).with_parent(parent.clone());
        headers.created_by = request.created_by.clone();
        headers.last_modified_by = request.created_by.clone();
        headers.archival_group = request.archival_group;
        self.write(tx, headers, request.triples.clone())?;
        self.containment.add_contained_by(tx, &parent, id, Some(at), None)?;
        self.membership.resource_created(tx, id)?;
        self.auto_version(tx, id, at)?;

        info!(tx = %tx.id(), id = %id, model = %request.model, "created container");
        Ok(self.factory.get_resource(tx, id)?)
    }

    /// Create a binary and its description. The description holds the
    /// request's triples; the binary records the content size and digest.
    /// A failure part way through leaves the earlier writes staged; roll the
    /// transaction back.
    pub fn create_binary(&self, tx: &Transaction, request: &BinaryRequest) -> SdkResult<FedoraResource> {
        tx.ensure_writable()?;
        let id = &request.id;
        let parent = self.creatable_parent(tx, id)?;
        let at = temporal::now();

        let binary = BinaryHeaders {
            content_size: request.content.len() as u64,
            digests: vec![request.digest()],
            filename: request.filename.clone(),
            mime_type: request.mime_type.clone(),
            ..Default::default()
        };
        let mut headers = ResourceHeaders::new(id.clone(), InteractionModel::NonRdfSource, at)
            .with_parent(parent.clone())
            .with_binary(binary);
        headers.created_by = request.created_by.clone();
        headers.last_modified_by = request.created_by.clone();
        self.write(tx, headers, Vec::new())?;

        let description_id = id.as_description();
        let mut description = ResourceHeaders::new(
            description_id.clone(),
            InteractionModel::NonRdfSourceDescription,
            at,
        )
        .with_parent(id.clone());
        description.created_by = request.created_by.clone();
        self.write(tx, description, request.triples.clone())?;

        self.containment.add_contained_by(tx, &parent, id, Some(at), None)?;
        self.membership.resource_created(tx, id)?;
        self.auto_version(tx, id, at)?;
        self.auto_version(tx, &description_id, at)?;

        info!(tx = %tx.id(), id = %id, size = request.content.len(), "created binary");
        Ok(self.factory.get_resource(tx, id)?)
    }

    /// Create the ACL of a live resource.
    pub fn create_acl(
        &self,
        tx: &Transaction,
        target: &ResourceId,
        triples: Vec<Triple>,
    ) -> SdkResult<FedoraResource> {
        tx.ensure_writable()?;
        let protected = self.live_resource(tx, &target.as_base_id())?;
        let acl_id = protected.id().as_acl();
        match self.factory.get_resource(tx, &acl_id) {
            Ok(existing) if !existing.is_tombstone() => {
                return Err(SdkError::AlreadyExists(acl_id.to_string()))
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let headers = ResourceHeaders::new(acl_id.clone(), InteractionModel::Acl, temporal::now())
            .with_parent(protected.id().clone());
        self.write(tx, headers, triples)?;
        info!(tx = %tx.id(), id = %acl_id, "created acl");
        Ok(self.factory.get_resource(tx, &acl_id)?)
    }

    /// Replace the user triples of a resource. A binary's triples live in
    /// its description.
    pub fn replace_properties(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        triples: Vec<Triple>,
    ) -> SdkResult<FedoraResource> {
        tx.ensure_writable()?;
        let resource = self.live_resource(tx, id)?;
        let target = resource.description()?.id().clone();
        let at = temporal::now();

        let mut headers = self.storage.get_headers(tx, &target, None)?;
        headers.touch(at, None);
        self.write(tx, headers, triples)?;
        if resource.is_binary() {
            let mut binary = self.storage.get_headers(tx, resource.id(), None)?;
            let binary_triples = self.storage.get_triples(tx, resource.id(), None)?;
            binary.touch(at, None);
            self.write(tx, binary, binary_triples)?;
        }
        self.membership.resource_modified(tx, &target)?;
        self.auto_version(tx, &target, at)?;
        if resource.is_binary() {
            self.auto_version(tx, resource.id(), at)?;
        }

        info!(tx = %tx.id(), id = %id, "replaced properties");
        Ok(self.factory.get_resource(tx, id)?)
    }

    /// Delete a resource and everything below it. Each deleted resource is
    /// left behind as a tombstone, together with its description and ACL.
    ///
    /// Descendants are tombstoned one at a time. When a later one fails the
    /// earlier tombstones stay staged; roll the transaction back.
    pub fn delete(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<()> {
        tx.ensure_writable()?;
        if id.is_root() {
            return Err(SdkError::InvalidOperation("the root can not be deleted".into()));
        }
        let resource = self.live_resource(tx, id)?;
        let at = temporal::now();
        if resource.is_acl() {
            self.mark_deleted(tx, resource.id(), at)?;
        } else {
            self.delete_tree(tx, resource.id(), at)?;
        }
        info!(tx = %tx.id(), id = %id, "deleted resource");
        Ok(())
    }

    fn delete_tree(&self, tx: &Transaction, id: &ResourceId, at: Instant) -> SdkResult<()> {
        for child in self.containment.get_contains(tx, id)? {
            self.delete_tree(tx, &child, at)?;
        }
        let resource = self.factory.get_resource(tx, id)?;
        if resource.is_tombstone() {
            return Ok(());
        }
        self.mark_deleted(tx, id, at)?;
        if resource.is_binary() {
            self.mark_deleted_if_live(tx, &id.as_description(), at)?;
        }
        self.mark_deleted_if_live(tx, &id.as_acl(), at)?;
        self.containment.remove_resource(tx, id)?;
        self.membership.resource_deleted(tx, id)?;
        debug!(tx = %tx.id(), id = %id, "tombstoned");
        Ok(())
    }

    fn mark_deleted(&self, tx: &Transaction, id: &ResourceId, at: Instant) -> SdkResult<()> {
        let mut headers = self.storage.get_headers(tx, id, None)?;
        let triples = self.storage.get_triples(tx, id, None)?;
        headers.deleted = true;
        headers.touch(at, None);
        self.write(tx, headers, triples)?;
        Ok(())
    }

    fn mark_deleted_if_live(&self, tx: &Transaction, id: &ResourceId, at: Instant) -> SdkResult<()> {
        match self.storage.get_headers(tx, id, None) {
            Ok(headers) if !headers.deleted => self.mark_deleted(tx, id, at),
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every trace of a deleted resource and its deleted
    /// descendants. A failure part way through leaves the earlier purges
    /// staged; roll the transaction back.
    pub fn purge(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<()> {
        tx.ensure_writable()?;
        let resource = self.factory.get_resource(tx, id)?;
        if !resource.is_tombstone() {
            return Err(SdkError::InvalidOperation(format!(
                "{id} is not deleted and can not be purged"
            )));
        }
        self.purge_tree(tx, &id.as_base_id())?;
        info!(tx = %tx.id(), id = %id, "purged resource");
        Ok(())
    }

    fn purge_tree(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<()> {
        for child in self.containment.get_contains_deleted(tx, id)? {
            self.purge_tree(tx, &child)?;
        }
        for related in [id.as_description(), id.as_acl()] {
            if self.storage.exists(tx, &related)? {
                self.storage.purge(tx, &related)?;
                self.forget_user_types(tx, &related)?;
            }
        }
        self.storage.purge(tx, id)?;
        self.forget_user_types(tx, id)?;
        self.containment.purge_resource(tx, id)?;
        self.membership.resource_deleted(tx, id)?;
        debug!(tx = %tx.id(), id = %id, "purged");
        Ok(())
    }

    /// Record a version of a resource at `at` (default: now). A binary is
    /// versioned together with its description. Returns the memento.
    pub fn create_version(
        &self,
        tx: &Transaction,
        id: &ResourceId,
        at: Option<Instant>,
    ) -> SdkResult<FedoraResource> {
        tx.ensure_writable()?;
        let resource = self.live_resource(tx, id)?.described_resource()?;
        if resource.is_acl() {
            return Err(SdkError::InvalidOperation(format!("{id} can not be versioned")));
        }
        let at = temporal::truncate_to_second(at.unwrap_or_else(temporal::now));
        self.storage.create_version(tx, resource.id(), at)?;
        if resource.is_binary() {
            self.storage.create_version(tx, &resource.id().as_description(), at)?;
        }
        info!(tx = %tx.id(), id = %resource.id(), version = %temporal::format_memento_label(&at), "created version");
        Ok(self.factory.get_resource(tx, &resource.id().as_memento(at))?)
    }

    // ---- Reads ----

    pub fn get_resource(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<FedoraResource> {
        Ok(self.factory.get_resource(tx, id)?)
    }

    pub fn get_resource_by_path(&self, tx: &Transaction, path: &str) -> SdkResult<FedoraResource> {
        Ok(self.factory.get_resource_by_path(tx, path)?)
    }

    pub fn children(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<Vec<FedoraResource>> {
        let children = self.factory.get_children(tx, id)?;
        Ok(children.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn membership(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<Vec<Triple>> {
        Ok(self.membership.get_membership(tx, id)?)
    }

    pub fn rebuild_membership(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<()> {
        tx.ensure_writable()?;
        Ok(self.membership.populate_membership_history(tx, id)?)
    }

    pub fn is_ghost_node(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<bool> {
        Ok(self.factory.is_ghost_node(tx, id)?)
    }

    /// Latest of the resource's own modification, its containment changes,
    /// and its membership changes.
    pub fn last_modified(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<Instant> {
        let resource = self.factory.get_resource(tx, id)?;
        let mut latest = resource.last_modified_date();
        if let Some(at) = self.containment.containment_last_updated(tx, id)? {
            latest = latest.max(at);
        }
        if let Some(at) = self.membership.get_last_updated_timestamp(tx, id)? {
            latest = latest.max(at);
        }
        Ok(latest)
    }

    /// Weak entity tag over the state token and [`Repository::last_modified`].
    pub fn etag(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<String> {
        let resource = self.factory.get_resource(tx, id)?;
        let last_modified = self.last_modified(tx, id)?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(resource.state_token().as_bytes());
        hasher.update(last_modified.to_rfc3339().as_bytes());
        Ok(format!("W/\"{}\"", hex::encode(hasher.finalize().as_bytes())))
    }

    /// Truncate both derived indexes. Refused while any transaction has
    /// pending index edits.
    pub fn reset_indexes(&self) -> SdkResult<()> {
        self.containment.reset()?;
        self.membership_index.reset()?;
        info!("derived indexes reset");
        Ok(())
    }

    // ---- Accessors ----

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn factory(&self) -> &ResourceFactory {
        &self.factory
    }

    pub fn membership_service(&self) -> &MembershipService {
        &self.membership
    }

    pub fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    // ---- Helpers ----

    /// Check that `id` may be created and return its parent.
    /// Stage a record and drop the session's cached user types for it.
    fn write(&self, tx: &Transaction, headers: ResourceHeaders, triples: Vec<Triple>) -> SdkResult<()> {
        let id = headers.id.clone();
        self.storage.write(tx, headers, triples)?;
        self.forget_user_types(tx, &id)
    }

    fn forget_user_types(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<()> {
        let key = UserTypesKey::new(id.full_id(), tx.session_token());
        self.factory.user_types().invalidate(&key)?;
        Ok(())
    }

    fn creatable_parent(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<ResourceId> {
        if id.is_root() || id.is_description() || id.is_acl() || id.is_timemap() || id.is_memento() {
            return Err(SdkError::InvalidOperation(format!("{id} can not be created directly")));
        }
        match self.factory.get_resource(tx, id) {
            Ok(existing) if existing.is_tombstone() => return Err(SdkError::Gone(id.to_string())),
            Ok(_) => return Err(SdkError::AlreadyExists(id.to_string())),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let parent = id
            .parent()
            .ok_or_else(|| SdkError::InvalidOperation(format!("{id} has no parent")))?;
        match self.factory.get_resource(tx, &parent) {
            Ok(p) if p.is_tombstone() => Err(SdkError::ParentNotFound(parent.to_string())),
            Ok(p) if p.is_container() => Ok(parent),
            Ok(_) => Err(SdkError::InvalidOperation(format!("{parent} is not a container"))),
            Err(e) if e.is_not_found() => Err(SdkError::ParentNotFound(parent.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn live_resource(&self, tx: &Transaction, id: &ResourceId) -> SdkResult<FedoraResource> {
        if id.is_timemap() || id.is_memento() {
            return Err(SdkError::InvalidOperation(format!("{id} is a version and is read-only")));
        }
        let resource = self.factory.get_resource(tx, id)?;
        if resource.is_tombstone() {
            return Err(SdkError::Gone(id.to_string()));
        }
        Ok(resource)
    }

    fn auto_version(&self, tx: &Transaction, id: &ResourceId, at: Instant) -> SdkResult<()> {
        if self.config.auto_versioning {
            self.storage.create_version(tx, id, at)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use ldr_kernel::{Containable, KernelError, Typed, Versionable};
    use ldr_types::vocab::{ldp, rdf, repository};
    use ldr_types::{Term, TransactionError};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn id(raw: &str) -> ResourceId {
        ResourceId::parse(raw).unwrap()
    }

    fn repo() -> Repository {
        Repository::in_memory().unwrap()
    }

    fn t1() -> Instant {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    // ---- Test 1: bootstrap ----

    #[test]
    fn new_repository_has_a_root() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        let root = repo.get_resource(&tx, &ResourceId::root()).unwrap();
        assert!(root.is_container());
        assert!(root.system_types(true).iter().any(|t| t == repository::REPOSITORY_ROOT));
        assert!(repo.children(&tx, &ResourceId::root()).unwrap().is_empty());
        assert!(!repo.config().auto_versioning);
    }

    // ---- Test 2: membership end to end ----

    #[test]
    fn direct_container_membership_follows_create_and_delete() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::direct(id("/a"), "/a", ldp::MEMBER))
            .unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/a/b1")))
            .unwrap();

        let expected = Triple::iri("/a", ldp::MEMBER, "/a/b1");
        assert!(repo.membership(&tx, &id("/a")).unwrap().contains(&expected));

        repo.delete(&tx, &id("/a/b1")).unwrap();
        assert!(!repo.membership(&tx, &id("/a")).unwrap().contains(&expected));
        let gone = repo.get_resource(&tx, &id("/a/b1")).unwrap();
        assert!(gone.is_tombstone());
        assert_eq!(gone.deleted_object().unwrap().id(), &id("/a/b1"));
        repo.commit(&tx).unwrap();
    }

    #[test]
    fn membership_ends_when_a_committed_child_is_deleted() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::direct(id("/a"), "/a", ldp::MEMBER))
            .unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/a/b1")))
            .unwrap();
        repo.create_binary(&tx, &BinaryRequest::new(id("/a/b2"), b"x".to_vec()))
            .unwrap();
        repo.commit(&tx).unwrap();

        let tx = repo.begin().unwrap();
        assert_eq!(repo.membership(&tx, &id("/a")).unwrap().len(), 2);
        repo.delete(&tx, &id("/a/b1")).unwrap();
        repo.commit(&tx).unwrap();

        let reader = repo.begin_read_only().unwrap();
        assert_eq!(
            repo.membership(&reader, &id("/a")).unwrap(),
            vec![Triple::iri("/a", ldp::MEMBER, "/a/b2")]
        );
    }

    // ---- Test 3: versions end to end ----

    #[test]
    fn memento_lookup_by_datetime() {
        let repo = repo();
        let t2 = t1() + Duration::hours(1);
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/x")))
            .unwrap();
        repo.create_version(&tx, &id("/x"), Some(t1())).unwrap();
        repo.replace_properties(
            &tx,
            &id("/x"),
            vec![Triple::new("/x", "http://purl.org/dc/terms/title", Term::literal("second"))],
        )
        .unwrap();
        repo.create_version(&tx, &id("/x"), Some(t2)).unwrap();
        repo.commit(&tx).unwrap();

        let tx = repo.begin_read_only().unwrap();
        let memento = repo
            .get_resource_by_path(&tx, "/x/fcr:versions/20200101000000")
            .unwrap();
        assert!(memento.is_memento());
        assert!(!memento.is_original_resource());
        assert_eq!(memento.memento_datetime(), Some(t1()));
        assert!(memento.triples().unwrap().is_empty());

        let head = repo.get_resource(&tx, &id("/x")).unwrap();
        assert!(head.is_original_resource());
        let found = head
            .find_memento_by_datetime(t1() + Duration::seconds(30))
            .unwrap()
            .unwrap();
        assert_eq!(found.id(), memento.id());
        let before = head.find_memento_by_datetime(t1() - Duration::days(1)).unwrap().unwrap();
        assert_eq!(before.memento_datetime(), Some(t1()));
        let after = head.find_memento_by_datetime(t2 + Duration::days(1)).unwrap().unwrap();
        assert_eq!(after.memento_datetime(), Some(t2));

        let timemap = head.timemap().unwrap();
        assert_eq!(timemap.children().unwrap().len(), 2);
        assert_eq!(head.memento_datetimes().unwrap(), vec![t1(), t2]);
    }

    #[test]
    fn binary_versions_include_the_description() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_binary(
            &tx,
            &BinaryRequest::new(id("/b"), b"data".to_vec()).with_type("http://example.org/Image"),
        )
        .unwrap();
        let memento = repo.create_version(&tx, &id("/b/fcr:metadata"), Some(t1())).unwrap();
        assert!(memento.is_binary());
        assert!(memento.is_memento());

        let description = memento.description().unwrap();
        assert!(description.is_memento());
        assert_eq!(
            memento.user_types().unwrap(),
            vec!["http://example.org/Image".to_string()]
        );
    }

    #[test]
    fn auto_versioning_records_a_version_per_write() {
        let repo = Repository::new(KernelConfig::auto_versioning()).unwrap();
        let tx = repo.begin().unwrap();
        let created = repo
            .create_container(&tx, &ContainerRequest::basic(id("/v")))
            .unwrap();
        assert_eq!(created.memento_datetimes().unwrap().len(), 1);
    }

    // ---- Test 4: creation rules ----

    #[test]
    fn creation_conflicts_are_reported() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/a")))
            .unwrap();

        let err = repo
            .create_container(&tx, &ContainerRequest::basic(id("/a")))
            .unwrap_err();
        assert!(matches!(err, SdkError::AlreadyExists(_)));

        let err = repo
            .create_container(&tx, &ContainerRequest::basic(id("/missing/child")))
            .unwrap_err();
        assert!(matches!(err, SdkError::ParentNotFound(_)));

        let err = repo
            .create_container(&tx, &ContainerRequest::basic(id("/a/fcr:metadata")))
            .unwrap_err();
        assert!(matches!(err, SdkError::InvalidOperation(_)));

        repo.delete(&tx, &id("/a")).unwrap();
        let err = repo
            .create_container(&tx, &ContainerRequest::basic(id("/a")))
            .unwrap_err();
        assert!(matches!(err, SdkError::Gone(_)));
    }

    #[test]
    fn binaries_carry_digest_and_description() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        let request = BinaryRequest::new(id("/file"), b"hello".to_vec())
            .with_mime_type("text/plain")
            .with_filename("hello.txt")
            .with_type("http://example.org/Document");
        let binary = repo.create_binary(&tx, &request).unwrap();

        let headers = binary.binary().unwrap();
        assert_eq!(headers.content_size, 5);
        assert_eq!(headers.digests, vec![request.digest()]);
        assert_eq!(headers.filename.as_deref(), Some("hello.txt"));
        assert!(binary.has_type("http://example.org/Document").unwrap());

        let description = repo.get_resource(&tx, &id("/file/fcr:metadata")).unwrap();
        assert!(description.is_description());
        assert_eq!(description.described_resource().unwrap().id(), binary.id());
    }

    // ---- Test 5: delete and purge ----

    #[test]
    fn delete_is_recursive() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/p"))).unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/p/c"))).unwrap();
        repo.create_binary(&tx, &BinaryRequest::new(id("/p/c/f"), b"x".to_vec()))
            .unwrap();
        repo.create_acl(&tx, &id("/p/c"), vec![]).unwrap();
        repo.commit(&tx).unwrap();

        let tx = repo.begin().unwrap();
        repo.delete(&tx, &id("/p")).unwrap();
        for raw in ["/p", "/p/c", "/p/c/f", "/p/c/f/fcr:metadata", "/p/c/fcr:acl"] {
            assert!(repo.get_resource(&tx, &id(raw)).unwrap().is_tombstone(), "{raw}");
        }
        assert!(repo.children(&tx, &ResourceId::root()).unwrap().is_empty());

        let tombstone = repo.get_resource(&tx, &id("/p/c")).unwrap();
        assert_eq!(tombstone.container().unwrap().unwrap().id(), &id("/p"));
    }

    #[test]
    fn purge_requires_a_tombstone_and_removes_everything() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/p"))).unwrap();
        repo.create_binary(&tx, &BinaryRequest::new(id("/p/f"), b"x".to_vec()))
            .unwrap();

        let err = repo.purge(&tx, &id("/p")).unwrap_err();
        assert!(matches!(err, SdkError::InvalidOperation(_)));
        repo.commit(&tx).unwrap();

        let tx = repo.begin().unwrap();
        repo.delete(&tx, &id("/p")).unwrap();
        repo.purge(&tx, &id("/p")).unwrap();
        repo.commit(&tx).unwrap();

        let tx = repo.begin().unwrap();
        for raw in ["/p", "/p/f", "/p/f/fcr:metadata"] {
            assert!(repo.get_resource(&tx, &id(raw)).unwrap_err().is_not_found(), "{raw}");
        }
        repo.create_container(&tx, &ContainerRequest::basic(id("/p"))).unwrap();
    }

    // ---- Test 6: transactions ----

    #[test]
    fn uncommitted_resources_are_private() {
        let repo = repo();
        let a = repo.begin().unwrap();
        let b = repo.begin().unwrap();
        repo.create_container(&a, &ContainerRequest::basic(id("/private"))).unwrap();

        assert!(repo.get_resource(&b, &id("/private")).unwrap_err().is_not_found());
        assert!(repo.children(&b, &ResourceId::root()).unwrap().is_empty());
        assert_eq!(repo.children(&a, &ResourceId::root()).unwrap().len(), 1);

        repo.rollback(&a).unwrap();
        let c = repo.begin().unwrap();
        assert!(repo.get_resource(&c, &id("/private")).unwrap_err().is_not_found());
        assert!(repo.children(&c, &ResourceId::root()).unwrap().is_empty());
    }

    #[test]
    fn concurrent_modification_is_rejected_at_commit() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/x"))).unwrap();
        repo.commit(&tx).unwrap();

        let a = repo.begin().unwrap();
        let b = repo.begin().unwrap();
        let title = "http://purl.org/dc/terms/title";
        repo.replace_properties(&a, &id("/x"), vec![Triple::new("/x", title, Term::literal("a"))])
            .unwrap();
        repo.replace_properties(&b, &id("/x"), vec![Triple::new("/x", title, Term::literal("b"))])
            .unwrap();
        repo.commit(&a).unwrap();

        let err = repo.commit(&b).unwrap_err();
        assert!(matches!(
            err,
            SdkError::Kernel(KernelError::Transaction(TransactionError::Conflict { .. }))
        ));

        let reader = repo.begin_read_only().unwrap();
        let x = repo.get_resource(&reader, &id("/x")).unwrap();
        assert_eq!(x.triples().unwrap()[0].object, Term::literal("a"));
    }

    #[test]
    fn read_only_transactions_reject_writes() {
        let repo = repo();
        let tx = repo.begin_read_only().unwrap();
        let err = repo
            .create_container(&tx, &ContainerRequest::basic(id("/ro")))
            .unwrap_err();
        assert!(matches!(
            err,
            SdkError::Kernel(KernelError::Transaction(TransactionError::ReadOnly(_)))
        ));
    }

    // ---- Test 7: derived metadata ----

    #[test]
    fn acl_is_found_from_the_protected_resource() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/secure"))).unwrap();
        let acl = repo.create_acl(&tx, &id("/secure"), vec![]).unwrap();
        assert!(acl.is_acl());

        let secure = repo.get_resource(&tx, &id("/secure")).unwrap();
        assert_eq!(secure.acl().unwrap().unwrap().id(), &id("/secure/fcr:acl"));
        assert!(matches!(
            repo.create_acl(&tx, &id("/secure"), vec![]).unwrap_err(),
            SdkError::AlreadyExists(_)
        ));
    }

    #[test]
    fn last_modified_tracks_containment_changes() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/c"))).unwrap();
        let container = repo.get_resource(&tx, &id("/c")).unwrap();
        let before = repo.etag(&tx, &id("/c")).unwrap();
        assert!(repo.last_modified(&tx, &id("/c")).unwrap() >= container.last_modified_date());

        repo.create_container(&tx, &ContainerRequest::basic(id("/c/child"))).unwrap();
        let changed = repo.last_modified(&tx, &id("/c")).unwrap();
        assert!(changed >= container.last_modified_date());
        assert!(before.starts_with("W/\""));
    }

    #[test]
    fn rebuilding_membership_is_idempotent() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::direct(id("/a"), "/a", ldp::MEMBER))
            .unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/a/one"))).unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/a/two"))).unwrap();
        repo.commit(&tx).unwrap();

        let tx = repo.begin().unwrap();
        let original = repo.membership(&tx, &id("/a")).unwrap();
        repo.rebuild_membership(&tx, &id("/a")).unwrap();
        repo.commit(&tx).unwrap();

        let tx = repo.begin().unwrap();
        repo.rebuild_membership(&tx, &id("/a")).unwrap();
        repo.commit(&tx).unwrap();

        let reader = repo.begin_read_only().unwrap();
        assert_eq!(repo.membership(&reader, &id("/a")).unwrap(), original);
        assert_eq!(original.len(), 2);
    }

    #[test]
    fn reset_is_refused_while_edits_are_pending() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/busy"))).unwrap();
        assert!(repo.reset_indexes().is_err());
        repo.commit(&tx).unwrap();
        repo.reset_indexes().unwrap();
    }

    // ---- Test 9: user types follow writes in the same transaction ----

    #[test]
    fn container_types_follow_replaced_properties() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        let created = repo
            .create_container(&tx, &ContainerRequest::basic(id("/x")).with_type("http://example.org/A"))
            .unwrap();
        assert_eq!(created.user_types().unwrap(), vec!["http://example.org/A".to_string()]);

        let replaced = repo
            .replace_properties(
                &tx,
                &id("/x"),
                vec![Triple::iri("/x", rdf::TYPE, "http://example.org/B")],
            )
            .unwrap();
        assert_eq!(replaced.user_types().unwrap(), vec!["http://example.org/B".to_string()]);
        let reread = repo.get_resource(&tx, &id("/x")).unwrap();
        assert!(!reread.has_type("http://example.org/A").unwrap());
        repo.commit(&tx).unwrap();
    }

    #[test]
    fn binary_types_follow_replaced_description() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        let binary = repo
            .create_binary(
                &tx,
                &BinaryRequest::new(id("/b"), b"data".to_vec()).with_type("http://example.org/A"),
            )
            .unwrap();
        assert!(binary.has_type("http://example.org/A").unwrap());

        repo.replace_properties(
            &tx,
            &id("/b"),
            vec![Triple::iri("/b", rdf::TYPE, "http://example.org/B")],
        )
        .unwrap();
        let binary = repo.get_resource(&tx, &id("/b")).unwrap();
        assert_eq!(binary.user_types().unwrap(), vec!["http://example.org/B".to_string()]);
    }

    #[test]
    fn delete_and_purge_drop_cached_types() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/gone")).with_type("http://example.org/A"))
            .unwrap();
        repo.commit(&tx).unwrap();

        let tx = repo.begin().unwrap();
        let cache = repo.factory().user_types();
        let key = UserTypesKey::new("/gone", tx.session_token());
        let reload = |label: &'static str| {
            cache
                .get_or_load(&key, &|| Ok(vec![label.to_string()]))
                .unwrap()
        };
        assert!(repo.get_resource(&tx, &id("/gone")).unwrap().has_type("http://example.org/A").unwrap());
        assert_eq!(reload("stale"), vec!["http://example.org/A".to_string()]);

        repo.delete(&tx, &id("/gone")).unwrap();
        assert_eq!(reload("after delete"), vec!["after delete".to_string()]);
        repo.purge(&tx, &id("/gone")).unwrap();
        assert_eq!(reload("after purge"), vec!["after purge".to_string()]);
    }

    #[test]
    fn rolling_back_after_a_failed_step_discards_earlier_ones() {
        let repo = repo();
        let tx = repo.begin().unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/tree"))).unwrap();
        repo.create_container(&tx, &ContainerRequest::basic(id("/tree/leaf"))).unwrap();
        let err = repo
            .create_container(&tx, &ContainerRequest::basic(id("/tree/leaf")))
            .unwrap_err();
        assert!(matches!(err, SdkError::AlreadyExists(_)));
        assert!(repo.get_resource(&tx, &id("/tree")).is_ok());
        repo.rollback(&tx).unwrap();

        let tx = repo.begin().unwrap();
        assert!(repo.get_resource(&tx, &id("/tree")).unwrap_err().is_not_found());
        assert!(repo.children(&tx, &ResourceId::root()).unwrap().is_empty());
    }

    // ---- Test 10: commits are published to readers as a whole ----

    #[test]
    fn readers_never_see_a_record_without_its_containment_edge() {
        let repo = repo();
        let done = AtomicBool::new(false);
        let count = 200;

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..count {
                    let tx = repo.begin().unwrap();
                    repo.create_container(&tx, &ContainerRequest::basic(id(&format!("/c{i}"))))
                        .unwrap();
                    repo.commit(&tx).unwrap();
                }
                done.store(true, Ordering::SeqCst);
            });

            scope.spawn(|| {
                let mut seen = 0;
                while !done.load(Ordering::SeqCst) || seen < count {
                    let reader = repo.begin_read_only().unwrap();
                    let child = id(&format!("/c{seen}"));
                    if repo.get_resource(&reader, &child).is_ok() {
                        let children: Vec<ResourceId> = repo
                            .children(&reader, &ResourceId::root())
                            .unwrap()
                            .iter()
                            .map(|c| c.id().clone())
                            .collect();
                        assert!(children.contains(&child), "{child} stored but not contained");
                        seen += 1;
                    }
                    repo.commit(&reader).unwrap();
                }
            });
        });
    }
}
