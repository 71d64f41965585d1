//! Structural (system) types of each resource variant.

use ldr_types::vocab::{ldp, memento, repository, webac};

use crate::resource::{FedoraResource, ResourceKind};

/// System types of one resource, split into the RDF-exposed set and the
/// full set that adds internal-only markers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SystemTypes {
    rdf: Vec<String>,
    all: Vec<String>,
}

impl SystemTypes {
    pub fn get(&self, for_rdf: bool) -> &[String] {
        if for_rdf {
            &self.rdf
        } else {
            &self.all
        }
    }

    fn push_rdf(&mut self, uri: &str) {
        if !self.rdf.iter().any(|t| t == uri) {
            self.rdf.push(uri.to_string());
        }
        self.push_internal(uri);
    }

    fn push_internal(&mut self, uri: &str) {
        if !self.all.iter().any(|t| t == uri) {
            self.all.push(uri.to_string());
        }
    }

    /// Compute the types of `resource` from its variant and headers alone.
    pub(crate) fn for_resource(resource: &FedoraResource) -> Self {
        let mut types = Self::default();
        if resource.is_deleted_object() {
            return types;
        }
        let is_memento = resource.id().is_memento();
        match resource.kind() {
            ResourceKind::Container => {
                types.push_rdf(repository::RESOURCE);
                types.push_rdf(repository::CONTAINER);
                types.push_rdf(ldp::RDF_SOURCE);
                types.push_rdf(ldp::CONTAINER);
                types.push_rdf(resource.interaction_model().uri());
                if resource.id().is_root() {
                    types.push_rdf(repository::REPOSITORY_ROOT);
                }
                if resource.is_archival_group() {
                    types.push_internal(repository::ARCHIVAL_GROUP);
                }
            }
            ResourceKind::Binary(_) => {
                types.push_rdf(repository::RESOURCE);
                types.push_rdf(repository::BINARY);
                types.push_rdf(ldp::NON_RDF_SOURCE);
            }
            ResourceKind::BinaryDescription => {
                types.push_rdf(repository::RESOURCE);
                types.push_rdf(ldp::RDF_SOURCE);
                types.push_rdf(repository::NON_RDF_SOURCE_DESCRIPTION);
            }
            ResourceKind::Acl => {
                types.push_rdf(repository::RESOURCE);
                types.push_rdf(ldp::RDF_SOURCE);
                types.push_rdf(ldp::CONTAINER);
                types.push_rdf(webac::ACL);
            }
            ResourceKind::TimeMap(_) => {
                types.push_rdf(repository::RESOURCE);
                types.push_rdf(ldp::RDF_SOURCE);
                types.push_rdf(ldp::CONTAINER);
                types.push_internal(memento::TIME_MAP);
                return types;
            }
            ResourceKind::Tombstone(_) => return types,
        }

        if is_memento {
            types.push_internal(memento::MEMENTO);
        } else if !matches!(resource.kind(), ResourceKind::Acl) {
            types.push_internal(memento::ORIGINAL_RESOURCE);
        }
        types
    }
}
