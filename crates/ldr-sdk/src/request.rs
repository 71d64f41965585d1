use serde::{Deserialize, Serialize};

use ldr_types::vocab::{ldp, rdf};
use ldr_types::{InteractionModel, ResourceId, Term, Triple};

/// Request to create a container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRequest {
    pub id: ResourceId,
    pub model: InteractionModel,
    #[serde(default)]
    pub triples: Vec<Triple>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub archival_group: bool,
}

impl ContainerRequest {
    pub fn new(id: ResourceId, model: InteractionModel) -> Self {
        Self {
            id,
            model,
            triples: Vec::new(),
            created_by: None,
            archival_group: false,
        }
    }

    pub fn basic(id: ResourceId) -> Self {
        Self::new(id, InteractionModel::BasicContainer)
    }

    /// A direct container with its membership resource and relation.
    pub fn direct(
        id: ResourceId,
        membership_resource: impl Into<String>,
        has_member_relation: impl Into<String>,
    ) -> Self {
        Self::new(id, InteractionModel::DirectContainer)
            .with_iri(ldp::MEMBERSHIP_RESOURCE, membership_resource)
            .with_iri(ldp::HAS_MEMBER_RELATION, has_member_relation)
    }

    /// An indirect container whose members are read from
    /// `inserted_content_relation` on each child.
    pub fn indirect(id: ResourceId, inserted_content_relation: impl Into<String>) -> Self {
        Self::new(id, InteractionModel::IndirectContainer)
            .with_iri(ldp::INSERTED_CONTENT_RELATION, inserted_content_relation)
    }

    /// Add a statement about this container.
    pub fn with_triple(mut self, predicate: impl Into<String>, object: Term) -> Self {
        self.triples
            .push(Triple::new(self.id.full_id(), predicate, object));
        self
    }

    pub fn with_iri(self, predicate: impl Into<String>, object: impl Into<String>) -> Self {
        self.with_triple(predicate, Term::iri(object))
    }

    pub fn with_type(self, uri: impl Into<String>) -> Self {
        self.with_iri(rdf::TYPE, uri)
    }

    pub fn with_created_by(mut self, agent: impl Into<String>) -> Self {
        self.created_by = Some(agent.into());
        self
    }

    pub fn as_archival_group(mut self) -> Self {
        self.archival_group = true;
        self
    }
}

/// Request to create a binary and its description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRequest {
    pub id: ResourceId,
    pub content: Vec<u8>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    /// Statements stored in the description, about the binary.
    #[serde(default)]
    pub triples: Vec<Triple>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl BinaryRequest {
    pub fn new(id: ResourceId, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            content: content.into(),
            mime_type: None,
            filename: None,
            triples: Vec::new(),
            created_by: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_triple(mut self, predicate: impl Into<String>, object: Term) -> Self {
        self.triples
            .push(Triple::new(self.id.full_id(), predicate, object));
        self
    }

    pub fn with_type(self, uri: impl Into<String>) -> Self {
        self.with_triple(rdf::TYPE, Term::iri(uri))
    }

    pub fn with_created_by(mut self, agent: impl Into<String>) -> Self {
        self.created_by = Some(agent.into());
        self
    }

    /// Content digest URI, `urn:blake3:<hex>`.
    pub fn digest(&self) -> String {
        format!("urn:blake3:{}", blake3::hash(&self.content).to_hex())
    }
}
