use serde::{Deserialize, Serialize};

use ldr_types::{Instant, InteractionModel, ResourceId, Triple};

use crate::error::{StoreError, StoreResult};

/// Binary-only header attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryHeaders {
    pub content_size: u64,
    /// Digest URIs, e.g. `urn:blake3:<hex>`.
    pub digests: Vec<String>,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    /// `proxy`, `redirect`, or `copy` for externally stored content.
    pub external_handling: Option<String>,
    pub external_url: Option<String>,
}

/// Flat metadata record of one resource at one version.
///
/// The interaction model is kept as the URI found in storage; it is only
/// classified when a resource is constructed from these headers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHeaders {
    pub id: ResourceId,
    pub parent: Option<ResourceId>,
    pub archival_group_id: Option<ResourceId>,
    pub interaction_model: String,
    pub created_by: Option<String>,
    pub created_date: Instant,
    pub last_modified_by: Option<String>,
    pub last_modified_date: Instant,
    /// Digest of the stored record, assigned by the storage on write.
    #[serde(default)]
    pub state_token: String,
    #[serde(default)]
    pub archival_group: bool,
    #[serde(default)]
    pub object_root: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub binary: Option<BinaryHeaders>,
}

impl ResourceHeaders {
    /// Headers for a resource created at `at`.
    pub fn new(id: ResourceId, model: InteractionModel, at: Instant) -> Self {
        Self {
            id,
            parent: None,
            archival_group_id: None,
            interaction_model: model.uri().to_string(),
            created_by: None,
            created_date: at,
            last_modified_by: None,
            last_modified_date: at,
            state_token: String::new(),
            archival_group: false,
            object_root: false,
            deleted: false,
            binary: None,
        }
    }

    pub fn with_parent(mut self, parent: ResourceId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_binary(mut self, binary: BinaryHeaders) -> Self {
        self.binary = Some(binary);
        self
    }

    /// The classified interaction model, if this core knows it.
    pub fn model(&self) -> Option<InteractionModel> {
        InteractionModel::from_uri(&self.interaction_model)
    }

    /// Weak entity tag derived from the state token.
    pub fn etag(&self) -> String {
        format!("W/\"{}\"", self.state_token)
    }

    /// Record a modification.
    pub fn touch(&mut self, at: Instant, by: Option<String>) {
        self.last_modified_date = at;
        self.last_modified_by = by;
    }
}

/// Headers and triples of one record at one point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub headers: ResourceHeaders,
    pub triples: Vec<Triple>,
}

impl ResourceSnapshot {
    pub fn new(headers: ResourceHeaders, triples: Vec<Triple>) -> Self {
        Self { headers, triples }
    }

    /// BLAKE3 digest (hex) of the snapshot, ignoring any previous token.
    pub fn compute_state_token(&self) -> StoreResult<String> {
        let mut headers = self.headers.clone();
        headers.state_token.clear();
        let bytes = serde_json::to_vec(&(&headers, &self.triples))
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(hex::encode(blake3::hash(&bytes).as_bytes()))
    }

    /// Reject statements the storage can not file.
    pub fn validate(&self) -> StoreResult<()> {
        for triple in &self.triples {
            if triple.subject.is_empty() || triple.predicate.is_empty() {
                return Err(StoreError::MalformedRdf {
                    id: self.headers.id.to_string(),
                    reason: format!("statement with empty subject or predicate: {triple}"),
                });
            }
        }
        Ok(())
    }
}
