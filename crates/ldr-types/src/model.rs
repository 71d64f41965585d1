use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::vocab::{ldp, repository, webac};

/// The persisted shape of a resource, as recorded in its headers.
///
/// Stored headers carry the model as a URI so that records written by other
/// components can hold values this core does not know. Use
/// [`InteractionModel::from_uri`] to classify them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InteractionModel {
    BasicContainer,
    DirectContainer,
    IndirectContainer,
    NonRdfSource,
    NonRdfSourceDescription,
    Acl,
}

impl InteractionModel {
    /// Every defined interaction model.
    pub const ALL: [InteractionModel; 6] = [
        InteractionModel::BasicContainer,
        InteractionModel::DirectContainer,
        InteractionModel::IndirectContainer,
        InteractionModel::NonRdfSource,
        InteractionModel::NonRdfSourceDescription,
        InteractionModel::Acl,
    ];

    /// The URI recorded in resource headers.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::BasicContainer => ldp::BASIC_CONTAINER,
            Self::DirectContainer => ldp::DIRECT_CONTAINER,
            Self::IndirectContainer => ldp::INDIRECT_CONTAINER,
            Self::NonRdfSource => ldp::NON_RDF_SOURCE,
            Self::NonRdfSourceDescription => repository::NON_RDF_SOURCE_DESCRIPTION,
            Self::Acl => webac::ACL,
        }
    }

    /// Classify a header URI. Returns `None` for anything unknown.
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.uri() == uri)
    }

    /// Basic, direct, and indirect containers.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::BasicContainer | Self::DirectContainer | Self::IndirectContainer
        )
    }

    /// Containers that derive membership triples from their children.
    pub fn is_membership_container(&self) -> bool {
        matches!(self, Self::DirectContainer | Self::IndirectContainer)
    }
}

impl fmt::Display for InteractionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

impl FromStr for InteractionModel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s).ok_or_else(|| TypeError::UnknownInteractionModel(s.to_string()))
    }
}
