//! RDF vocabulary used by type resolution and membership.
//!
//! Terms are grouped by namespace. Only the terms the repository core
//! actually reads or emits are listed.

/// Repository-specific terms.
pub mod repository {
    pub const NS: &str = "http://fedora.info/definitions/v4/repository#";

    pub const RESOURCE: &str = "http://fedora.info/definitions/v4/repository#Resource";
    pub const CONTAINER: &str = "http://fedora.info/definitions/v4/repository#Container";
    pub const BINARY: &str = "http://fedora.info/definitions/v4/repository#Binary";
    pub const REPOSITORY_ROOT: &str = "http://fedora.info/definitions/v4/repository#RepositoryRoot";
    pub const ARCHIVAL_GROUP: &str = "http://fedora.info/definitions/v4/repository#ArchivalGroup";
    pub const NON_RDF_SOURCE_DESCRIPTION: &str =
        "http://fedora.info/definitions/v4/repository#NonRdfSourceDescription";
}

/// Linked Data Platform.
pub mod ldp {
    pub const NS: &str = "http://www.w3.org/ns/ldp#";

    pub const RESOURCE: &str = "http://www.w3.org/ns/ldp#Resource";
    pub const RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#RDFSource";
    pub const NON_RDF_SOURCE: &str = "http://www.w3.org/ns/ldp#NonRDFSource";
    pub const CONTAINER: &str = "http://www.w3.org/ns/ldp#Container";
    pub const BASIC_CONTAINER: &str = "http://www.w3.org/ns/ldp#BasicContainer";
    pub const DIRECT_CONTAINER: &str = "http://www.w3.org/ns/ldp#DirectContainer";
    pub const INDIRECT_CONTAINER: &str = "http://www.w3.org/ns/ldp#IndirectContainer";

    pub const CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
    pub const MEMBER: &str = "http://www.w3.org/ns/ldp#member";
    pub const MEMBERSHIP_RESOURCE: &str = "http://www.w3.org/ns/ldp#membershipResource";
    pub const HAS_MEMBER_RELATION: &str = "http://www.w3.org/ns/ldp#hasMemberRelation";
    pub const IS_MEMBER_OF_RELATION: &str = "http://www.w3.org/ns/ldp#isMemberOfRelation";
    pub const INSERTED_CONTENT_RELATION: &str = "http://www.w3.org/ns/ldp#insertedContentRelation";
    pub const MEMBER_SUBJECT: &str = "http://www.w3.org/ns/ldp#MemberSubject";
}

/// Memento protocol (RFC 7089).
pub mod memento {
    pub const NS: &str = "http://mementoweb.org/ns#";

    pub const MEMENTO: &str = "http://mementoweb.org/ns#Memento";
    pub const TIME_MAP: &str = "http://mementoweb.org/ns#TimeMap";
    pub const TIME_GATE: &str = "http://mementoweb.org/ns#TimeGate";
    pub const ORIGINAL_RESOURCE: &str = "http://mementoweb.org/ns#OriginalResource";
    pub const ORIGINAL: &str = "http://mementoweb.org/ns#original";
}

/// Web access control.
pub mod webac {
    pub const NS: &str = "http://www.w3.org/ns/auth/acl#";

    pub const ACCESS_CONTROL: &str = "http://www.w3.org/ns/auth/acl#accessControl";
    /// Interaction model of an ACL resource.
    pub const ACL: &str = "http://fedora.info/definitions/v4/webac#Acl";
}

/// RDF core.
pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_live_in_their_namespace() {
        for term in [ldp::CONTAINS, ldp::MEMBER, ldp::MEMBER_SUBJECT, ldp::DIRECT_CONTAINER] {
            assert!(term.starts_with(ldp::NS), "{term}");
        }
        for term in [memento::MEMENTO, memento::TIME_MAP, memento::ORIGINAL] {
            assert!(term.starts_with(memento::NS), "{term}");
        }
        assert!(repository::ARCHIVAL_GROUP.starts_with(repository::NS));
        assert!(rdf::TYPE.starts_with(rdf::NS));
    }
}
