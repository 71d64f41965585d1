//! A minimal RDF statement model.
//!
//! The core never parses or serializes RDF documents; it only inspects and
//! rewrites statements handed to it by the storage collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The object position of a triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Term {
    Iri(String),
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
    Blank(String),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(value.into())
    }

    /// A plain string literal.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Literal {
                value,
                datatype: Some(dt),
                ..
            } => write!(f, "\"{value}\"^^<{dt}>"),
            Self::Literal {
                value,
                language: Some(lang),
                ..
            } => write!(f, "\"{value}\"@{lang}"),
            Self::Literal { value, .. } => write!(f, "\"{value}\""),
            Self::Blank(label) => write!(f, "_:{label}"),
        }
    }
}

/// An RDF statement whose subject is always an IRI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }

    /// A triple whose object is an IRI.
    pub fn iri(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self::new(subject, predicate, Term::Iri(object.into()))
    }

    /// The same statement about a different subject.
    pub fn with_subject(&self, subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            predicate: self.predicate.clone(),
            object: self.object.clone(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}> {} .", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_ntriples() {
        let t = Triple::iri("/a", "http://www.w3.org/ns/ldp#member", "/a/b1");
        assert_eq!(t.to_string(), "</a> <http://www.w3.org/ns/ldp#member> </a/b1> .");

        let lit = Triple::new("/a", "http://purl.org/dc/terms/title", Term::literal("A"));
        assert_eq!(lit.to_string(), "</a> <http://purl.org/dc/terms/title> \"A\" .");
    }

    #[test]
    fn with_subject_keeps_predicate_and_object() {
        let t = Triple::iri("/b/fcr:metadata", "p", "o");
        let moved = t.with_subject("/b");
        assert_eq!(moved.subject, "/b");
        assert_eq!(moved.predicate, "p");
        assert_eq!(moved.object.as_iri(), Some("o"));
    }

    #[test]
    fn term_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Term::iri("x")).unwrap();
        assert!(json.contains("\"kind\":\"iri\""));
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Term::iri("x"));
    }
}
