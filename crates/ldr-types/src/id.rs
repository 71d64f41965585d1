//! Internal resource identifiers.
//!
//! A [`ResourceId`] is an absolute path, optionally followed by qualifiers
//! that select a related resource:
//!
//! ```text
//! base[/fcr:metadata]
//! base/fcr:acl
//! base[/fcr:metadata]/fcr:versions[/<yyyyMMddHHmmss>]
//! ```
//!
//! The version qualifier is always outermost, so a memento of a binary
//! description is `base/fcr:metadata/fcr:versions/<label>`. The qualifier
//! segments and the label format are a stable external contract.
//!
//! Ids compare, hash, and order by their full string form.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::temporal::{format_memento_label, parse_memento_label, truncate_to_second, Instant};

/// Qualifier selecting a binary's description.
pub const FCR_METADATA: &str = "fcr:metadata";
/// Qualifier selecting a resource's ACL.
pub const FCR_ACL: &str = "fcr:acl";
/// Qualifier selecting the version collection (TimeMap) or, followed by a
/// label, a single memento.
pub const FCR_VERSIONS: &str = "fcr:versions";
/// Qualifier reserved for tombstones. Never part of a valid id.
pub const FCR_TOMBSTONE: &str = "fcr:tombstone";

const RESERVED_SEGMENTS: [&str; 4] = [FCR_METADATA, FCR_ACL, FCR_VERSIONS, FCR_TOMBSTONE];

const ROOT: &str = "/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Versions {
    TimeMap,
    Memento(Instant),
}

/// A qualifier that can be composed onto an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Suffix {
    Metadata,
    Acl,
    Versions,
    Memento(Instant),
}

/// Immutable, parsed resource identifier.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    full: String,
    base: String,
    description: bool,
    acl: bool,
    versions: Option<Versions>,
}

impl ResourceId {
    /// The repository root, `/`.
    pub fn root() -> Self {
        Self::compose(ROOT.to_string(), false, false, None)
    }

    /// Parse a full identifier string.
    ///
    /// Leading and single trailing slashes are normalized. Fails with
    /// [`TypeError::MalformedIdentifier`] on empty segments, reserved
    /// segments outside their grammar position, ACL qualifiers combined with
    /// description or version qualifiers, and unparseable memento labels.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw.is_empty() {
            return Err(TypeError::malformed(raw, "empty identifier"));
        }
        let path = raw.strip_prefix('/').unwrap_or(raw);
        let path = path.strip_suffix('/').unwrap_or(path);
        if path.is_empty() {
            return Ok(Self::root());
        }

        let mut segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(TypeError::malformed(raw, "empty path segment"));
        }

        let mut versions = None;
        let len = segments.len();
        if len >= 2 && segments[len - 2] == FCR_VERSIONS {
            let label = segments[len - 1];
            let instant = parse_memento_label(label).map_err(|_| {
                TypeError::malformed(raw, format!("{label} is not a memento timestamp"))
            })?;
            versions = Some(Versions::Memento(instant));
            segments.truncate(len - 2);
        } else if segments.last() == Some(&FCR_VERSIONS) {
            versions = Some(Versions::TimeMap);
            segments.pop();
        }

        let mut description = false;
        let mut acl = false;
        match segments.last().copied() {
            Some(FCR_METADATA) => {
                description = true;
                segments.pop();
            }
            Some(FCR_ACL) => {
                if versions.is_some() {
                    return Err(TypeError::malformed(raw, "an ACL can not be versioned"));
                }
                acl = true;
                segments.pop();
            }
            _ => {}
        }

        if let Some(reserved) = segments.iter().find(|s| RESERVED_SEGMENTS.contains(s)) {
            return Err(TypeError::malformed(
                raw,
                format!("{reserved} is not allowed at this position"),
            ));
        }

        let base = format!("/{}", segments.join("/"));
        Ok(Self::compose(base, description, acl, versions))
    }

    fn compose(base: String, description: bool, acl: bool, versions: Option<Versions>) -> Self {
        let mut full = base.clone();
        if description {
            push_segment(&mut full, FCR_METADATA);
        }
        if acl {
            push_segment(&mut full, FCR_ACL);
        }
        match versions {
            Some(Versions::TimeMap) => push_segment(&mut full, FCR_VERSIONS),
            Some(Versions::Memento(instant)) => {
                push_segment(&mut full, FCR_VERSIONS);
                push_segment(&mut full, &format_memento_label(&instant));
            }
            None => {}
        }
        Self {
            full,
            base,
            description,
            acl,
            versions,
        }
    }

    /// The full identifier, including all qualifiers.
    pub fn full_id(&self) -> &str {
        &self.full
    }

    /// The addressable path with every qualifier removed.
    pub fn base_id(&self) -> &str {
        &self.base
    }

    /// The id with every qualifier removed.
    pub fn as_base_id(&self) -> Self {
        Self::compose(self.base.clone(), false, false, None)
    }

    /// The id with version qualifiers removed, keeping description and ACL
    /// qualifiers. This is the key the storage layer files a record under.
    pub fn resource_id(&self) -> Self {
        Self::compose(self.base.clone(), self.description, self.acl, None)
    }

    /// The ACL of the base resource.
    pub fn as_acl(&self) -> Self {
        Self::compose(self.base.clone(), false, true, None)
    }

    /// The description of this resource. Memento-ness is kept.
    pub fn as_description(&self) -> Self {
        Self::compose(self.base.clone(), true, false, self.versions)
    }

    /// The resource a description describes. Memento-ness is kept.
    pub fn as_described(&self) -> Self {
        Self::compose(self.base.clone(), false, self.acl, self.versions)
    }

    /// The version collection of this resource (or of its description).
    pub fn as_timemap(&self) -> Self {
        Self::compose(self.base.clone(), self.description, false, Some(Versions::TimeMap))
    }

    /// The memento of this resource (or of its description) at `instant`,
    /// truncated to the second.
    pub fn as_memento(&self, instant: Instant) -> Self {
        Self::compose(
            self.base.clone(),
            self.description,
            false,
            Some(Versions::Memento(truncate_to_second(instant))),
        )
    }

    /// Compose a qualifier onto this id. Never fails and never mutates.
    pub fn add_suffix(&self, suffix: Suffix) -> Self {
        match suffix {
            Suffix::Metadata => self.as_description(),
            Suffix::Acl => self.as_acl(),
            Suffix::Versions => self.as_timemap(),
            Suffix::Memento(instant) => self.as_memento(instant),
        }
    }

    /// Resolve a relative child path against the base path.
    pub fn resolve(&self, child: &str) -> Result<Self, TypeError> {
        let child = child.trim_start_matches('/');
        if child.is_empty() {
            return Err(TypeError::malformed(child, "empty child path"));
        }
        let mut path = self.base.clone();
        push_segment(&mut path, child);
        Self::parse(&path)
    }

    /// The structural parent of the base path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.base == ROOT {
            return None;
        }
        let parent = match self.base.rfind('/') {
            Some(0) | None => ROOT.to_string(),
            Some(idx) => self.base[..idx].to_string(),
        };
        Some(Self::compose(parent, false, false, None))
    }

    /// Structural ancestors of the base path, nearest first, ending at the
    /// root.
    pub fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(id) = current {
            current = id.parent();
            out.push(id);
        }
        out
    }

    pub fn is_root(&self) -> bool {
        self.full == ROOT
    }

    pub fn is_acl(&self) -> bool {
        self.acl
    }

    pub fn is_description(&self) -> bool {
        self.description
    }

    pub fn is_timemap(&self) -> bool {
        matches!(self.versions, Some(Versions::TimeMap))
    }

    pub fn is_memento(&self) -> bool {
        matches!(self.versions, Some(Versions::Memento(_)))
    }

    pub fn memento_instant(&self) -> Option<Instant> {
        match self.versions {
            Some(Versions::Memento(instant)) => Some(instant),
            _ => None,
        }
    }

    /// The 14-digit label of a memento id.
    pub fn memento_label(&self) -> Option<String> {
        self.memento_instant().map(|t| format_memento_label(&t))
    }
}

fn push_segment(path: &mut String, segment: &str) {
    if !path.ends_with('/') {
        path.push('/');
    }
    path.push_str(segment);
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl Eq for ResourceId {}

impl Hash for ResourceId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl PartialOrd for ResourceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResourceId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.full.cmp(&other.full)
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.full)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl FromStr for ResourceId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.full
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn id(raw: &str) -> ResourceId {
        ResourceId::parse(raw).unwrap()
    }

    fn t1() -> Instant {
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
    }

    // ---- Parsing ----

    #[test]
    fn parses_plain_paths() {
        let a = id("/a/b");
        assert_eq!(a.full_id(), "/a/b");
        assert_eq!(a.base_id(), "/a/b");
        assert!(!a.is_memento() && !a.is_acl() && !a.is_description() && !a.is_timemap());
    }

    #[test]
    fn normalizes_leading_and_trailing_slashes() {
        assert_eq!(id("a/b"), id("/a/b"));
        assert_eq!(id("/a/b/"), id("/a/b"));
        assert!(id("/").is_root());
        assert_eq!(ResourceId::root().full_id(), "/");
    }

    #[test]
    fn parses_description_acl_and_timemap() {
        let d = id("/b/fcr:metadata");
        assert!(d.is_description());
        assert_eq!(d.base_id(), "/b");

        let acl = id("/x/fcr:acl");
        assert!(acl.is_acl());
        assert_eq!(acl.base_id(), "/x");

        let tm = id("/x/fcr:versions");
        assert!(tm.is_timemap());
        assert!(!tm.is_memento());
        assert_eq!(tm.resource_id(), id("/x"));
    }

    #[test]
    fn parses_memento_of_description() {
        let m = id("/b/fcr:metadata/fcr:versions/20200101000000");
        assert!(m.is_memento());
        assert!(m.is_description());
        assert_eq!(m.memento_instant(), Some(t1()));
        assert_eq!(m.memento_label().as_deref(), Some("20200101000000"));
        assert_eq!(m.resource_id(), id("/b/fcr:metadata"));
        assert_eq!(m.as_base_id(), id("/b"));
    }

    #[test]
    fn root_acl_is_valid() {
        let acl = id("/fcr:acl");
        assert!(acl.is_acl());
        assert_eq!(acl.base_id(), "/");
        assert_eq!(acl.full_id(), "/fcr:acl");
    }

    #[test]
    fn rejects_malformed_identifiers() {
        for raw in [
            "",
            "//a",
            "/a//b",
            "/x/fcr:versions/fcr:acl",
            "/x/fcr:acl/fcr:metadata",
            "/x/fcr:metadata/fcr:acl",
            "/x/fcr:acl/fcr:versions",
            "/x/fcr:versions/fcr:metadata",
            "/x/fcr:versions/abc",
            "/x/fcr:versions/20201301000000",
            "/x/fcr:tombstone",
            "/x/fcr:metadata/y",
            "/x/fcr:versions/20200101000000/y",
        ] {
            let err = ResourceId::parse(raw).unwrap_err();
            assert!(
                matches!(err, TypeError::MalformedIdentifier { .. }),
                "{raw} should be malformed"
            );
        }
    }

    // ---- Composition ----

    #[test]
    fn suffix_composition_is_pure() {
        let x = id("/x");
        let acl = x.add_suffix(Suffix::Acl);
        assert_eq!(acl.full_id(), "/x/fcr:acl");
        assert_eq!(x.full_id(), "/x");
        assert_eq!(x.add_suffix(Suffix::Metadata).full_id(), "/x/fcr:metadata");
        assert_eq!(x.add_suffix(Suffix::Versions).full_id(), "/x/fcr:versions");
        assert_eq!(
            x.add_suffix(Suffix::Memento(t1())).full_id(),
            "/x/fcr:versions/20200101000000"
        );
    }

    #[test]
    fn memento_qualifier_stays_outermost() {
        let d = id("/b/fcr:metadata");
        assert_eq!(
            d.as_memento(t1()).full_id(),
            "/b/fcr:metadata/fcr:versions/20200101000000"
        );
        assert_eq!(d.as_timemap().full_id(), "/b/fcr:metadata/fcr:versions");
    }

    #[test]
    fn description_round_trip_keeps_memento() {
        let binary_memento = id("/b/fcr:versions/20200101000000");
        let desc = binary_memento.as_description();
        assert_eq!(desc.full_id(), "/b/fcr:metadata/fcr:versions/20200101000000");
        assert_eq!(desc.as_described(), binary_memento);
    }

    #[test]
    fn acl_of_a_memento_targets_the_base() {
        let m = id("/x/fcr:versions/20200101000000");
        assert_eq!(m.as_acl().full_id(), "/x/fcr:acl");
    }

    #[test]
    fn resolve_and_parent() {
        let a = id("/a");
        let child = a.resolve("b1").unwrap();
        assert_eq!(child.full_id(), "/a/b1");
        assert_eq!(child.parent(), Some(a.clone()));
        assert_eq!(a.parent(), Some(ResourceId::root()));
        assert_eq!(ResourceId::root().parent(), None);
        assert_eq!(ResourceId::root().resolve("top").unwrap().full_id(), "/top");
        assert!(a.resolve("").is_err());
        assert!(a.resolve("x//y").is_err());
    }

    #[test]
    fn ancestors_end_at_root() {
        let ancestors = id("/a/b/c").ancestors();
        let paths: Vec<&str> = ancestors.iter().map(|a| a.full_id()).collect();
        assert_eq!(paths, vec!["/a/b", "/a", "/"]);
    }

    #[test]
    fn equality_is_on_full_form() {
        assert_ne!(id("/x"), id("/x/fcr:acl"));
        assert_eq!(id("/x/fcr:acl"), id("x/fcr:acl/"));
        let mut ids = vec![id("/b"), id("/a/fcr:acl"), id("/a")];
        ids.sort();
        assert_eq!(ids[0], id("/a"));
    }

    #[test]
    fn serializes_as_string() {
        let m = id("/x/fcr:versions/20200101000000");
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"/x/fcr:versions/20200101000000\"");
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
        assert!(serde_json::from_str::<ResourceId>("\"/x//y\"").is_err());
    }

    // ---- Properties ----

    fn arb_id() -> impl Strategy<Value = ResourceId> {
        (
            proptest::collection::vec("[a-z0-9][a-z0-9_.-]{0,7}", 0..4),
            0u8..7,
            0i64..253_402_300_799i64,
        )
            .prop_map(|(segments, suffix, secs)| {
                let base = ResourceId::parse(&format!("/{}", segments.join("/"))).unwrap();
                let instant = chrono::DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
                match suffix {
                    0 => base,
                    1 => base.add_suffix(Suffix::Metadata),
                    2 => base.add_suffix(Suffix::Acl),
                    3 => base.add_suffix(Suffix::Versions),
                    4 => base.add_suffix(Suffix::Memento(instant)),
                    5 => base.as_description().as_timemap(),
                    _ => base.as_description().as_memento(instant),
                }
            })
    }

    proptest! {
        #[test]
        fn parse_of_full_form_round_trips(rid in arb_id()) {
            let reparsed = ResourceId::parse(rid.full_id()).unwrap();
            prop_assert_eq!(&reparsed, &rid);
            prop_assert_eq!(reparsed.is_memento(), rid.is_memento());
            prop_assert_eq!(reparsed.memento_instant(), rid.memento_instant());
            prop_assert_eq!(reparsed.is_description(), rid.is_description());
            prop_assert_eq!(reparsed.base_id(), rid.base_id());
        }

        #[test]
        fn base_id_has_no_qualifiers(rid in arb_id()) {
            let base = rid.as_base_id();
            prop_assert!(!base.is_memento() && !base.is_acl());
            prop_assert!(!base.is_description() && !base.is_timemap());
            prop_assert_eq!(base.full_id(), rid.base_id());
        }
    }
}
