//! Resource kernel for the linked-data repository.
//!
//! Turns stored headers into typed resources and keeps the derived indexes
//! in step with lifecycle events.
//!
//! # Key Types
//!
//! - [`ResourceFactory`] — Single dispatch point from (transaction, id) to a resource
//! - [`FedoraResource`] / [`ResourceKind`] — The closed set of resource variants
//! - [`Typed`], [`Versionable`], [`Containable`] — Capabilities every variant shares
//! - [`MembershipService`] — Derives direct and indirect container membership
//! - [`TransactionManager`] — Serialized two-phase commit across participants
//! - [`UserTypesCache`] — Session-scoped cache of user-asserted types
//!
//! # Design Rules
//!
//! 1. Tombstones and TimeMaps are computed wrappers, never stored records.
//! 2. Memento lookups never touch the user-type cache.
//! 3. Not-found is recoverable; every other storage failure is a fault.

pub mod cache;
pub mod capability;
pub mod config;
pub mod error;
pub mod factory;
pub mod memento;
pub mod membership;
pub mod resource;
pub mod transaction;
pub mod types;

pub use cache::{InMemoryUserTypesCache, UserTypesCache, UserTypesKey};
pub use capability::{Containable, Typed, Versionable};
pub use config::KernelConfig;
pub use error::{KernelError, KernelResult};
pub use factory::{variant_constructor, ResourceFactory, VariantConstructor};
pub use memento::select_nearest;
pub use membership::{ContainerType, MembershipConfig, MembershipService};
pub use resource::{Children, FedoraResource, ResourceInfo, ResourceKind};
pub use transaction::TransactionManager;
pub use types::SystemTypes;
