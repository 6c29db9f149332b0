//! Connection-lifecycle core for a multi-region datastore fleet.
//!
//! This crate owns the long-lived, shared state every request handler
//! reads from:
//!
//! - **[`DiscoveryService`]**: Wraps one [`DiscoveryProvider`]
//!   (environment, filesystem watch, or static) and keeps the current
//!   [`DiscoverySnapshot`] of clusters, environments, and regions.
//!   Provider events are re-broadcast unchanged.
//!
//! - **[`ClusterAccessControlService`]**: Polls a
//!   [`ClusterAccessControlProvider`] on independent success/error
//!   intervals and publishes the cluster ownership map. A failed poll keeps
//!   the previous map.
//!
//! - **[`UserGroupCache`]**: LRU + TTL cache of user → group lookups in
//!   front of a [`UserGroupProvider`].
//!
//! - **[`ExplorerCache`]**: One live datastore client per
//!   [`ClusterKey`], created on demand through a caller-supplied connect
//!   function with single-flight semantics, retired when discovery drops
//!   or changes the cluster.
//!
//! - **[`Cursor`] / [`ScanAggregator`]**: Per-request state for scans that
//!   walk every host of a cluster and return one composite cursor.
//!
//! - **[`FleetContext`]**: Builds all of the above from a [`FleetConfig`]
//!   and wires discovery changes into the explorer cache.

pub mod access;
pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod explorer;
pub mod groups;
pub mod model;
pub mod scan;

// ── Primary re-exports ──────────────────────────────────────────────
pub use access::{
    AccessControlEvent, AccessControlMetadata, AccessControlReader, AclRequestOptions,
    ClusterAccessControlProvider, ClusterAccessControlService,
};
pub use config::{AccessControlConfig, DiscoveryConfig, FleetConfig, UserGroupConfig};
pub use context::FleetContext;
pub use discovery::{
    ClusterSchema, DiscoveryEvent, DiscoveryProvider, DiscoveryReader, DiscoveryService,
    DiscoverySink, DiscoverySnapshot,
};
pub use error::CoreError;
pub use explorer::{Explorer, ExplorerCache, ExplorerEntry, ExplorerKey};
pub use groups::{UserGroupCache, UserGroupCacheEntry, UserGroupProvider};
pub use scan::{ClientCursor, Cursor, ScanAggregator, ScanPage};

pub use model::{ClusterAccessControlMap, ClusterDefinition, ClusterKey, DatastoreType, Instance};
