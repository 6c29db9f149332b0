// ── Domain model ──
//
// Topology and ownership types shared by every service in the crate.

mod access;
mod cluster;

pub use access::ClusterAccessControlMap;
pub use cluster::{ClusterDefinition, ClusterKey, DatastoreType, Instance};
