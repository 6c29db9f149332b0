// ── Cluster topology types ──

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of datastore a cluster runs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DatastoreType {
    Cassandra,
    Redis,
}

/// One physical host of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub hostname: String,
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    /// Health as reported by the discovery source (e.g. `"UP"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// A logical cluster as reported by discovery.
///
/// Immutable once discovered: every discovery tick produces fresh
/// definitions that replace the previous ones wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDefinition {
    pub name: String,
    pub env: String,
    pub region: String,
    pub datastore_type: DatastoreType,
    #[serde(default)]
    pub instances: Vec<Instance>,
}

impl ClusterDefinition {
    /// Hostnames in discovery order.
    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.instances.iter().map(|i| i.hostname.as_str())
    }

    /// The set of `(hostname, ip)` endpoints a connection is built against.
    ///
    /// Two definitions with equal endpoints can share an explorer; status
    /// or stack changes alone never force a reconnect.
    pub fn endpoints(&self) -> BTreeSet<(&str, &str)> {
        self.instances
            .iter()
            .map(|i| (i.hostname.as_str(), i.ip.as_str()))
            .collect()
    }

    /// Whether an explorer built for `self` is still usable for `other`.
    pub fn same_endpoints(&self, other: &ClusterDefinition) -> bool {
        self.endpoints() == other.endpoints()
    }

    pub fn key(&self) -> ClusterKey {
        ClusterKey::new(
            self.datastore_type,
            self.name.clone(),
            self.region.clone(),
            self.env.clone(),
        )
    }
}

/// Identifies at most one cluster, and therefore at most one live explorer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterKey {
    pub datastore_type: DatastoreType,
    pub cluster_name: String,
    pub region: String,
    pub env: String,
}

impl ClusterKey {
    pub fn new(
        datastore_type: DatastoreType,
        cluster_name: impl Into<String>,
        region: impl Into<String>,
        env: impl Into<String>,
    ) -> Self {
        Self {
            datastore_type,
            cluster_name: cluster_name.into(),
            region: region.into(),
            env: env.into(),
        }
    }

    pub fn matches(&self, cluster: &ClusterDefinition) -> bool {
        self.datastore_type == cluster.datastore_type
            && self.cluster_name == cluster.name
            && self.region == cluster.region
            && self.env == cluster.env
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.datastore_type, self.cluster_name, self.region, self.env
        )
    }
}
