// ── Cluster ownership types ──

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Cluster (or application) name → groups permitted to use it.
///
/// Replaced wholesale on every successful ownership poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterAccessControlMap {
    owners: BTreeMap<String, BTreeSet<String>>,
}

impl ClusterAccessControlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `group` access to `cluster`.
    pub fn insert(&mut self, cluster: impl Into<String>, group: impl Into<String>) {
        self.owners
            .entry(cluster.into())
            .or_default()
            .insert(group.into());
    }

    /// Groups permitted on `cluster`, or `None` if the cluster has no entry.
    pub fn owners(&self, cluster: &str) -> Option<&BTreeSet<String>> {
        self.owners.get(cluster)
    }

    /// Whether a member of `groups` may use `cluster`.
    ///
    /// Clusters without an ownership entry are open to every caller; an
    /// entry with an empty group set admits nobody.
    pub fn permits<S: AsRef<str>>(&self, cluster: &str, groups: &[S]) -> bool {
        match self.owners.get(cluster) {
            None => true,
            Some(allowed) => groups.iter().any(|g| allowed.contains(g.as_ref())),
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.owners.iter()
    }
}

impl<C, G, I> FromIterator<(C, I)> for ClusterAccessControlMap
where
    C: Into<String>,
    G: Into<String>,
    I: IntoIterator<Item = G>,
{
    fn from_iter<T: IntoIterator<Item = (C, I)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (cluster, groups) in iter {
            let entry = map.owners.entry(cluster.into()).or_default();
            entry.extend(groups.into_iter().map(Into::into));
        }
        map
    }
}
