// ── Discovery snapshot ──
//
// The one current view of the fleet. Replaced atomically via `ArcSwap`
// on every provider emission; readers never block the writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::broadcast;

use super::DiscoveryEvent;
use crate::model::{ClusterDefinition, ClusterKey, DatastoreType};

const EVENT_CHANNEL_SIZE: usize = 256;

/// Clusters grouped by datastore type, plus known environments and regions.
#[derive(Debug, Clone, Default)]
pub struct DiscoverySnapshot {
    clusters: BTreeMap<DatastoreType, Vec<Arc<ClusterDefinition>>>,
    environments: Arc<Vec<String>>,
    regions: Arc<Vec<String>>,
}

impl DiscoverySnapshot {
    /// Clusters of one datastore type, in discovery order.
    pub fn clusters(&self, datastore_type: DatastoreType) -> &[Arc<ClusterDefinition>] {
        self.clusters
            .get(&datastore_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every cluster across all datastore types.
    pub fn all_clusters(&self) -> impl Iterator<Item = &Arc<ClusterDefinition>> {
        self.clusters.values().flatten()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.values().map(Vec::len).sum()
    }

    /// Look up the cluster a key refers to.
    pub fn find(&self, key: &ClusterKey) -> Option<&Arc<ClusterDefinition>> {
        self.clusters(key.datastore_type)
            .iter()
            .find(|c| key.matches(c))
    }

    pub fn find_cluster(
        &self,
        datastore_type: DatastoreType,
        name: &str,
        region: &str,
        env: &str,
    ) -> Option<&Arc<ClusterDefinition>> {
        self.clusters(datastore_type)
            .iter()
            .find(|c| c.name == name && c.region == region && c.env == env)
    }

    pub fn environments(&self) -> &[String] {
        &self.environments
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    fn with_clusters(&self, clusters: &[Arc<ClusterDefinition>]) -> Self {
        let mut grouped: BTreeMap<DatastoreType, Vec<Arc<ClusterDefinition>>> = BTreeMap::new();
        for cluster in clusters {
            grouped
                .entry(cluster.datastore_type)
                .or_default()
                .push(Arc::clone(cluster));
        }
        Self {
            clusters: grouped,
            environments: Arc::clone(&self.environments),
            regions: Arc::clone(&self.regions),
        }
    }
}

// ── Shared state ─────────────────────────────────────────────────────

/// State shared between a [`DiscoveryService`](super::DiscoveryService),
/// its sink, and any number of readers.
pub(crate) struct Shared {
    pub(crate) snapshot: ArcSwap<DiscoverySnapshot>,
    pub(crate) event_tx: broadcast::Sender<DiscoveryEvent>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            snapshot: ArcSwap::from_pointee(DiscoverySnapshot::default()),
            event_tx,
        }
    }

    /// Fold an event into the current snapshot.
    pub(crate) fn apply(&self, event: &DiscoveryEvent) {
        match event {
            DiscoveryEvent::LoadedClusters(clusters) => {
                self.snapshot.rcu(|current| current.with_clusters(clusters));
            }
            DiscoveryEvent::LoadedEnvironments(environments) => {
                self.snapshot.rcu(|current| DiscoverySnapshot {
                    environments: Arc::clone(environments),
                    ..DiscoverySnapshot::clone(current)
                });
            }
            DiscoveryEvent::LoadedRegions(regions) => {
                self.snapshot.rcu(|current| DiscoverySnapshot {
                    regions: Arc::clone(regions),
                    ..DiscoverySnapshot::clone(current)
                });
            }
            DiscoveryEvent::Error(_) => {}
        }
    }
}

// ── Reader ───────────────────────────────────────────────────────────

/// Read-only handle on the current snapshot.
#[derive(Clone)]
pub struct DiscoveryReader {
    shared: Arc<Shared>,
}

impl DiscoveryReader {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// The current snapshot (cheap `Arc` clone).
    pub fn load(&self) -> Arc<DiscoverySnapshot> {
        self.shared.snapshot.load_full()
    }

    /// Subscribe to discovery events.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.shared.event_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::tests::cluster;

    #[test]
    fn clusters_are_grouped_by_type() {
        let shared = Shared::new();
        let clusters = vec![
            Arc::new(cluster(DatastoreType::Cassandra, "orders", "us-east-1", "test", &["c1"])),
            Arc::new(cluster(DatastoreType::Redis, "sessions", "us-east-1", "test", &["r1"])),
            Arc::new(cluster(DatastoreType::Cassandra, "users", "us-east-1", "test", &["c2"])),
        ];
        shared.apply(&DiscoveryEvent::LoadedClusters(Arc::new(clusters)));

        let snap = shared.snapshot.load();
        assert_eq!(snap.clusters(DatastoreType::Cassandra).len(), 2);
        assert_eq!(snap.clusters(DatastoreType::Redis).len(), 1);
        assert_eq!(snap.cluster_count(), 3);
    }

    #[test]
    fn cluster_refresh_keeps_environments() {
        let shared = Shared::new();
        shared.apply(&DiscoveryEvent::LoadedEnvironments(Arc::new(vec!["test".into()])));
        shared.apply(&DiscoveryEvent::LoadedClusters(Arc::new(Vec::new())));

        assert_eq!(shared.snapshot.load().environments(), ["test".to_string()]);
    }

    #[test]
    fn find_matches_every_key_component() {
        let shared = Shared::new();
        let clusters = vec![Arc::new(cluster(
            DatastoreType::Cassandra,
            "orders",
            "us-east-1",
            "test",
            &["c1"],
        ))];
        shared.apply(&DiscoveryEvent::LoadedClusters(Arc::new(clusters)));
        let snap = shared.snapshot.load();

        let hit = ClusterKey::new(DatastoreType::Cassandra, "orders", "us-east-1", "test");
        let wrong_env = ClusterKey::new(DatastoreType::Cassandra, "orders", "us-east-1", "prod");
        let wrong_type = ClusterKey::new(DatastoreType::Redis, "orders", "us-east-1", "test");
        assert!(snap.find(&hit).is_some());
        assert!(snap.find(&wrong_env).is_none());
        assert!(snap.find(&wrong_type).is_none());
        assert!(
            snap.find_cluster(DatastoreType::Cassandra, "orders", "us-east-1", "test")
                .is_some()
        );
        assert!(
            snap.find_cluster(DatastoreType::Cassandra, "orders", "eu-west-1", "test")
                .is_none()
        );
    }
}
