// ── Static discovery ──

use async_trait::async_trait;
use tracing::debug;

use super::{DiscoveryProvider, DiscoverySink, emit_topology};
use crate::error::CoreError;
use crate::model::ClusterDefinition;

/// Serves a fixed cluster list, emitting it synchronously on start.
///
/// Used for local development and tests.
pub struct StaticDiscoveryProvider {
    clusters: Vec<ClusterDefinition>,
}

impl StaticDiscoveryProvider {
    pub fn new(clusters: Vec<ClusterDefinition>) -> Self {
        Self { clusters }
    }
}

#[async_trait]
impl DiscoveryProvider for StaticDiscoveryProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn start(&self, sink: DiscoverySink) -> Result<(), CoreError> {
        debug!(clusters = self.clusters.len(), "serving static topology");
        emit_topology(&sink, self.clusters.clone(), None, None);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::discovery::tests::cluster;
    use crate::discovery::{DiscoveryEvent, DiscoveryService};
    use crate::model::DatastoreType;

    #[tokio::test]
    async fn emits_clusters_then_derived_environments_and_regions() {
        let provider = StaticDiscoveryProvider::new(vec![
            cluster(DatastoreType::Cassandra, "orders", "us-west-2", "prod", &["c1"]),
            cluster(DatastoreType::Redis, "sessions", "us-east-1", "test", &["r1"]),
            cluster(DatastoreType::Redis, "carts", "us-east-1", "prod", &["r2"]),
        ]);
        let service = DiscoveryService::new(Arc::new(provider));
        let mut rx = service.subscribe();
        service.start().await.unwrap();

        match rx.recv().await.unwrap() {
            DiscoveryEvent::LoadedClusters(c) => assert_eq!(c.len(), 3),
            other => panic!("unexpected event {other:?}"),
        }
        match rx.recv().await.unwrap() {
            DiscoveryEvent::LoadedEnvironments(e) => assert_eq!(*e, vec!["prod", "test"]),
            other => panic!("unexpected event {other:?}"),
        }
        match rx.recv().await.unwrap() {
            DiscoveryEvent::LoadedRegions(r) => assert_eq!(*r, vec!["us-east-1", "us-west-2"]),
            other => panic!("unexpected event {other:?}"),
        }

        let snap = service.snapshot();
        assert_eq!(snap.environments(), ["prod", "test"]);
        assert_eq!(snap.clusters(DatastoreType::Redis).len(), 2);
    }
}
