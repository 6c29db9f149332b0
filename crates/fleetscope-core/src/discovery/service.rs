// ── Discovery service ──
//
// Façade over exactly one provider. Adds no buffering or deduplication:
// every provider emission becomes exactly one broadcast.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::snapshot::Shared;
use super::{
    DiscoveryEvent, DiscoveryProvider, DiscoveryReader, DiscoverySink, DiscoverySnapshot,
    provider_from_config,
};
use crate::config::DiscoveryConfig;
use crate::error::CoreError;

/// Owns the current [`DiscoverySnapshot`] and re-emits provider events.
pub struct DiscoveryService {
    provider: Arc<dyn DiscoveryProvider>,
    shared: Arc<Shared>,
    started: AtomicBool,
}

impl DiscoveryService {
    pub fn new(provider: Arc<dyn DiscoveryProvider>) -> Self {
        Self {
            provider,
            shared: Arc::new(Shared::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Build the service around the provider named in `config`.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, CoreError> {
        provider_from_config(config).map(Self::new)
    }

    /// Start the provider. Subsequent calls are no-ops.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!(provider = self.provider.name(), "discovery already started");
            return Ok(());
        }

        info!(provider = self.provider.name(), "starting discovery");
        let sink = DiscoverySink::new(Arc::clone(&self.shared));
        if let Err(e) = self.provider.start(sink).await {
            self.started.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Subscribe to discovery events. Subscribe before [`start`](Self::start)
    /// to observe synchronous providers.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.shared.event_tx.subscribe()
    }

    /// The current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<DiscoverySnapshot> {
        self.shared.snapshot.load_full()
    }

    /// A read-only handle for other components.
    pub fn reader(&self) -> DiscoveryReader {
        DiscoveryReader::new(Arc::clone(&self.shared))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::discovery::tests::cluster;
    use crate::model::DatastoreType;

    /// Emits the same cluster list twice to prove nothing is deduplicated.
    struct Repeating;

    #[async_trait]
    impl DiscoveryProvider for Repeating {
        fn name(&self) -> &'static str {
            "repeating"
        }

        async fn start(&self, sink: DiscoverySink) -> Result<(), CoreError> {
            let clusters = vec![cluster(DatastoreType::Redis, "sessions", "us-east-1", "test", &["r1"])];
            sink.clusters(clusters.clone());
            sink.clusters(clusters);
            sink.error(CoreError::config("boom"));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl DiscoveryProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn start(&self, _sink: DiscoverySink) -> Result<(), CoreError> {
            Err(CoreError::config("missing source"))
        }
    }

    #[tokio::test]
    async fn re_emits_every_event_in_order() {
        let service = DiscoveryService::new(Arc::new(Repeating));
        let mut rx = service.subscribe();
        service.start().await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), DiscoveryEvent::LoadedClusters(_)));
        assert!(matches!(rx.recv().await.unwrap(), DiscoveryEvent::LoadedClusters(_)));
        assert!(matches!(rx.recv().await.unwrap(), DiscoveryEvent::Error(_)));
        assert!(rx.try_recv().is_err());
        assert_eq!(service.snapshot().clusters(DatastoreType::Redis).len(), 1);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let service = DiscoveryService::new(Arc::new(Repeating));
        let mut rx = service.subscribe();
        service.start().await.unwrap();
        service.start().await.unwrap();

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn provider_start_failure_propagates() {
        let service = DiscoveryService::new(Arc::new(Failing));
        let err = service.start().await.unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
        assert_eq!(service.snapshot().cluster_count(), 0);
    }

    #[test]
    fn from_config_rejects_unknown_provider() {
        let config = DiscoveryConfig {
            provider: "consul".into(),
            ..DiscoveryConfig::default()
        };
        assert!(DiscoveryService::from_config(&config).is_err());
    }
}
