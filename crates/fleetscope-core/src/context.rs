// ── Fleet context ──
//
// Process-scoped owner of every service. Built once at startup from a
// `FleetConfig`, started once, and handed to request handlers by clone.
// Discovery changes are forwarded to the explorer cache by a background
// task owned here.

use std::sync::Arc;

use fleetscope_api::TransportConfig;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::access::ClusterAccessControlService;
use crate::config::FleetConfig;
use crate::discovery::{DiscoveryEvent, DiscoveryService};
use crate::error::CoreError;
use crate::explorer::ExplorerCache;
use crate::groups::UserGroupCache;

/// Shared handle on the running services.
///
/// Cheaply cloneable via `Arc<ContextInner>`.
#[derive(Clone)]
pub struct FleetContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    config: FleetConfig,
    discovery: DiscoveryService,
    access: ClusterAccessControlService,
    user_groups: UserGroupCache,
    explorers: ExplorerCache,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl FleetContext {
    /// Build every service from configuration. Does not start anything.
    pub fn new(config: FleetConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.http_timeout,
            ca_cert: config.http_ca_cert.clone(),
        };
        let discovery = DiscoveryService::from_config(&config.discovery)?;
        let access = ClusterAccessControlService::from_config(&config, &transport)?;
        let user_groups = UserGroupCache::from_config(&config.user_groups, &transport)?;
        Ok(Self::from_parts(config, discovery, access, user_groups))
    }

    /// Assemble a context from already-built services.
    pub fn from_parts(
        config: FleetConfig,
        discovery: DiscoveryService,
        access: ClusterAccessControlService,
        user_groups: UserGroupCache,
    ) -> Self {
        let explorers = ExplorerCache::new(discovery.reader()).with_access_control(access.reader());
        Self {
            inner: Arc::new(ContextInner {
                config,
                discovery,
                access,
                user_groups,
                explorers,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &FleetConfig {
        &self.inner.config
    }

    pub fn discovery(&self) -> &DiscoveryService {
        &self.inner.discovery
    }

    pub fn access_control(&self) -> &ClusterAccessControlService {
        &self.inner.access
    }

    pub fn user_groups(&self) -> &UserGroupCache {
        &self.inner.user_groups
    }

    pub fn explorers(&self) -> &ExplorerCache {
        &self.inner.explorers
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start discovery and the ownership poller.
    ///
    /// Discovery failures at this point are fatal; so is a missing
    /// access-control provider.
    pub async fn start(&self) -> Result<(), CoreError> {
        // Subscribe first so synchronous providers are observed.
        let rx = self.inner.discovery.subscribe();
        let handle = tokio::spawn(topology_task(
            self.clone(),
            rx,
            self.inner.cancel.child_token(),
        ));
        self.inner.task_handles.lock().await.push(handle);

        self.inner.discovery.start().await?;
        self.inner.access.start().await?;
        info!(
            discovery = self.inner.discovery.provider_name(),
            clusters = self.inner.discovery.snapshot().cluster_count(),
            "fleet context started"
        );
        Ok(())
    }

    /// Stop background work and close every explorer.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.access.shutdown().await;
        self.inner.explorers.shutdown().await;
        info!("fleet context stopped");
    }
}

/// Retire explorers whenever discovery publishes a new cluster list.
async fn topology_task(
    ctx: FleetContext,
    mut rx: broadcast::Receiver<DiscoveryEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Ok(DiscoveryEvent::LoadedClusters(_)) => {
                    let snapshot = ctx.inner.discovery.snapshot();
                    let retired = ctx.inner.explorers.reconcile(&snapshot).await;
                    debug!(retired, clusters = snapshot.cluster_count(), "topology applied");
                }
                Ok(DiscoveryEvent::Error(e)) => {
                    warn!(error = %e, "discovery reported an error; keeping current topology");
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "topology task lagged; reconciling against latest snapshot");
                    let snapshot = ctx.inner.discovery.snapshot();
                    ctx.inner.explorers.reconcile(&snapshot).await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use secrecy::SecretString;

    use super::*;
    use crate::config::{AccessControlConfig, DiscoveryConfig, UserGroupConfig};
    use crate::discovery::tests::{Manual, cluster};
    use crate::discovery::DiscoveryProvider;
    use crate::explorer::Explorer;
    use crate::groups::StaticUserGroupProvider;
    use crate::model::{ClusterKey, DatastoreType};

    #[derive(Default)]
    struct Closable {
        closed: AtomicBool,
    }

    #[async_trait]
    impl Explorer for Closable {
        fn as_any(&self) -> &dyn Any {
            self
        }

        async fn shutdown(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn static_config() -> FleetConfig {
        FleetConfig {
            discovery: DiscoveryConfig {
                provider: "static".into(),
                clusters: vec![cluster(DatastoreType::Redis, "sessions", "us-east-1", "test", &["r1"])],
                ..DiscoveryConfig::default()
            },
            access_control: AccessControlConfig {
                provider: "static".into(),
                owners: [("sessions".to_owned(), vec!["web".to_owned()])].into(),
                ..AccessControlConfig::default()
            },
            user_groups: UserGroupConfig {
                provider: "static".into(),
                groups: [("ada@example.com".to_owned(), vec!["web".to_owned()])].into(),
                ..UserGroupConfig::default()
            },
            ..FleetConfig::default()
        }
    }

    #[tokio::test]
    async fn builds_and_starts_from_config() {
        let ctx = FleetContext::new(static_config()).unwrap();
        ctx.start().await.unwrap();

        assert_eq!(ctx.discovery().snapshot().cluster_count(), 1);
        assert!(ctx.access_control().is_authorized("sessions", &["web"]));

        let token = SecretString::from("t".to_owned());
        let groups = ctx.user_groups().get_user_groups("ada@example.com", &token).await;
        let key = ClusterKey::new(DatastoreType::Redis, "sessions", "us-east-1", "test");
        let explorer = ctx
            .explorers()
            .get_authorized_explorer(&groups, &key, |_| async {
                Ok(Arc::new(Closable::default()) as Arc<dyn Explorer>)
            })
            .await
            .unwrap();

        ctx.shutdown().await;
        let closable = explorer.as_any().downcast_ref::<Closable>().unwrap();
        assert!(closable.closed.load(Ordering::SeqCst));
        assert!(ctx.explorers().is_empty());
    }

    #[tokio::test]
    async fn topology_change_retires_explorers() {
        let provider = Manual::new(vec![cluster(
            DatastoreType::Cassandra,
            "orders",
            "us-east-1",
            "test",
            &["c1"],
        )]);
        let config = FleetConfig::default();
        let discovery = DiscoveryService::new(Arc::clone(&provider) as Arc<dyn DiscoveryProvider>);
        let access = ClusterAccessControlService::new(&AccessControlConfig {
            enabled: false,
            ..AccessControlConfig::default()
        });
        let groups = UserGroupCache::new(
            Arc::new(StaticUserGroupProvider::new(HashMap::new())),
            10,
            Duration::from_secs(60),
        )
        .unwrap();
        let ctx = FleetContext::from_parts(config, discovery, access, groups);
        ctx.start().await.unwrap();

        let key = ClusterKey::new(DatastoreType::Cassandra, "orders", "us-east-1", "test");
        let explorer = ctx
            .explorers()
            .get_explorer(&key, |_| async {
                Ok(Arc::new(Closable::default()) as Arc<dyn Explorer>)
            })
            .await
            .unwrap();

        provider.push(Vec::new());
        let closable = explorer.as_any().downcast_ref::<Closable>().unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while !closable.closed.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(ctx.explorers().is_empty());
        ctx.shutdown().await;
    }

    #[test]
    fn unknown_discovery_provider_fails_construction() {
        let mut config = static_config();
        config.discovery.provider = "consul".into();
        assert!(matches!(
            FleetContext::new(config).err().unwrap(),
            CoreError::UnknownProvider { kind: "discovery", .. }
        ));
    }
}
