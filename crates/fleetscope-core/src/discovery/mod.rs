// ── Cluster discovery ──
//
// Pluggable topology sources feeding a single `DiscoveryService`.
// Providers push `DiscoveryEvent`s into a `DiscoverySink`; the sink swaps
// the current snapshot and re-broadcasts the event unchanged.

mod environment;
mod filesystem;
mod fixed;
mod schema;
mod service;
mod snapshot;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

pub use environment::EnvironmentDiscoveryProvider;
pub use filesystem::{FileSystemDiscoveryProvider, WatchState};
pub use fixed::StaticDiscoveryProvider;
pub use schema::{ClusterSchema, parse_cluster_document};
pub use service::DiscoveryService;
pub use snapshot::{DiscoveryReader, DiscoverySnapshot};

use crate::config::DiscoveryConfig;
use crate::error::CoreError;
use crate::model::ClusterDefinition;

// ── Events ───────────────────────────────────────────────────────────

/// Lifecycle events re-emitted by the [`DiscoveryService`].
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    LoadedClusters(Arc<Vec<Arc<ClusterDefinition>>>),
    LoadedEnvironments(Arc<Vec<String>>),
    LoadedRegions(Arc<Vec<String>>),
    Error(Arc<CoreError>),
}

// ── Provider capability ──────────────────────────────────────────────

/// A source of cluster topology.
///
/// `start` may emit synchronously, once from a spawned task, or
/// repeatedly for as long as the process lives.
#[async_trait]
pub trait DiscoveryProvider: Send + Sync + 'static {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// Begin producing topology into `sink`.
    async fn start(&self, sink: DiscoverySink) -> Result<(), CoreError>;
}

// ── Sink ─────────────────────────────────────────────────────────────

/// Write end handed to a provider on start.
///
/// Every emission updates the current snapshot before it is broadcast,
/// so a subscriber reacting to an event always reads matching state.
#[derive(Clone)]
pub struct DiscoverySink {
    shared: Arc<snapshot::Shared>,
}

impl DiscoverySink {
    pub(crate) fn new(shared: Arc<snapshot::Shared>) -> Self {
        Self { shared }
    }

    /// Apply and broadcast one event.
    pub fn emit(&self, event: DiscoveryEvent) {
        self.shared.apply(&event);
        // No receivers is fine: the snapshot is still current.
        let _ = self.shared.event_tx.send(event);
    }

    pub fn clusters(&self, clusters: Vec<ClusterDefinition>) {
        let clusters = clusters.into_iter().map(Arc::new).collect();
        self.emit(DiscoveryEvent::LoadedClusters(Arc::new(clusters)));
    }

    pub fn environments(&self, environments: Vec<String>) {
        self.emit(DiscoveryEvent::LoadedEnvironments(Arc::new(environments)));
    }

    pub fn regions(&self, regions: Vec<String>) {
        self.emit(DiscoveryEvent::LoadedRegions(Arc::new(regions)));
    }

    pub fn error(&self, error: CoreError) {
        self.emit(DiscoveryEvent::Error(Arc::new(error)));
    }
}

/// Emit clusters followed by environments and regions.
///
/// Missing overrides are derived from the cluster list (sorted, unique).
pub(crate) fn emit_topology(
    sink: &DiscoverySink,
    clusters: Vec<ClusterDefinition>,
    environments: Option<Vec<String>>,
    regions: Option<Vec<String>>,
) {
    let environments = environments.unwrap_or_else(|| {
        unique(clusters.iter().map(|c| c.env.as_str()))
    });
    let regions = regions.unwrap_or_else(|| unique(clusters.iter().map(|c| c.region.as_str())));

    sink.clusters(clusters);
    sink.environments(environments);
    sink.regions(regions);
}

fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Split a comma-separated override, dropping blanks.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

// ── Registry ─────────────────────────────────────────────────────────

/// Resolve the configured provider name to an implementation.
pub fn provider_from_config(
    config: &DiscoveryConfig,
) -> Result<Arc<dyn DiscoveryProvider>, CoreError> {
    match config.provider.as_str() {
        "environment" | "env" => Ok(Arc::new(EnvironmentDiscoveryProvider::from_config(config))),
        "filesystem" | "file" => {
            let path = config.path.clone().ok_or_else(|| {
                CoreError::config("discovery.path is required by the filesystem provider")
            })?;
            Ok(Arc::new(
                FileSystemDiscoveryProvider::new(path).with_debounce(config.debounce),
            ))
        }
        "static" | "local" => Ok(Arc::new(StaticDiscoveryProvider::new(
            config.clusters.clone(),
        ))),
        "" => Err(CoreError::config("no discovery provider configured")),
        other => Err(CoreError::UnknownProvider {
            kind: "discovery",
            name: other.into(),
        }),
    }
}
