// ── Environment-variable discovery ──
//
// Process environment is fixed for the lifetime of the process, so the
// topology is read once on start and emitted once from a spawned task.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{
    ClusterSchema, DiscoveryProvider, DiscoverySink, emit_topology, parse_cluster_document,
    split_list,
};
use crate::config::DiscoveryConfig;
use crate::error::CoreError;

type Lookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Reads a JSON cluster list from an environment variable.
pub struct EnvironmentDiscoveryProvider {
    clusters_var: String,
    environments_var: String,
    regions_var: String,
    lookup: Box<Lookup>,
}

impl EnvironmentDiscoveryProvider {
    /// Read from the process environment.
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::with_lookup(config, |name| std::env::var(name).ok())
    }

    /// Read through a custom lookup (e.g. a fixed map in tests).
    pub fn with_lookup<F>(config: &DiscoveryConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            clusters_var: config.clusters_var.clone(),
            environments_var: config.environments_var.clone(),
            regions_var: config.regions_var.clone(),
            lookup: Box::new(lookup),
        }
    }

    fn list_override(&self, name: &str) -> Option<Vec<String>> {
        (self.lookup)(name)
            .map(|raw| split_list(&raw))
            .filter(|values| !values.is_empty())
    }
}

#[async_trait]
impl DiscoveryProvider for EnvironmentDiscoveryProvider {
    fn name(&self) -> &'static str {
        "environment"
    }

    async fn start(&self, sink: DiscoverySink) -> Result<(), CoreError> {
        let raw = (self.lookup)(&self.clusters_var).ok_or_else(|| {
            CoreError::config(format!(
                "environment variable {} must hold the cluster list",
                self.clusters_var
            ))
        })?;

        let schema = ClusterSchema::load()?;
        let clusters = parse_cluster_document(&schema, &raw)?;
        let environments = self.list_override(&self.environments_var);
        let regions = self.list_override(&self.regions_var);
        info!(
            clusters = clusters.len(),
            var = %self.clusters_var,
            "loaded topology from environment"
        );

        tokio::spawn(async move {
            emit_topology(&sink, clusters, environments, regions);
            debug!("environment topology emitted");
        });
        Ok(())
    }
}
