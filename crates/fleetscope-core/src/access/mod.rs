// ── Cluster access control ──
//
// A poller keeps the cluster ownership map current. Providers only know
// how to fetch the map once; scheduling, retention on failure and event
// delivery live in `ClusterAccessControlService`.

mod providers;
mod service;

use std::sync::Arc;

use async_trait::async_trait;

pub use providers::{
    DefaultAccessControlProvider, HttpAccessControlProvider, StaticAccessControlProvider,
    provider_from_config,
};
pub use service::{AccessControlReader, ClusterAccessControlService};

use crate::error::CoreError;
use crate::model::ClusterAccessControlMap;

/// Events broadcast by the [`ClusterAccessControlService`].
#[derive(Debug, Clone)]
pub enum AccessControlEvent {
    Loaded(Arc<ClusterAccessControlMap>),
    Error(Arc<CoreError>),
}

/// What a provider knows about the deployment it serves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlMetadata {
    pub environments: Vec<String>,
    pub regions: Vec<String>,
    pub current_environment: Option<String>,
    pub current_region: Option<String>,
}

/// Filters passed to one ownership fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclRequestOptions {
    pub env: Option<String>,
    pub region: Option<String>,
}

/// A source of cluster ownership data.
#[async_trait]
pub trait ClusterAccessControlProvider: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn metadata(&self) -> &AccessControlMetadata;

    /// Fetch the complete ownership map once.
    async fn get_cluster_access_control(
        &self,
        options: &AclRequestOptions,
    ) -> Result<ClusterAccessControlMap, CoreError>;
}
