// ── Access-control providers ──

use std::sync::Arc;

use async_trait::async_trait;
use fleetscope_api::{BackendClient, TransportConfig};
use tracing::debug;

use super::{AccessControlMetadata, AclRequestOptions, ClusterAccessControlProvider};
use crate::config::FleetConfig;
use crate::error::CoreError;
use crate::model::ClusterAccessControlMap;

// ── HTTP ─────────────────────────────────────────────────────────────

/// Fetches ownership from the HTTP ownership backend.
pub struct HttpAccessControlProvider {
    client: BackendClient,
    metadata: AccessControlMetadata,
}

impl HttpAccessControlProvider {
    pub fn new(client: BackendClient, metadata: AccessControlMetadata) -> Self {
        Self { client, metadata }
    }
}

#[async_trait]
impl ClusterAccessControlProvider for HttpAccessControlProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    fn metadata(&self) -> &AccessControlMetadata {
        &self.metadata
    }

    async fn get_cluster_access_control(
        &self,
        options: &AclRequestOptions,
    ) -> Result<ClusterAccessControlMap, CoreError> {
        let owners = self
            .client
            .cluster_access(options.env.as_deref(), options.region.as_deref())
            .await?;
        debug!(clusters = owners.len(), "fetched cluster ownership");
        Ok(owners.into_iter().collect())
    }
}

// ── Static ───────────────────────────────────────────────────────────

/// Serves a fixed ownership map.
pub struct StaticAccessControlProvider {
    map: ClusterAccessControlMap,
    metadata: AccessControlMetadata,
}

impl StaticAccessControlProvider {
    pub fn new(map: ClusterAccessControlMap, metadata: AccessControlMetadata) -> Self {
        Self { map, metadata }
    }
}

#[async_trait]
impl ClusterAccessControlProvider for StaticAccessControlProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    fn metadata(&self) -> &AccessControlMetadata {
        &self.metadata
    }

    async fn get_cluster_access_control(
        &self,
        _options: &AclRequestOptions,
    ) -> Result<ClusterAccessControlMap, CoreError> {
        Ok(self.map.clone())
    }
}

// ── Default ──────────────────────────────────────────────────────────

/// Knows no owners, leaving every cluster open.
#[derive(Default)]
pub struct DefaultAccessControlProvider {
    metadata: AccessControlMetadata,
}

impl DefaultAccessControlProvider {
    pub fn new(metadata: AccessControlMetadata) -> Self {
        Self { metadata }
    }
}

#[async_trait]
impl ClusterAccessControlProvider for DefaultAccessControlProvider {
    fn name(&self) -> &'static str {
        "default"
    }

    fn metadata(&self) -> &AccessControlMetadata {
        &self.metadata
    }

    async fn get_cluster_access_control(
        &self,
        _options: &AclRequestOptions,
    ) -> Result<ClusterAccessControlMap, CoreError> {
        Ok(ClusterAccessControlMap::new())
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// Resolve `access_control.provider` to an implementation.
pub fn provider_from_config(
    config: &FleetConfig,
    transport: &TransportConfig,
) -> Result<Arc<dyn ClusterAccessControlProvider>, CoreError> {
    let acl = &config.access_control;
    let metadata = AccessControlMetadata {
        environments: acl.environments.clone(),
        regions: acl.regions.clone(),
        current_environment: config.environment.clone(),
        current_region: config.region.clone(),
    };

    match acl.provider.as_str() {
        "http" => {
            let endpoint = acl.endpoint.clone().ok_or_else(|| {
                CoreError::config("access_control.endpoint is required by the http provider")
            })?;
            let client = BackendClient::new(endpoint, transport)?;
            Ok(Arc::new(HttpAccessControlProvider::new(client, metadata)))
        }
        "static" => {
            let map = acl
                .owners
                .iter()
                .map(|(cluster, groups)| (cluster.clone(), groups.clone()))
                .collect();
            Ok(Arc::new(StaticAccessControlProvider::new(map, metadata)))
        }
        "default" => Ok(Arc::new(DefaultAccessControlProvider::new(metadata))),
        "" => Err(CoreError::config("no access-control provider configured")),
        other => Err(CoreError::UnknownProvider {
            kind: "access-control",
            name: other.into(),
        }),
    }
}
