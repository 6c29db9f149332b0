// ── Runtime configuration ──
//
// These types describe which providers to run and how to tune them.
// They never touch disk: `fleetscope-config` (or a test) builds a
// `FleetConfig` and hands it in. Provider names are resolved by the
// registries in `discovery`, `access` and `groups`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::model::ClusterDefinition;

/// Top-level configuration for a [`FleetContext`](crate::FleetContext).
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Environment this process serves (e.g. `"test"`).
    pub environment: Option<String>,
    /// Region this process runs in (e.g. `"us-east-1"`).
    pub region: Option<String>,
    pub discovery: DiscoveryConfig,
    pub access_control: AccessControlConfig,
    pub user_groups: UserGroupConfig,
    /// Timeout applied to every backend HTTP request.
    pub http_timeout: Duration,
    /// Extra PEM CA certificate trusted by the HTTP backends.
    pub http_ca_cert: Option<PathBuf>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            environment: None,
            region: None,
            discovery: DiscoveryConfig::default(),
            access_control: AccessControlConfig::default(),
            user_groups: UserGroupConfig::default(),
            http_timeout: Duration::from_secs(10),
            http_ca_cert: None,
        }
    }
}

/// Discovery provider selection and settings.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// `environment`, `filesystem`, or `static`.
    pub provider: String,
    /// Cluster file watched by the `filesystem` provider.
    pub path: Option<PathBuf>,
    /// Quiet period before a burst of file events triggers a reload.
    pub debounce: Duration,
    /// Variable holding the JSON cluster list for the `environment` provider.
    pub clusters_var: String,
    /// Optional comma-separated environment override.
    pub environments_var: String,
    /// Optional comma-separated region override.
    pub regions_var: String,
    /// Cluster list served by the `static` provider.
    pub clusters: Vec<ClusterDefinition>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            provider: "environment".into(),
            path: None,
            debounce: Duration::from_millis(500),
            clusters_var: "FLEETSCOPE_CLUSTERS".into(),
            environments_var: "FLEETSCOPE_ENVIRONMENTS".into(),
            regions_var: "FLEETSCOPE_REGIONS".into(),
            clusters: Vec::new(),
        }
    }
}

/// Cluster ownership poller settings.
#[derive(Debug, Clone)]
pub struct AccessControlConfig {
    /// When `false`, the poller publishes one empty map and never polls.
    pub enabled: bool,
    /// `http`, `static`, or `default`.
    pub provider: String,
    pub poll_interval: Duration,
    pub error_poll_interval: Duration,
    /// Base URL of the ownership backend (`http` provider).
    pub endpoint: Option<Url>,
    /// Ownership table served by the `static` provider.
    pub owners: HashMap<String, Vec<String>>,
    /// Environments the backend knows about.
    pub environments: Vec<String>,
    /// Regions the backend knows about.
    pub regions: Vec<String>,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "default".into(),
            poll_interval: Duration::from_secs(60),
            error_poll_interval: Duration::from_secs(30),
            endpoint: None,
            owners: HashMap::new(),
            environments: Vec::new(),
            regions: Vec::new(),
        }
    }
}

/// User → group lookup settings.
#[derive(Debug, Clone)]
pub struct UserGroupConfig {
    /// `http`, `static`, or `none`.
    pub provider: String,
    /// Maximum number of cached users.
    pub capacity: usize,
    /// Absolute lifetime of a cached entry.
    pub ttl: Duration,
    /// Base URL of the group-membership backend (`http` provider).
    pub endpoint: Option<Url>,
    /// Memberships served by the `static` provider.
    pub groups: HashMap<String, Vec<String>>,
}

impl Default for UserGroupConfig {
    fn default() -> Self {
        Self {
            provider: "none".into(),
            capacity: 50,
            ttl: Duration::from_secs(60 * 60),
            endpoint: None,
            groups: HashMap::new(),
        }
    }
}
