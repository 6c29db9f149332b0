//! Configuration for fleetscope.
//!
//! A TOML file (platform config dir, or an explicit path) merged with
//! `FLEETSCOPE_`-prefixed environment variables, validated, and
//! translated into `fleetscope_core::FleetConfig`. Nested keys use a
//! double underscore: `FLEETSCOPE_ACCESS_CONTROL__POLL_INTERVAL=2m`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use fleetscope_core::{
    AccessControlConfig, ClusterDefinition, DiscoveryConfig, FleetConfig, UserGroupConfig,
};

pub const ENV_PREFIX: &str = "FLEETSCOPE_";

const DISCOVERY_PROVIDERS: &[&str] = &["environment", "env", "filesystem", "file", "static", "local"];
const ACCESS_CONTROL_PROVIDERS: &[&str] = &["http", "static", "default"];
const USER_GROUP_PROVIDERS: &[&str] = &["http", "static", "none"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Environment this process serves.
    pub environment: Option<String>,

    /// Region this process runs in.
    pub region: Option<String>,

    pub discovery: DiscoverySection,
    pub access_control: AccessControlSection,
    pub user_groups: UserGroupSection,
    pub http: HttpSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// "environment", "filesystem", or "static".
    pub provider: String,

    /// Cluster file for the filesystem provider.
    pub path: Option<PathBuf>,

    /// Quiet period for file change bursts (e.g. "500ms").
    pub debounce: String,

    pub clusters_var: String,
    pub environments_var: String,
    pub regions_var: String,

    /// Clusters for the static provider.
    pub clusters: Vec<ClusterDefinition>,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        let core = DiscoveryConfig::default();
        Self {
            provider: core.provider,
            path: None,
            debounce: "500ms".into(),
            clusters_var: core.clusters_var,
            environments_var: core.environments_var,
            regions_var: core.regions_var,
            clusters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessControlSection {
    pub enabled: bool,

    /// "http", "static", or "default".
    pub provider: String,

    pub poll_interval: String,
    pub error_poll_interval: String,

    /// Ownership backend base URL.
    pub endpoint: Option<String>,

    /// Cluster → owning groups, for the static provider.
    pub owners: HashMap<String, Vec<String>>,

    pub environments: Vec<String>,
    pub regions: Vec<String>,
}

impl Default for AccessControlSection {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "default".into(),
            poll_interval: "60s".into(),
            error_poll_interval: "30s".into(),
            endpoint: None,
            owners: HashMap::new(),
            environments: Vec::new(),
            regions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UserGroupSection {
    /// "http", "static", or "none".
    pub provider: String,

    pub capacity: usize,
    pub ttl: String,

    /// Group-membership backend base URL.
    pub endpoint: Option<String>,

    /// User email → groups, for the static provider.
    pub groups: HashMap<String, Vec<String>>,
}

impl Default for UserGroupSection {
    fn default() -> Self {
        Self {
            provider: "none".into(),
            capacity: 50,
            ttl: "1h".into(),
            endpoint: None,
            groups: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout: String,

    /// PEM CA certificate for backends behind a private CA.
    pub ca_cert: Option<PathBuf>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout: "10s".into(),
            ca_cert: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "fleetscope", "fleetscope").map_or_else(
        || PathBuf::from(".fleetscope").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, the TOML file, and environment.
///
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

impl Config {
    /// Render as TOML, e.g. for `config show`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate and translate into the core's runtime configuration.
    pub fn to_fleet_config(&self) -> Result<FleetConfig, ConfigError> {
        let d = &self.discovery;
        check_provider("discovery.provider", &d.provider, DISCOVERY_PROVIDERS)?;
        if matches!(d.provider.as_str(), "filesystem" | "file") && d.path.is_none() {
            return Err(ConfigError::invalid(
                "discovery.path",
                "required by the filesystem provider",
            ));
        }
        let discovery = DiscoveryConfig {
            provider: d.provider.clone(),
            path: d.path.clone(),
            debounce: parse_duration("discovery.debounce", &d.debounce)?,
            clusters_var: d.clusters_var.clone(),
            environments_var: d.environments_var.clone(),
            regions_var: d.regions_var.clone(),
            clusters: d.clusters.clone(),
        };

        let a = &self.access_control;
        check_provider("access_control.provider", &a.provider, ACCESS_CONTROL_PROVIDERS)?;
        let access_control = AccessControlConfig {
            enabled: a.enabled,
            provider: a.provider.clone(),
            poll_interval: parse_duration("access_control.poll_interval", &a.poll_interval)?,
            error_poll_interval: parse_duration(
                "access_control.error_poll_interval",
                &a.error_poll_interval,
            )?,
            endpoint: parse_endpoint("access_control.endpoint", a.endpoint.as_deref())?,
            owners: a.owners.clone(),
            environments: a.environments.clone(),
            regions: a.regions.clone(),
        };

        let g = &self.user_groups;
        check_provider("user_groups.provider", &g.provider, USER_GROUP_PROVIDERS)?;
        if g.capacity == 0 {
            return Err(ConfigError::invalid("user_groups.capacity", "must be at least 1"));
        }
        let user_groups = UserGroupConfig {
            provider: g.provider.clone(),
            capacity: g.capacity,
            ttl: parse_duration("user_groups.ttl", &g.ttl)?,
            endpoint: parse_endpoint("user_groups.endpoint", g.endpoint.as_deref())?,
            groups: g.groups.clone(),
        };

        Ok(FleetConfig {
            environment: self.environment.clone(),
            region: self.region.clone(),
            discovery,
            access_control,
            user_groups,
            http_timeout: parse_duration("http.timeout", &self.http.timeout)?,
            http_ca_cert: self.http.ca_cert.clone(),
        })
    }
}

fn check_provider(field: &str, name: &str, known: &[&str]) -> Result<(), ConfigError> {
    if known.contains(&name) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("unknown provider '{name}', expected one of: {}", known.join(", ")),
        ))
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration, ConfigError> {
    let duration = humantime::parse_duration(value)
        .map_err(|e| ConfigError::invalid(field, format!("'{value}': {e}")))?;
    if duration.is_zero() {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(duration)
}

fn parse_endpoint(field: &str, value: Option<&str>) -> Result<Option<Url>, ConfigError> {
    value
        .map(|raw| {
            raw.parse::<Url>()
                .map_err(|e| ConfigError::invalid(field, format!("'{raw}': {e}")))
        })
        .transpose()
}
