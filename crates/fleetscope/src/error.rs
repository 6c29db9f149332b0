//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use fleetscope_config::ConfigError;
use fleetscope_core::CoreError;

/// Process exit codes.
#[allow(dead_code)]
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const INVALID: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code, unused_assignments)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration value for {field}: {reason}")]
    #[diagnostic(
        code(fleetscope::config),
        help("Fix the value in the config file or the matching FLEETSCOPE_ variable.")
    )]
    Config { field: String, reason: String },

    #[error("Unknown {kind} provider '{name}'")]
    #[diagnostic(
        code(fleetscope::unknown_provider),
        help("Run `fleetscope config show` to see the configured providers.")
    )]
    UnknownProvider { kind: String, name: String },

    #[error(transparent)]
    #[diagnostic(code(fleetscope::config_load))]
    Figment(Box<figment::Error>),

    // ── Discovery ────────────────────────────────────────────────────

    #[error("Cannot read {source_name}: {reason}")]
    #[diagnostic(code(fleetscope::discovery_source))]
    DiscoverySource { source_name: String, reason: String },

    #[error("Cluster document is invalid:\n{message}")]
    #[diagnostic(
        code(fleetscope::invalid_document),
        help("Each entry needs name, env, region, datastoreType and instances.")
    )]
    InvalidDocument { message: String },

    #[error("No cluster list arrived within {seconds}s")]
    #[diagnostic(
        code(fleetscope::timeout),
        help("Check the discovery provider settings, or raise --wait.")
    )]
    Timeout { seconds: u64 },

    #[error("Not found: {what}")]
    #[diagnostic(code(fleetscope::not_found))]
    NotFound { what: String },

    #[error("Access to cluster '{cluster}' is not permitted")]
    #[diagnostic(code(fleetscope::forbidden))]
    Forbidden { cluster: String },

    // ── Backends ─────────────────────────────────────────────────────

    #[error("Backend request failed: {message}")]
    #[diagnostic(
        code(fleetscope::provider),
        help("The backend may be temporarily unavailable; retry, or check the endpoint URL.")
    )]
    Provider { message: String, transient: bool },

    #[error("Cannot connect: {message}")]
    #[diagnostic(code(fleetscope::connection_failed))]
    Connection { message: String },

    #[error("{message}")]
    #[diagnostic(code(fleetscope::internal))]
    Internal { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot render JSON: {0}")]
    #[diagnostic(code(fleetscope::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::UnknownProvider { .. } | Self::Figment(_) => {
                exit_code::CONFIG
            }
            Self::NotFound { .. } | Self::DiscoverySource { .. } => exit_code::NOT_FOUND,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::InvalidDocument { .. } => exit_code::INVALID,
            Self::Provider { .. } | Self::Connection { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Config { field, reason },
            ConfigError::Serialization(e) => CliError::Internal {
                message: format!("cannot render configuration: {e}"),
            },
            ConfigError::Figment(e) => CliError::Figment(e),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let transient = err.is_transient();
        match err {
            CoreError::Config { message } => CliError::Config {
                field: "configuration".into(),
                reason: message,
            },

            CoreError::UnknownProvider { kind, name } => CliError::UnknownProvider {
                kind: kind.into(),
                name,
            },

            CoreError::ProviderNotSet => CliError::Config {
                field: "access_control.provider".into(),
                reason: "no provider is bound".into(),
            },

            CoreError::DiscoverySource {
                source_name,
                reason,
            } => CliError::DiscoverySource {
                source_name,
                reason,
            },

            CoreError::ValidationFailed { message } => CliError::InvalidDocument { message },

            CoreError::ClusterNotFound { key } => CliError::NotFound {
                what: format!("cluster {key}"),
            },

            CoreError::Forbidden { cluster } => CliError::Forbidden { cluster },

            CoreError::Provider { message, .. } => CliError::Provider { message, transient },

            CoreError::ConnectionFailed { cluster, reason } => CliError::Connection {
                message: format!("{cluster}: {reason}"),
            },

            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_problems_share_an_exit_code() {
        let from_core: CliError = CoreError::UnknownProvider {
            kind: "discovery",
            name: "consul".into(),
        }
        .into();
        let from_config: CliError = ConfigError::Validation {
            field: "http.timeout".into(),
            reason: "must be greater than zero".into(),
        }
        .into();

        assert_eq!(from_core.exit_code(), exit_code::CONFIG);
        assert_eq!(from_config.exit_code(), exit_code::CONFIG);
    }

    #[test]
    fn invalid_documents_are_distinct_from_missing_files() {
        let invalid: CliError = CoreError::ValidationFailed {
            message: "/0: \"name\" is a required property".into(),
        }
        .into();
        let missing: CliError = CoreError::DiscoverySource {
            source_name: "clusters.json".into(),
            reason: "No such file or directory".into(),
        }
        .into();

        assert_eq!(invalid.exit_code(), exit_code::INVALID);
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn backend_failures_keep_transience() {
        let err: CliError = CoreError::Provider {
            message: "502 bad gateway".into(),
            status: Some(502),
            transient: true,
        }
        .into();
        assert!(matches!(err, CliError::Provider { transient: true, .. }));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }
}
