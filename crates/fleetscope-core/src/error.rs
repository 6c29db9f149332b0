// ── Core error types ──
//
// User-facing errors from fleetscope-core. Consumers never see raw HTTP
// statuses or JSON parse failures from the backends: the
// `From<fleetscope_api::Error>` impl folds transport errors into
// `Provider` variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unknown {kind} provider '{name}'")]
    UnknownProvider { kind: &'static str, name: String },

    #[error("No cluster access-control provider has been bound")]
    ProviderNotSet,

    // ── Discovery errors ─────────────────────────────────────────────
    #[error("Cannot read discovery source {source_name}: {reason}")]
    DiscoverySource { source_name: String, reason: String },

    #[error("Discovery document failed validation:\n{message}")]
    ValidationFailed { message: String },

    #[error("Cluster not found: {key}")]
    ClusterNotFound { key: String },

    // ── Authorization errors ─────────────────────────────────────────
    #[error("Access to cluster '{cluster}' is not permitted")]
    Forbidden { cluster: String },

    // ── Provider errors (wrapped, not exposed raw) ───────────────────
    #[error("Provider request failed: {message}")]
    Provider {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
        transient: bool,
    },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to cluster {cluster}: {reason}")]
    ConnectionFailed { cluster: String, reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` for failures a later retry may resolve.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider { transient, .. } => *transient,
            Self::ConnectionFailed { .. } => true,
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fleetscope_api::Error> for CoreError {
    fn from(err: fleetscope_api::Error) -> Self {
        let transient = err.is_transient();
        let status = err.status();
        match err {
            fleetscope_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid provider URL: {e}"),
            },
            fleetscope_api::Error::Tls(msg) => CoreError::Config {
                message: format!("Provider TLS setup failed: {msg}"),
            },
            fleetscope_api::Error::Deserialization { message, body: _ } => CoreError::Provider {
                message: format!("unexpected response: {message}"),
                status,
                transient,
            },
            other => CoreError::Provider {
                message: other.to_string(),
                status,
                transient,
            },
        }
    }
}
