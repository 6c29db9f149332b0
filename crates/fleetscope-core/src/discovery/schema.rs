// ── Discovery document schema ──

use serde_json::Value;

use crate::error::CoreError;
use crate::model::ClusterDefinition;

const CLUSTER_SCHEMA: &str = include_str!("clusters.schema.json");

/// Compiled JSON schema for cluster discovery documents.
pub struct ClusterSchema {
    validator: jsonschema::Validator,
}

impl ClusterSchema {
    /// Parse and compile the bundled schema.
    pub fn load() -> Result<Self, CoreError> {
        let schema: Value = serde_json::from_str(CLUSTER_SCHEMA)
            .map_err(|e| CoreError::Internal(format!("cluster schema is not JSON: {e}")))?;
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| CoreError::Internal(format!("cluster schema does not compile: {e}")))?;
        Ok(Self { validator })
    }

    /// Validate a document, reporting every violation on its own line.
    pub fn validate(&self, document: &Value) -> Result<(), CoreError> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(document)
            .map(|err| {
                let path = err.instance_path.to_string();
                let path = if path.is_empty() { "/".to_owned() } else { path };
                format!("{path}: {err}")
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ValidationFailed {
                message: violations.join("\n"),
            })
        }
    }
}

/// Parse, validate, and decode a raw cluster document.
pub fn parse_cluster_document(
    schema: &ClusterSchema,
    raw: &str,
) -> Result<Vec<ClusterDefinition>, CoreError> {
    let document: Value = serde_json::from_str(raw).map_err(|e| CoreError::ValidationFailed {
        message: format!("/: not valid JSON: {e}"),
    })?;
    schema.validate(&document)?;
    serde_json::from_value(document).map_err(|e| CoreError::ValidationFailed {
        message: format!("/: {e}"),
    })
}
