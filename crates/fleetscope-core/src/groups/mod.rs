// ── User → group lookup ──

mod cache;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fleetscope_api::{BackendClient, TransportConfig};
use secrecy::SecretString;

pub use cache::{UserGroupCache, UserGroupCacheEntry};

use crate::config::UserGroupConfig;
use crate::error::CoreError;

/// Resolves the authorization groups a user belongs to.
#[async_trait]
pub trait UserGroupProvider: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn get_user_groups(
        &self,
        email: &str,
        access_token: &SecretString,
    ) -> Result<Vec<String>, CoreError>;
}

/// Looks groups up in the HTTP membership backend, forwarding the
/// caller's token.
pub struct HttpUserGroupProvider {
    client: BackendClient,
}

impl HttpUserGroupProvider {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserGroupProvider for HttpUserGroupProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get_user_groups(
        &self,
        email: &str,
        access_token: &SecretString,
    ) -> Result<Vec<String>, CoreError> {
        Ok(self.client.user_groups(email, access_token).await?)
    }
}

/// Serves memberships from configuration. Unknown users have no groups.
pub struct StaticUserGroupProvider {
    groups: HashMap<String, Vec<String>>,
}

impl StaticUserGroupProvider {
    pub fn new(groups: HashMap<String, Vec<String>>) -> Self {
        Self { groups }
    }
}

#[async_trait]
impl UserGroupProvider for StaticUserGroupProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn get_user_groups(
        &self,
        email: &str,
        _access_token: &SecretString,
    ) -> Result<Vec<String>, CoreError> {
        Ok(self.groups.get(email).cloned().unwrap_or_default())
    }
}

/// Every user belongs to no group.
pub struct NoopUserGroupProvider;

#[async_trait]
impl UserGroupProvider for NoopUserGroupProvider {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn get_user_groups(
        &self,
        _email: &str,
        _access_token: &SecretString,
    ) -> Result<Vec<String>, CoreError> {
        Ok(Vec::new())
    }
}

/// Resolve `user_groups.provider` to an implementation.
pub fn provider_from_config(
    config: &UserGroupConfig,
    transport: &TransportConfig,
) -> Result<Arc<dyn UserGroupProvider>, CoreError> {
    match config.provider.as_str() {
        "http" => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                CoreError::config("user_groups.endpoint is required by the http provider")
            })?;
            let client = BackendClient::new(endpoint, transport)?;
            Ok(Arc::new(HttpUserGroupProvider::new(client)))
        }
        "static" => Ok(Arc::new(StaticUserGroupProvider::new(config.groups.clone()))),
        "none" => Ok(Arc::new(NoopUserGroupProvider)),
        "" => Err(CoreError::config("no user-group provider configured")),
        other => Err(CoreError::UnknownProvider {
            kind: "user-group",
            name: other.into(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_configured_groups() {
        let config = UserGroupConfig {
            provider: "static".into(),
            groups: [("ada@example.com".to_owned(), vec!["dba".to_owned()])].into(),
            ..UserGroupConfig::default()
        };
        let provider = provider_from_config(&config, &TransportConfig::default()).unwrap();
        let token = SecretString::from("t".to_owned());

        assert_eq!(provider.get_user_groups("ada@example.com", &token).await.unwrap(), ["dba"]);
        assert!(provider.get_user_groups("bob@example.com", &token).await.unwrap().is_empty());
    }

    #[test]
    fn registry_rejects_unknown_and_incomplete_providers() {
        let unknown = UserGroupConfig {
            provider: "ldap".into(),
            ..UserGroupConfig::default()
        };
        let err = provider_from_config(&unknown, &TransportConfig::default()).err().unwrap();
        assert!(matches!(err, CoreError::UnknownProvider { kind: "user-group", .. }));

        let http = UserGroupConfig {
            provider: "http".into(),
            ..UserGroupConfig::default()
        };
        let err = provider_from_config(&http, &TransportConfig::default()).err().unwrap();
        assert!(matches!(err, CoreError::Config { .. }));
    }
}
