// Group membership endpoint.

use secrecy::SecretString;
use serde::Deserialize;

use crate::client::BackendClient;
use crate::error::Error;

#[derive(Debug, Deserialize)]
struct GroupsResponse {
    #[serde(default)]
    groups: Vec<String>,
}

impl BackendClient {
    /// Fetch the groups a user belongs to.
    ///
    /// `GET {base}/v1/users/{email}/groups`, authenticated with the caller's
    /// access token.
    pub async fn user_groups(
        &self,
        email: &str,
        access_token: &SecretString,
    ) -> Result<Vec<String>, Error> {
        let url = self.url(["v1", "users", email, "groups"])?;
        let resp: GroupsResponse = self.get(url, Some(access_token)).await?;
        Ok(resp.groups)
    }
}
