// Cluster ownership endpoint.

use std::collections::HashMap;

use crate::client::BackendClient;
use crate::error::Error;

/// Raw ownership payload: cluster or application name → owning groups.
pub type ClusterOwners = HashMap<String, Vec<String>>;

impl BackendClient {
    /// Fetch the ownership table for every cluster.
    ///
    /// `GET {base}/v1/clusters/access`. Optional `env` / `region` filters are
    /// passed as query parameters when set.
    pub async fn cluster_access(
        &self,
        env: Option<&str>,
        region: Option<&str>,
    ) -> Result<ClusterOwners, Error> {
        let mut url = self.url(["v1", "clusters", "access"])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(env) = env {
                query.append_pair("env", env);
            }
            if let Some(region) = region {
                query.append_pair("region", region);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.get(url, None).await
    }
}
