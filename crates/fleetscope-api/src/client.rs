// Backend HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, bearer-token injection
// and status/JSON handling. Endpoint methods live in `access.rs` and
// `groups.rs` as inherent impls so this module stays about transport.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for the ownership and group-membership backends.
///
/// Both backends speak plain JSON over GET; non-success statuses are
/// mapped to [`Error::Unauthorized`] or [`Error::Status`] before the body
/// is decoded.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            base_url,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Append percent-encoded path segments to the base URL.
    pub(crate) fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request, optionally authenticated, and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&SecretString>,
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let mut builder = self.http.get(url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        let resp = builder.send().await.map_err(Error::Transport)?;

        Self::parse_json(resp).await
    }

    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Unauthorized {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn url_appends_segments_after_base_path() {
        let c = client("https://acl.internal/api/");
        let url = c.url(["v1", "clusters", "access"]).unwrap();
        assert_eq!(url.as_str(), "https://acl.internal/api/v1/clusters/access");
    }

    #[test]
    fn url_percent_encodes_segments() {
        let c = client("https://groups.internal");
        let url = c.url(["v1", "users", "a b@x.com", "groups"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://groups.internal/v1/users/a%20b@x.com/groups"
        );
    }
}
