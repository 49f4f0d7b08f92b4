//! Client for a token issuing endpoint
//!
//! Publishers normally hold no signing secret; they ask a backend for a
//! short-lived bearer token and hand it to [`WhipClient`](crate::WhipClient).

use serde::{Deserialize, Serialize};
use substream_access_token::{TokenRequest, TokenResponse};
use url::Url;

use crate::config::WhipConfig;
use crate::error::Result;
use crate::http::{api_endpoint, build_client, parse_api_base, reject};

/// Viewer credential returned by `GET /token`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerToken {
    pub token: String,
    /// Media server URL the token is valid for
    pub url: String,
}

/// HTTP client for `/token` and `/pc/token`
#[derive(Debug, Clone)]
pub struct TokenEndpointClient {
    client: reqwest::Client,
    base_url: Url,
}

impl TokenEndpointClient {
    pub fn new(base_url: &str, config: &WhipConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: parse_api_base(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        api_endpoint(&self.base_url, path)
    }

    /// `POST /token` with an explicit request
    pub async fn request(&self, request: &TokenRequest) -> Result<TokenResponse> {
        let url = self.endpoint("token")?;
        tracing::debug!(url = %url, subject = %request.subject, room = %request.room_name, "Requesting access token");

        let response = self.client.post(url).json(request).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        Ok(response.json().await?)
    }

    /// `GET /pc/token`, the publisher-client flavour with service scopes
    pub async fn fetch_pc_token(&self) -> Result<TokenResponse> {
        let url = self.endpoint("pc/token")?;
        tracing::debug!(url = %url, "Fetching publisher token");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        Ok(response.json().await?)
    }

    /// `GET /token?room=..&identity=..` for a subscribe-only credential
    pub async fn fetch_viewer_token(&self, room: &str, identity: &str) -> Result<ViewerToken> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut()
            .append_pair("room", room)
            .append_pair("identity", identity);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        Ok(response.json().await?)
    }
}
