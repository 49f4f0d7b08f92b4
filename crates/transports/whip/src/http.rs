//! HTTP plumbing shared by the WHIP, token and VOD clients

use std::time::Duration;

use url::Url;

use crate::config::WhipConfig;
use crate::error::{Result, WhipError};

/// Build the reqwest client used for all requests
pub(crate) fn build_client(config: &WhipConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| WhipError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// Parse an absolute http(s) URL
pub(crate) fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| WhipError::InvalidInput(format!("invalid URL '{}': {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(WhipError::InvalidInput(format!(
            "URL must be an absolute http:// or https:// URL, got: {}",
            raw
        ))),
    }
}

/// Parse an API base URL, ensuring its path ends in `/` so relative joins
/// keep any path prefix
pub(crate) fn parse_api_base(raw: &str) -> Result<Url> {
    let mut base = parse_endpoint(raw)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

/// Join a path relative to an API base from [`parse_api_base`]
pub(crate) fn api_endpoint(base: &Url, path: &str) -> Result<Url> {
    base.join(path)
        .map_err(|e| WhipError::InvalidInput(format!("invalid endpoint path '{}': {}", path, e)))
}

/// Resolve an absolute or relative reference against `base`
pub(crate) fn resolve(base: &Url, reference: &str) -> Result<Url> {
    base.join(reference)
        .map_err(|e| WhipError::Protocol(format!("unresolvable URL '{}': {}", reference, e)))
}

pub(crate) fn bearer_header(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Turn a non-success response into [`WhipError::Rejected`]
pub(crate) async fn reject(response: reqwest::Response) -> WhipError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    WhipError::Rejected { status, body }
}
