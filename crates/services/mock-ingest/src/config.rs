//! Configuration for the mock ingest server
//!
//! Configuration can be loaded from a TOML file and/or environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the mock ingest server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Token signing and publish authorization
    #[serde(default)]
    pub auth: AuthConfig,

    /// Resource limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Token signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for issued and validated tokens
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Value of the `iss` claim on issued tokens
    #[serde(default)]
    pub api_key: Option<String>,

    /// Require a bearer token with `canPublish` on WHIP requests
    #[serde(default)]
    pub require_auth: bool,

    /// Media server URL handed out with viewer tokens
    #[serde(default = "default_livekit_url")]
    pub livekit_url: String,

    /// Room used when `GET /token` names none
    #[serde(default = "default_room")]
    pub default_room: String,

    /// TTL of `/pc/token` tokens
    #[serde(default = "default_pc_token_ttl")]
    pub pc_token_ttl_seconds: i64,

    /// TTL of viewer tokens
    #[serde(default = "default_viewer_token_ttl")]
    pub viewer_token_ttl_seconds: i64,
}

fn default_secret() -> String {
    // Demo only; override with SUBSTREAM_SECRET
    "demo-secret".to_string()
}

fn default_livekit_url() -> String {
    "ws://localhost:7880".to_string()
}

fn default_room() -> String {
    "substream-demo".to_string()
}

fn default_pc_token_ttl() -> i64 {
    900 // 15 minutes
}

fn default_viewer_token_ttl() -> i64 {
    3600
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            api_key: None,
            require_auth: false,
            livekit_url: default_livekit_url(),
            default_room: default_room(),
            pc_token_ttl_seconds: default_pc_token_ttl(),
            viewer_token_ttl_seconds: default_viewer_token_ttl(),
        }
    }
}

/// Resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of live WHIP resources
    #[serde(default = "default_max_resources")]
    pub max_resources: usize,

    /// WHIP resources never deleted are reclaimed after this long
    #[serde(default = "default_idle_timeout")]
    pub resource_idle_timeout_seconds: u64,

    /// Interval of the reclamation task
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,

    /// Maximum size of one VOD chunk in bytes
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,
}

fn default_max_resources() -> usize {
    100
}

fn default_idle_timeout() -> u64 {
    3600 // 1 hour
}

fn default_cleanup_interval() -> u64 {
    10
}

fn default_max_chunk_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_resources: default_max_resources(),
            resource_idle_timeout_seconds: default_idle_timeout(),
            cleanup_interval_seconds: default_cleanup_interval(),
            max_chunk_bytes: default_max_chunk_bytes(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.as_ref().display(), e)))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        // Server
        if let Some(host) = var("SUBSTREAM_HOST") {
            config.server.host = host;
        }
        if let Some(port) = var("SUBSTREAM_PORT").or_else(|| var("MOCK_PORT")) {
            if let Ok(p) = port.parse() {
                config.server.port = p;
            }
        }

        // Auth
        if let Some(secret) = var("SUBSTREAM_SECRET") {
            config.auth.secret = secret;
        }
        if let Some(key) = var("SUBSTREAM_API_KEY") {
            config.auth.api_key = Some(key);
        }
        if let Some(flag) = var("SUBSTREAM_REQUIRE_AUTH") {
            config.auth.require_auth = matches!(flag.as_str(), "1" | "true" | "yes");
        }
        if let Some(url) = var("SUBSTREAM_LIVEKIT_URL") {
            config.auth.livekit_url = url;
        }
        if let Some(ttl) = var("SUBSTREAM_PC_TOKEN_TTL") {
            if let Ok(t) = ttl.parse() {
                config.auth.pc_token_ttl_seconds = t;
            }
        }

        // Limits
        if let Some(max) = var("SUBSTREAM_MAX_RESOURCES") {
            if let Ok(m) = max.parse() {
                config.limits.max_resources = m;
            }
        }
        if let Some(timeout) = var("SUBSTREAM_RESOURCE_IDLE_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                config.limits.resource_idle_timeout_seconds = t;
            }
        }

        config
    }

    /// Load configuration from the given file, or from environment when
    /// no path is given
    ///
    /// A named file that cannot be read is an error.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::from_env()),
        }
    }

    /// `host:port` to bind the HTTP listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
