//! Client configuration

use serde::{Deserialize, Serialize};

/// Configuration shared by the WHIP, token and VOD HTTP clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhipConfig {
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("substream-whip/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for WhipConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl WhipConfig {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
