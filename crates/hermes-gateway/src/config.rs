use serde::Deserialize;

/// Default bridge server URL
pub const DEFAULT_BRIDGE_URL: &str = "http://localhost:3000";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Messaging bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Bridge server URL (default: http://localhost:3000)
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    /// Optional API key sent as `X-Api-Key`
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_bridge_url() -> String {
    DEFAULT_BRIDGE_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl GatewayConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let bridge_url =
            std::env::var("GATEWAY_BRIDGE_URL").unwrap_or_else(|_| default_bridge_url());

        let api_key = std::env::var("GATEWAY_API_KEY").ok().filter(|k| !k.is_empty());

        let timeout_secs = std::env::var("GATEWAY_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default_timeout());

        Self {
            bridge_url,
            api_key,
            timeout_secs,
        }
    }

    /// Create with bridge URL
    #[must_use]
    pub fn new(bridge_url: impl Into<String>) -> Self {
        Self {
            bridge_url: bridge_url.into(),
            ..Default::default()
        }
    }
}
