//! Configuration struct definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "super::defaults::default_host")]
    pub host: String,

    #[serde(default = "super::defaults::default_port")]
    pub port: u16,
}

/// Generative-AI provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub gemini: ProviderConfig,

    #[serde(default)]
    pub deepseek: ProviderConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Settings for a single provider. Unset URL and model fall back to the
/// provider adapter's own defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Credential. Missing, empty or placeholder values disable the provider.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Per-attempt HTTP timeout
    #[serde(default = "super::defaults::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: None,
            request_timeout_secs: super::defaults::default_request_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Retry policy for AI requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "super::defaults::default_max_retries")]
    pub max_retries: u32,

    /// Base delay; doubled per retry when rate limited, flat otherwise
    #[serde(default = "super::defaults::default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: super::defaults::default_max_retries(),
            base_delay_ms: super::defaults::default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Real-time collaboration session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborationConfig {
    /// `host[:port]` of the collaboration relay
    #[serde(default = "super::defaults::default_collaboration_host")]
    pub host: String,

    #[serde(default = "super::defaults::default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Reconnect attempt `n` waits `n` times this delay
    #[serde(default = "super::defaults::default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    #[serde(default = "super::defaults::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Delay before a synthetic `connected` event when no transport can be built
    #[serde(default = "super::defaults::default_degraded_delay_ms")]
    pub degraded_delay_ms: u64,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        super::defaults::default_collaboration()
    }
}

impl CollaborationConfig {
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn degraded_delay(&self) -> Duration {
        Duration::from_millis(self.degraded_delay_ms)
    }
}
