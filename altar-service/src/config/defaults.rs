//! Default value functions for configuration sections.

use super::schemas::{AiConfig, CollaborationConfig, ProviderConfig, RetryConfig, ServerConfig};

// ==================== Top-level Section Defaults ====================

pub(crate) fn default_server() -> ServerConfig {
    ServerConfig {
        host: default_host(),
        port: default_port(),
    }
}

pub(crate) fn default_ai() -> AiConfig {
    AiConfig {
        gemini: ProviderConfig::default(),
        deepseek: ProviderConfig::default(),
        retry: RetryConfig::default(),
    }
}

pub(crate) fn default_collaboration() -> CollaborationConfig {
    CollaborationConfig {
        host: default_collaboration_host(),
        max_reconnect_attempts: default_max_reconnect_attempts(),
        reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
        connect_timeout_secs: default_connect_timeout_secs(),
        degraded_delay_ms: default_degraded_delay_ms(),
    }
}

// ==================== Server ====================

pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8080
}

// ==================== AI ====================

pub(crate) fn default_request_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_max_retries() -> u32 {
    3
}

pub(crate) fn default_base_delay_ms() -> u64 {
    1000
}

// ==================== Collaboration ====================

pub(crate) fn default_collaboration_host() -> String {
    "localhost:8080".to_string()
}

pub(crate) fn default_max_reconnect_attempts() -> u32 {
    5
}

pub(crate) fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

pub(crate) fn default_connect_timeout_secs() -> u64 {
    10
}

pub(crate) fn default_degraded_delay_ms() -> u64 {
    100
}
