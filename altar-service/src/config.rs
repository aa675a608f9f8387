//! Service configuration loaded from an optional `config` file and
//! `ALTAR__*` environment variables.

mod defaults;
mod loader;
mod schemas;

use serde::Deserialize;

pub use loader::load_config;
pub use schemas::{AiConfig, CollaborationConfig, ProviderConfig, RetryConfig, ServerConfig};

use defaults::{default_ai, default_collaboration, default_server};

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_server")]
    pub server: ServerConfig,

    #[serde(default = "default_ai")]
    pub ai: AiConfig,

    #[serde(default = "default_collaboration")]
    pub collaboration: CollaborationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            ai: default_ai(),
            collaboration: default_collaboration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::config::{Config, File, FileFormat};
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);

        assert_eq!(config.ai.retry.max_retries, 3);
        assert_eq!(config.ai.retry.base_delay(), Duration::from_millis(1000));
        assert!(config.ai.gemini.api_key.is_none());
        assert_eq!(config.ai.deepseek.request_timeout_secs, 60);

        assert_eq!(config.collaboration.host, "localhost:8080");
        assert_eq!(config.collaboration.max_reconnect_attempts, 5);
        assert_eq!(
            config.collaboration.reconnect_base_delay(),
            Duration::from_millis(1000)
        );
        assert_eq!(config.collaboration.degraded_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_file_keeps_field_defaults() {
        let toml = r#"
[server]
port = 9000

[ai.gemini]
api_key = "abc123"

[collaboration]
max_reconnect_attempts = 2
"#;
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ai.gemini.api_key.as_deref(), Some("abc123"));
        assert!(config.ai.gemini.base_url.is_none());
        assert_eq!(config.ai.gemini.request_timeout_secs, 60);
        assert_eq!(config.ai.retry.max_retries, 3);
        assert_eq!(config.collaboration.max_reconnect_attempts, 2);
        assert_eq!(config.collaboration.connect_timeout_secs, 10);
    }
}
