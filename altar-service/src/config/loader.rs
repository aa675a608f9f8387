//! Configuration loading from files and environment variables.

use config::{Config, Environment, File};
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

use super::AppConfig;

/// Load configuration from `config.*` (optional) and `ALTAR__*` env vars.
///
/// Provider keys left unset fall back to the conventional
/// `GEMINI_API_KEY` / `DEEPSEEK_API_KEY` variables.
pub fn load_config() -> ServiceResult<AppConfig> {
    let mut config: AppConfig = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::with_prefix("ALTAR")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to build config: {}", e),
        })?
        .try_deserialize()
        .map_err(|e| ServiceError::Config {
            message: format!("Failed to deserialize config: {}", e),
        })?;

    apply_key_fallback(&mut config.ai.gemini.api_key, "GEMINI_API_KEY");
    apply_key_fallback(&mut config.ai.deepseek.api_key, "DEEPSEEK_API_KEY");

    Ok(config)
}

fn apply_key_fallback(slot: &mut Option<String>, var: &str) {
    if slot.is_some() {
        return;
    }
    if let Ok(value) = std::env::var(var) {
        debug!(var = %var, "Using API key from environment");
        *slot = Some(value);
    }
}
