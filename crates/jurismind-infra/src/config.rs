//! Global configuration loader for JurisMind.
//!
//! Reads `config.toml` from the data directory (`~/.jurismind/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::Path;

use secrecy::SecretString;

use jurismind_types::config::{GenerationConfig, GlobalConfig};

use crate::filesystem::config_path;

/// Errors resolving runtime settings that have no usable default.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API key not found: set the {var} environment variable")]
    MissingApiKey { var: String },
}

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Read the generation API key from the environment variable named in the config.
///
/// Blank values count as missing.
pub fn resolve_api_key(generation: &GenerationConfig) -> Result<SecretString, ConfigError> {
    match std::env::var(&generation.api_key_env) {
        Ok(value) if !value.trim().is_empty() => Ok(SecretString::from(value)),
        _ => Err(ConfigError::MissingApiKey {
            var: generation.api_key_env.clone(),
        }),
    }
}
