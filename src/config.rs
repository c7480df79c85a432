//! Configuration loading: a static YAML file for engine tunables and the
//! provider endpoint, with the API key injected from the environment.
//!
//! This module is the only place where YAML is parsed and mapped to the
//! typed [`AppConfig`].
//!
//! # Responsibilities
//! - Parse the `engine` and `provider` sections; missing engine fields take
//!   [`EngineConfig::default`] values
//! - Map the loosely-typed `provider.conformance` string to [`Conformance`]
//! - Read the API key from `LEXDECK_API_KEY` after loading any `.env` file
//! - Reject a zero default timeout
//!
//! # Errors
//! [`load_config`] returns `anyhow::Error` naming the cause: unreadable file,
//! invalid YAML, unsupported conformance level, or a missing or empty API key.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::transport::Conformance;

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "LEXDECK_API_KEY";

/// Tunables for the generation engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Budget applied when a request carries no deadline.
    pub default_timeout_ms: u64,
    pub deck_temperature: f32,
    pub citation_temperature: f32,
    pub max_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 60_000,
            deck_temperature: 0.4,
            citation_temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

impl EngineConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn trace_loaded(&self) {
        info!(
            default_timeout_ms = self.default_timeout_ms,
            max_tokens = self.max_tokens,
            "Loaded EngineConfig"
        );
        debug!(?self, "EngineConfig loaded (full debug)");
    }
}

/// Where and how to reach the language-model provider.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub conformance: Conformance,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("conformance", &self.conformance)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub provider: ProviderConfig,
}

#[derive(Deserialize)]
struct StaticConfig {
    #[serde(default)]
    engine: EngineConfig,
    provider: ProviderSection,
}

#[derive(Deserialize)]
struct ProviderSection {
    endpoint: String,
    model: String,
    #[serde(default = "default_conformance")]
    conformance: String,
}

fn default_conformance() -> String {
    "strict".to_string()
}

/// Loads a static YAML config file (no secrets) and injects the API key from
/// the environment. Returns the merged configuration or an error naming the
/// missing or invalid piece.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    dotenvy::dotenv().ok();
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let conformance = match static_conf.provider.conformance.as_str() {
        "strict" | "L1" => Conformance::Strict,
        "free_text" | "freetext" | "L2" => Conformance::FreeText,
        other => {
            error!(conformance = %other, "Unsupported provider.conformance in config");
            anyhow::bail!("Unsupported provider.conformance: {}", other);
        }
    };

    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            info!("{API_KEY_ENV} found in env");
            key
        }
        Ok(_) => {
            error!("{API_KEY_ENV} environment variable is empty");
            anyhow::bail!("{API_KEY_ENV} environment variable is empty");
        }
        Err(e) => {
            error!(error = ?e, "{API_KEY_ENV} environment variable not set");
            return Err(anyhow::anyhow!("{API_KEY_ENV} environment variable not set: {e}"));
        }
    };

    if static_conf.engine.default_timeout_ms == 0 {
        anyhow::bail!("engine.default_timeout_ms must be greater than zero");
    }
    static_conf.engine.trace_loaded();

    let provider = ProviderConfig {
        endpoint: static_conf.provider.endpoint,
        model: static_conf.provider.model,
        api_key,
        conformance,
    };
    info!(
        endpoint = %provider.endpoint,
        model = %provider.model,
        ?conformance,
        "Config loaded and merged successfully"
    );

    Ok(AppConfig {
        engine: static_conf.engine,
        provider,
    })
}
