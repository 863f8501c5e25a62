//! Program configuration.
//!
//! Defaults target the public OpenRouter endpoint; every field can be
//! overridden through environment variables or a TOML file.

use std::path::Path;

use serde::Deserialize;

/// Program configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenRouter API key. Empty means the backend is unavailable and the
    /// pipeline runs in deterministic fallback mode.
    pub openrouter_api_key: String,
    /// OpenRouter API base URL.
    pub openrouter_base_url: String,
    /// Model used for generation, validation and feedback.
    pub model_name: String,
    /// Timeout applied to every single backend call, in seconds.
    pub request_timeout_secs: u64,
    /// Maximum number of annotation excerpts serialized per code in prompts.
    pub max_excerpts_per_code: usize,
    /// Verbose logging.
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openrouter_api_key: String::new(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            model_name: "mistralai/mistral-7b-instruct".to_string(),
            request_timeout_secs: 60,
            max_excerpts_per_code: 3,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or(default.openrouter_api_key),
            openrouter_base_url: std::env::var("OPENROUTER_BASE_URL").unwrap_or(default.openrouter_base_url),
            model_name: std::env::var("MODEL_NAME").unwrap_or(default.model_name),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            max_excerpts_per_code: std::env::var("MAX_EXCERPTS_PER_CODE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_excerpts_per_code),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// Load configuration from a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> crate::error::AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = toml::from_str(&raw)
            .map_err(|e| crate::error::AppError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }
}
