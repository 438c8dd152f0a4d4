//! Configuration management.
//!
//! Configuration is loaded from multiple sources in order: built-in
//! defaults, an optional `config/loupe` file, `LOUPE__`-prefixed
//! environment variables, and finally the well-known provider key
//! variables (`GROQ_API_KEY`, `TAVILY_API_KEY`). A `.env` file is
//! honored when present.
//!
//! Both credentials are optional by design: without a search key the
//! search client serves deterministic placeholder results, and without
//! an LLM key every generation consumer degrades to its local default.

pub mod error;

pub use error::{ConfigResult, ConfigurationError};

use serde::{Deserialize, Serialize};

use crate::llm::LlmSettings;
use crate::search::tavily::SearchSettings;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM connection and model settings.
    #[serde(default)]
    pub llm: LlmSettings,
    /// Search API settings.
    #[serde(default)]
    pub search: SearchSettings,
}

impl AppConfig {
    /// Load configuration from environment and config files.
    ///
    /// The result is validated; use [`Self::load_unchecked`] to skip
    /// validation.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::load_unchecked()?;

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

        Ok(config)
    }

    /// Load configuration without validation.
    pub fn load_unchecked() -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .set_default("llm.model", "llama-3.3-70b-versatile")?
            .set_default("llm.planner_model", "qwen-qwq-32b")?
            .add_source(config::File::with_name("config/loupe").required(false))
            .add_source(
                config::Environment::with_prefix("LOUPE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize().unwrap_or_default();

        // Provider API keys
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            app_config.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("GROQ_BASE_URL") {
            app_config.llm.base_url = url;
        }
        if let Ok(key) = std::env::var("TAVILY_API_KEY") {
            app_config.search.api_key = Some(key);
        }

        Ok(app_config)
    }

    /// Validate endpoint shapes.
    ///
    /// Credentials are deliberately not required here; see the module
    /// docs for the degraded modes.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.llm.base_url.starts_with("http") {
            return Err(ConfigurationError::invalid(
                format!("llm.base_url is not an HTTP(S) URL: {:?}", self.llm.base_url),
                "set GROQ_BASE_URL or LOUPE__LLM__BASE_URL to a full URL like https://api.groq.com",
            ));
        }
        if !self.search.endpoint.starts_with("http") {
            return Err(ConfigurationError::invalid(
                format!(
                    "search.endpoint is not an HTTP(S) URL: {:?}",
                    self.search.endpoint
                ),
                "set LOUPE__SEARCH__ENDPOINT to a full URL like https://api.tavily.com/search",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(config.llm.planner_model, "qwen-qwq-32b");
        assert_eq!(config.search.endpoint, "https://api.tavily.com/search");
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = AppConfig::default();
        config.llm.base_url = "not-a-url".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm.base_url"));
    }

    #[test]
    #[serial]
    fn test_env_key_override() {
        // SAFETY: `#[serial]` guarantees no other test thread touches the
        // environment while this test runs.
        unsafe {
            std::env::set_var("GROQ_API_KEY", "gsk_test_0123456789abcdef");
            std::env::set_var("TAVILY_API_KEY", "tvly_test_key");
        }

        let config = AppConfig::load_unchecked().unwrap();
        assert_eq!(
            config.llm.api_key.as_deref(),
            Some("gsk_test_0123456789abcdef")
        );
        assert_eq!(config.search.api_key.as_deref(), Some("tvly_test_key"));

        // SAFETY: same serialization argument as above.
        unsafe {
            std::env::remove_var("GROQ_API_KEY");
            std::env::remove_var("TAVILY_API_KEY");
        }
    }
}
