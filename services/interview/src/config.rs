//! Application Configuration Module
//!
//! Loads settings for the interview service from the environment (and a
//! `.env` file when present) into a single struct shared by the binaries.

use secrecy::SecretString;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_COMPLETION_DELAY_MS: u64 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    OpenAI,
}

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub provider: LlmProvider,
    pub gemini_api_key: Option<SecretString>,
    pub openai_api_key: Option<SecretString>,
    pub chat_model: String,
    pub prompts_dir: Option<PathBuf>,
    pub completion_delay: Duration,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `LLM_PROVIDER`: "gemini" or "openai". Defaults to "gemini".
    /// *   `GEMINI_API_KEY`: Required if provider is "gemini".
    /// *   `OPENAI_API_KEY`: Required if provider is "openai".
    /// *   `CHAT_MODEL`: (Optional) Model for both the interviewer and the evaluator.
    /// *   `PROMPTS_DIR`: (Optional) Directory with `interviewer.md` / `feedback.md` overrides.
    /// *   `COMPLETION_DELAY_MS`: (Optional) Pause after the closing message. Defaults to 1500.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider_str = lookup("LLM_PROVIDER").unwrap_or_else(|| "gemini".to_string());
        let provider = match provider_str.trim().to_lowercase().as_str() {
            "gemini" => LlmProvider::Gemini,
            "openai" => LlmProvider::OpenAI,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "LLM_PROVIDER".to_string(),
                    provider_str,
                ));
            }
        };

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let gemini_api_key = non_empty("GEMINI_API_KEY").map(SecretString::from);
        let openai_api_key = non_empty("OPENAI_API_KEY").map(SecretString::from);

        let chat_model = non_empty("CHAT_MODEL").unwrap_or_else(|| {
            match provider {
                LlmProvider::Gemini => DEFAULT_GEMINI_MODEL,
                LlmProvider::OpenAI => DEFAULT_OPENAI_MODEL,
            }
            .to_string()
        });

        let prompts_dir = non_empty("PROMPTS_DIR").map(PathBuf::from);

        let completion_delay = match non_empty("COMPLETION_DELAY_MS") {
            Some(raw) => Duration::from_millis(raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue("COMPLETION_DELAY_MS".to_string(), raw.clone())
            })?),
            None => Duration::from_millis(DEFAULT_COMPLETION_DELAY_MS),
        };

        // Configure logging level from RUST_LOG, with a sensible default.
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        // Validate that the required API key is present for the selected provider.
        match provider {
            LlmProvider::Gemini if gemini_api_key.is_none() => {
                return Err(ConfigError::MissingVar(
                    "GEMINI_API_KEY must be set for the gemini provider".to_string(),
                ));
            }
            LlmProvider::OpenAI if openai_api_key.is_none() => {
                return Err(ConfigError::MissingVar(
                    "OPENAI_API_KEY must be set for the openai provider".to_string(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            provider,
            gemini_api_key,
            openai_api_key,
            chat_model,
            prompts_dir,
            completion_delay,
            log_level,
        })
    }
}
