//! Wires the configured provider into the core backend traits.

use crate::config::{Config, LlmProvider};
use crate::gemini_adapter::GeminiAdapter;
use crate::openai_adapter::OpenAiClient;
use crate::prompt_loader::load_prompt_set;
use anyhow::{Context, Result};
use gemini_client::GeminiClient;
use interview_core::{ChatBackend, PromptSet, SessionWizard, StructuredBackend};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

/// The pair of remote capabilities a session needs.
#[derive(Clone)]
pub struct Backends {
    pub chat: Arc<dyn ChatBackend>,
    pub structured: Arc<dyn StructuredBackend>,
}

impl Backends {
    /// One object serving both roles.
    pub fn shared<B>(backend: B) -> Self
    where
        B: ChatBackend + StructuredBackend + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            chat: backend.clone(),
            structured: backend,
        }
    }
}

fn required_key(key: Option<&SecretString>, name: &str) -> Result<SecretString> {
    let key = key.with_context(|| format!("{name} is not configured"))?;
    Ok(SecretString::from(key.expose_secret().to_string()))
}

pub fn build_backends(config: &Config) -> Result<Backends> {
    match config.provider {
        LlmProvider::Gemini => {
            let api_key = required_key(config.gemini_api_key.as_ref(), "GEMINI_API_KEY")?;
            let client = GeminiClient::new(
                gemini_client::Config::builder()
                    .with_api_key(api_key)
                    .with_model(&config.chat_model)
                    .build(),
            );
            tracing::info!("Using Gemini model {}", config.chat_model);
            Ok(Backends::shared(GeminiAdapter::new(client)))
        }
        LlmProvider::OpenAI => {
            let api_key = required_key(config.openai_api_key.as_ref(), "OPENAI_API_KEY")?;
            tracing::info!("Using OpenAI model {}", config.chat_model);
            Ok(Backends::shared(OpenAiClient::new(
                api_key,
                config.chat_model.clone(),
            )))
        }
    }
}

/// Creates fresh wizards that share backends and prompts.
#[derive(Clone)]
pub struct WizardFactory {
    backends: Backends,
    prompts: PromptSet,
    completion_delay: Duration,
}

impl WizardFactory {
    pub fn new(backends: Backends, prompts: PromptSet, completion_delay: Duration) -> Self {
        Self {
            backends,
            prompts,
            completion_delay,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let backends = build_backends(config)?;
        let prompts = load_prompt_set(config.prompts_dir.as_deref())
            .context("Failed to load interview prompts")?;
        Ok(Self::new(backends, prompts, config.completion_delay))
    }

    pub fn create(&self) -> SessionWizard {
        SessionWizard::with_options(
            Arc::clone(&self.backends.chat),
            Arc::clone(&self.backends.structured),
            self.prompts.clone(),
            self.completion_delay,
        )
    }
}
