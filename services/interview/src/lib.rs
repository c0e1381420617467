//! Runtime plumbing for the interview coach: configuration, prompt files and
//! the provider adapters behind the core backend traits.

pub mod config;
pub mod gemini_adapter;
pub mod openai_adapter;
pub mod prompt_loader;
pub mod providers;

pub use config::{Config, ConfigError, LlmProvider};
pub use providers::{Backends, WizardFactory};
