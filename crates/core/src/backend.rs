use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

/// Who authored a message in the history sent to a conversational service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Provider-neutral configuration for one remote chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub system_instruction: String,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_instruction: String::new(),
            temperature: 0.7,
            top_p: 0.95,
        }
    }
}

/// A conversational completion service.
///
/// Calls are stateless: the whole running history is sent every time, and the
/// caller owns that history. This keeps providers interchangeable and lets
/// tests substitute `MockChatBackend`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Returns the assistant's reply to the last message in `history`.
    async fn send_chat(&self, config: &ChatConfig, history: &[ChatMessage]) -> Result<String>;
}

/// A remote call constrained to answer with JSON matching `schema`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StructuredBackend: Send + Sync {
    /// Returns the raw JSON text. Validating it is the caller's job.
    async fn generate_structured(&self, prompt: &str, schema: &serde_json::Value)
    -> Result<String>;
}
