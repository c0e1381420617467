use anyhow::{Context, Result};
use async_trait::async_trait;
use gemini_client::GeminiClient;
use gemini_client::schema::to_gemini_schema;
use gemini_client::types::{Content, GenerateContentRequest, GenerationConfig};
use interview_core::backend::{ChatBackend, ChatConfig, ChatMessage, ChatRole, StructuredBackend};

/// Implements the core backend traits on top of `gemini_client::GeminiClient`.
pub struct GeminiAdapter {
    client: GeminiClient,
}

impl GeminiAdapter {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

pub fn chat_request(config: &ChatConfig, history: &[ChatMessage]) -> GenerateContentRequest {
    let contents = history
        .iter()
        .map(|message| match message.role {
            ChatRole::User => Content::user(message.text.clone()),
            ChatRole::Model => Content::model(message.text.clone()),
        })
        .collect();

    GenerateContentRequest {
        system_instruction: (!config.system_instruction.is_empty())
            .then(|| Content::system(config.system_instruction.clone())),
        contents,
        generation_config: Some(GenerationConfig {
            temperature: Some(config.temperature),
            top_p: Some(config.top_p),
            ..GenerationConfig::default()
        }),
    }
}

pub fn structured_request(prompt: &str, schema: &serde_json::Value) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: None,
        contents: vec![Content::user(prompt)],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(to_gemini_schema(schema)),
            ..GenerationConfig::default()
        }),
    }
}

#[async_trait]
impl ChatBackend for GeminiAdapter {
    async fn send_chat(&self, config: &ChatConfig, history: &[ChatMessage]) -> Result<String> {
        self.client
            .generate_text(&chat_request(config, history))
            .await
            .context("Gemini chat turn failed")
    }
}

#[async_trait]
impl StructuredBackend for GeminiAdapter {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<String> {
        self.client
            .generate_text(&structured_request(prompt, schema))
            .await
            .context("Gemini structured generation failed")
    }
}
