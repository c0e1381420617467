use anyhow::{Context, Result};
use async_trait::async_trait;
use interview_core::backend::{ChatBackend, ChatConfig, ChatMessage, ChatRole, StructuredBackend};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};

pub const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Message,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub content: Option<String>,
}

/// Chat Completions client for the OpenAI provider.
pub struct OpenAiClient {
    client: Client,
    api_key: SecretString,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: SecretString, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    async fn complete(&self, body: &Value) -> Result<String> {
        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .context("Failed to reach the chat completions endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completions request failed with {status}: {text}");
        }

        let resp = response
            .json::<LlmResponse>()
            .await
            .context("Failed to decode chat completions response")?;
        first_content(resp)
    }
}

fn first_content(resp: LlmResponse) -> Result<String> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow::anyhow!("No response from LLM"))
}

pub fn chat_body(model: &str, config: &ChatConfig, history: &[ChatMessage]) -> Value {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !config.system_instruction.is_empty() {
        messages.push(json!({ "role": "system", "content": config.system_instruction }));
    }
    messages.extend(history.iter().map(|message| {
        let role = match message.role {
            ChatRole::User => "user",
            ChatRole::Model => "assistant",
        };
        json!({ "role": role, "content": message.text })
    }));

    json!({
        "model": model,
        "messages": messages,
        "temperature": config.temperature,
        "top_p": config.top_p,
    })
}

/// JSON mode only guarantees syntactically valid JSON, so the schema travels in
/// the system message.
pub fn structured_body(model: &str, prompt: &str, schema: &Value) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": format!("Respond only with a JSON object matching this JSON Schema:\n{schema}")
            },
            { "role": "user", "content": prompt }
        ],
        "response_format": { "type": "json_object" }
    })
}

#[async_trait]
impl ChatBackend for OpenAiClient {
    async fn send_chat(&self, config: &ChatConfig, history: &[ChatMessage]) -> Result<String> {
        self.complete(&chat_body(&self.model, config, history)).await
    }
}

#[async_trait]
impl StructuredBackend for OpenAiClient {
    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<String> {
        self.complete(&structured_body(&self.model, prompt, schema))
            .await
    }
}
