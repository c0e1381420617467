use crate::config::Config;
use crate::types::{ApiErrorBody, GenerateContentRequest, GenerateContentResponse};
use anyhow::{Context, Result};
use secrecy::ExposeSecret;

/// A client for Gemini's `generateContent` REST endpoint.
///
/// Every call is stateless; multi-turn chat is expressed by sending the full
/// `contents` history each time.
pub struct GeminiClient {
    http: reqwest::Client,
    config: Config,
}

impl GeminiClient {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        tracing::debug!(
            "POST {} with {} content item(s)",
            self.config.generate_content_url(),
            request.contents.len()
        );

        let response = self
            .http
            .post(self.config.generate_content_url())
            .header("x-goog-api-key", self.config.api_key().expose_secret())
            .json(request)
            .send()
            .await
            .context("Failed to reach the Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| format!("{} ({})", e.error.message, e.error.status))
                .unwrap_or(body);
            anyhow::bail!("Gemini API returned {}: {}", status, message);
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .context("Failed to decode Gemini response")
    }

    /// Sends `request` and returns the first candidate's text.
    pub async fn generate_text(&self, request: &GenerateContentRequest) -> Result<String> {
        let response = self.generate_content(request).await?;
        if let Some(text) = response.text() {
            return Ok(text);
        }
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .or_else(|| {
                response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
            })
            .unwrap_or_else(|| "no candidates".to_string());
        Err(anyhow::anyhow!("Gemini returned no text: {}", reason))
    }
}
