use crate::backend::StructuredBackend;
use crate::error::{InterviewError, Result};
use crate::parameters::SessionParameters;
use crate::prompts::PromptSet;
use crate::transcript::{TranscriptEntry, render_entries};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// The evaluation of one finished interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResult {
    /// 0 to 100 as reported by the model. Not clamped here.
    pub score: f64,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub summary: String,
}

// Shape requested from the remote. `overallSummary` is the wire name.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackPayload {
    score: f64,
    strengths: Vec<String>,
    improvements: Vec<String>,
    overall_summary: String,
}

/// JSON Schema sent alongside the feedback prompt.
pub fn feedback_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "score": { "type": "number", "description": "Score from 0 to 100" },
            "strengths": { "type": "array", "items": { "type": "string" } },
            "improvements": { "type": "array", "items": { "type": "string" } },
            "overallSummary": { "type": "string" }
        },
        "required": ["score", "strengths", "improvements", "overallSummary"]
    })
}

/// Models sometimes wrap JSON in a Markdown fence even when asked not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Validates a structured-generation response against the feedback shape.
pub fn parse_feedback(raw: &str) -> Result<FeedbackResult> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(InterviewError::MalformedResponse(
            "empty response from model".to_string(),
        ));
    }
    let payload: FeedbackPayload = serde_json::from_str(body)
        .map_err(|e| InterviewError::MalformedResponse(format!("{e}: {body}")))?;

    Ok(FeedbackResult {
        score: payload.score,
        strengths: payload.strengths,
        improvements: payload.improvements,
        summary: payload.overall_summary,
    })
}

/// Turns a finished transcript into a [`FeedbackResult`] with one remote call.
/// Failures are returned to the caller; nothing is retried here.
pub struct FeedbackGenerator {
    backend: Arc<dyn StructuredBackend>,
    prompts: Arc<PromptSet>,
}

impl FeedbackGenerator {
    pub fn new(backend: Arc<dyn StructuredBackend>, prompts: Arc<PromptSet>) -> Self {
        Self { backend, prompts }
    }

    pub async fn generate(
        &self,
        transcript: &[TranscriptEntry],
        params: &SessionParameters,
    ) -> Result<FeedbackResult> {
        let prompt = self
            .prompts
            .feedback_prompt(params, &render_entries(transcript));

        tracing::info!(
            "Requesting feedback for a {}-entry transcript",
            transcript.len()
        );
        let raw = self
            .backend
            .generate_structured(&prompt, &feedback_schema())
            .await
            .map_err(|e| {
                tracing::error!("Feedback generation failed: {:?}", e);
                InterviewError::remote(e)
            })?;
        tracing::debug!("Raw feedback response: {}", raw);

        parse_feedback(&raw).inspect_err(|e| tracing::warn!("Rejecting feedback: {}", e))
    }
}
