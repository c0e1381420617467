//! Route handlers. Each one resolves the session, calls the wizard and answers
//! with the session's current snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use interview_core::{
    ParameterField, SessionWizard, Stage, TranscriptEntry, TurnOutcome, WizardSnapshot,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub session: WizardSnapshot,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    /// True when this reply closed the interview.
    pub complete: bool,
    pub reply: Option<TranscriptEntry>,
    pub session: SessionResponse,
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub stage: Stage,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

fn lookup(state: &AppState, id: Uuid) -> Result<Arc<SessionWizard>, ApiError> {
    state
        .session(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {id} does not exist")))
}

fn respond(id: Uuid, wizard: &SessionWizard) -> Json<SessionResponse> {
    Json(SessionResponse {
        id,
        session: wizard.snapshot(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: state.session_count(),
    })
}

pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let (id, wizard) = state.create_session();
    tracing::info!("Created session {}", id);
    (StatusCode::CREATED, respond(id, &wizard))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let wizard = lookup(&state, id)?;
    Ok(respond(id, &wizard))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let wizard = state
        .remove_session(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {id} does not exist")))?;
    // Late replies for a removed session are dropped like after a reset.
    wizard.reset();
    tracing::info!("Deleted session {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Applies every `field: value` pair in the body, or none of them if any is
/// rejected. Field names accept the same aliases as `ParameterField::from_str`.
pub async fn update_parameters(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(fields): Json<HashMap<String, String>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let wizard = lookup(&state, id)?;
    let parsed = fields
        .iter()
        .map(|(name, value)| Ok((name.parse::<ParameterField>()?, value.as_str())))
        .collect::<Result<Vec<_>, interview_core::ValidationError>>()?;
    wizard.update_parameters(&parsed)?;
    Ok(respond(id, &wizard))
}

pub async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let wizard = lookup(&state, id)?;
    wizard.start_session().await?;
    Ok(respond(id, &wizard))
}

pub async fn retry_opening(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let wizard = lookup(&state, id)?;
    wizard.retry_opening().await?;
    Ok(respond(id, &wizard))
}

pub async fn send_turn(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let wizard = lookup(&state, id)?;
    let (complete, reply) = match wizard.send_turn(&request.text).await? {
        TurnOutcome::Continue(entry) => (false, Some(entry)),
        TurnOutcome::Complete(transcript) => (true, transcript.last().cloned()),
    };
    Ok(Json(TurnResponse {
        complete,
        reply,
        session: SessionResponse {
            id,
            session: wizard.snapshot(),
        },
    }))
}

pub async fn retry_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let wizard = lookup(&state, id)?;
    wizard.retry_feedback().await?;
    Ok(respond(id, &wizard))
}

pub async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<NavigateRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let wizard = lookup(&state, id)?;
    wizard.navigate(request.stage)?;
    Ok(respond(id, &wizard))
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, ApiError> {
    let wizard = lookup(&state, id)?;
    wizard.reset();
    Ok(respond(id, &wizard))
}
