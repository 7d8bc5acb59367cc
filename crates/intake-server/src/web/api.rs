//! JSON API handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use intake_core::{
    HistoryEntry, InputModality, IntakeError, SelectedTeam, Team, TemplateCatalog,
};
use intake_ops::EditOutcome;
use intake_state::{Input, PhaseKind, TurnOutcome, UserAction};

use super::error::{ApiError, ApiResult};
use crate::app::SharedState;

fn session_key(session_id: &str) -> String {
    format!("web:{}", session_id)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub modality: InputModality,
    #[serde(default)]
    pub team: Option<SelectedTeam>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub session_id: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub session_id: String,
    pub action: UserAction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,
    #[serde(flatten)]
    pub outcome: TurnOutcome,
}

impl TurnResponse {
    fn new(session_id: String, outcome: TurnOutcome) -> Self {
        Self {
            session_id,
            ticket: outcome.ticket().map(String::from),
            outcome,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditTaskRequest {
    pub current_task: String,
    pub edit_instructions: String,
    pub team_id: String,
    #[serde(default)]
    pub subtype_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TeamsResponse {
    pub teams: Vec<Team>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub template: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub items: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub speech: bool,
    pub telegram: bool,
}

/// GET /api/health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        speech: state.engine.can_transcribe(),
        telegram: state.telegram.is_some(),
    })
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<SharedState>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<TurnResponse> {
    if req.text.trim().is_empty() {
        return Err(ApiError::bad_request("Task text must not be empty"));
    }
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let input = Input::Submit {
        text: req.text,
        modality: req.modality,
        team: req.team,
    };
    let outcome = state.engine.handle(&session_key(&session_id), input).await?;
    Ok(Json(TurnResponse::new(session_id, outcome)))
}

/// POST /api/answers
pub async fn submit_answer(
    State(state): State<SharedState>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<TurnResponse> {
    let key = session_key(&req.session_id);
    let phase = state.engine.state(&key).await?.kind();
    if phase == PhaseKind::Idle {
        return Err(ApiError::conflict(format!(
            "Session '{}' is not waiting for an answer",
            req.session_id
        )));
    }
    let outcome = state.engine.handle(&key, Input::Text(req.answer)).await?;
    Ok(Json(TurnResponse::new(req.session_id, outcome)))
}

/// POST /api/actions
pub async fn submit_action(
    State(state): State<SharedState>,
    Json(req): Json<ActionRequest>,
) -> ApiResult<TurnResponse> {
    let outcome = state
        .engine
        .handle(&session_key(&req.session_id), Input::Action(req.action))
        .await?;
    Ok(Json(TurnResponse::new(req.session_id, outcome)))
}

/// POST /api/edit-task
///
/// Stateless: the ticket body travels with the request.
pub async fn edit_task(
    State(state): State<SharedState>,
    Json(req): Json<EditTaskRequest>,
) -> ApiResult<EditOutcome> {
    if req.current_task.trim().is_empty() || req.edit_instructions.trim().is_empty() {
        return Err(ApiError::bad_request(
            "currentTask and editInstructions are required",
        ));
    }
    let team = state
        .catalog
        .select(&req.team_id, req.subtype_id.as_deref())
        .ok_or_else(|| IntakeError::UnknownTeam(req.team_id.clone()))?;

    let outcome = state
        .engine
        .operations()
        .editor
        .edit(&req.current_task, &req.edit_instructions, &team)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/teams
pub async fn list_teams(State(state): State<SharedState>) -> Json<TeamsResponse> {
    Json(TeamsResponse {
        teams: state.catalog.teams(),
    })
}

/// PUT /api/teams/:team/template
pub async fn update_team_template(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
    Json(req): Json<TemplateRequest>,
) -> Result<StatusCode, ApiError> {
    state.catalog.update_template(&team_id, None, req.template)?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/teams/:team/subtypes/:subtype/template
pub async fn update_subtype_template(
    State(state): State<SharedState>,
    Path((team_id, subtype_id)): Path<(String, String)>,
    Json(req): Json<TemplateRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .update_template(&team_id, Some(&subtype_id), req.template)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/teams/:team/template/reset
pub async fn reset_team_template(
    State(state): State<SharedState>,
    Path(team_id): Path<String>,
) -> ApiResult<ResetResponse> {
    let reset = state.catalog.reset_template(&team_id, None)?;
    Ok(Json(ResetResponse { reset }))
}

/// POST /api/teams/:team/subtypes/:subtype/template/reset
pub async fn reset_subtype_template(
    State(state): State<SharedState>,
    Path((team_id, subtype_id)): Path<(String, String)>,
) -> ApiResult<ResetResponse> {
    let reset = state.catalog.reset_template(&team_id, Some(&subtype_id))?;
    Ok(Json(ResetResponse { reset }))
}

/// GET /api/history
pub async fn list_history(State(state): State<SharedState>) -> ApiResult<HistoryResponse> {
    let items = match state.engine.history() {
        Some(history) => history.list().await?,
        None => Vec::new(),
    };
    Ok(Json(HistoryResponse { items }))
}

/// DELETE /api/history/:id
pub async fn delete_history_item(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = match state.engine.history() {
        Some(history) => history.remove(&id).await?,
        None => false,
    };
    if !removed {
        return Err(ApiError::not_found(format!("History entry '{}' not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/history
pub async fn clear_history(State(state): State<SharedState>) -> Result<StatusCode, ApiError> {
    if let Some(history) = state.engine.history() {
        history.clear().await?;
        info!("History cleared");
    }
    Ok(StatusCode::NO_CONTENT)
}
