use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::engine::compiler::CompiledPaper;
use crate::engine::model::PaperSection;
use crate::engine::selection::SelectionState;
use crate::schemas::session::{
    AutoFillRequest, AutoFillResponse, CandidatesResponse, ChapterSelectionRequest, ContextRequest,
    EffectiveResponse, LoadResponse, PaperOptionsRequest, SessionView, SubtopicResponse,
    SubtopicSelectionRequest, SwapBeginRequest, SwapBeginResponse, SwapCancelResponse,
    SwapCompleteRequest, SwapCompleteResponse, ToggleRequest, ToggleResponse,
};
use crate::services::authoring::{self, AuthoringContext, SessionHandle};
use crate::services::paper_snapshot::SaveOutcome;

use super::helpers::{optional_json, session_error, session_handle};

async fn view(handle: &SessionHandle) -> SessionView {
    SessionView::from_session(&*handle.lock().await)
}

async fn reload_catalog(
    state: &AppState,
    handle: &SessionHandle,
    context: AuthoringContext,
) -> Result<LoadResponse, ApiError> {
    let ticket = handle.lock().await.reset_context(context);
    let load = authoring::load_catalog(
        state.bank(),
        handle,
        ticket,
        state.settings().authoring().hide_invisible_chapters,
    )
    .await
    .map_err(session_error)?;
    Ok(LoadResponse { load, session: view(handle).await })
}

pub(super) async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<ContextRequest>,
) -> Result<(StatusCode, Json<LoadResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let context = payload.into_context();
    let handle = state.sessions().create(context.clone()).await.map_err(session_error)?;
    let session_id = handle.lock().await.id().to_string();

    match reload_catalog(&state, &handle, context).await {
        Ok(response) => Ok((StatusCode::CREATED, Json(response))),
        Err(err) => {
            state.sessions().remove(&session_id).await;
            Err(err)
        }
    }
}

pub(super) async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    Ok(Json(view(&handle).await))
}

pub(super) async fn delete_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    if state.sessions().remove(&session_id).await {
        tracing::info!(session_id = %session_id, "Authoring session closed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Authoring session not found".to_string()))
    }
}

pub(super) async fn update_context(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ContextRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let handle = session_handle(&state, &session_id).await?;
    Ok(Json(reload_catalog(&state, &handle, payload.into_context()).await?))
}

pub(super) async fn select_chapters(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ChapterSelectionRequest>,
) -> Result<Json<LoadResponse>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    let (ticket, request) = handle
        .lock()
        .await
        .select_chapters(&payload.chapter_ids, payload.bypass_cache)
        .map_err(session_error)?;

    let load = authoring::load_pool(state.bank(), &handle, ticket, request)
        .await
        .map_err(session_error)?;
    Ok(Json(LoadResponse { load, session: view(&handle).await }))
}

pub(super) async fn select_subtopics(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<SubtopicSelectionRequest>,
) -> Result<Json<SubtopicResponse>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    let mut session = handle.lock().await;
    let removed = session.select_subtopics(&payload.subtopic_ids).map_err(session_error)?;
    Ok(Json(SubtopicResponse { removed, session: SessionView::from_session(&session) }))
}

pub(super) async fn list_candidates(
    Path((session_id, section_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    let candidates = handle.lock().await.candidates(&section_id).map_err(session_error)?;
    Ok(Json(CandidatesResponse { section_id, candidates }))
}

pub(super) async fn toggle_question(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let handle = session_handle(&state, &session_id).await?;
    let mut session = handle.lock().await;
    let outcome = session
        .toggle(&payload.section_id, &payload.question_id)
        .map_err(session_error)?;
    Ok(Json(ToggleResponse { outcome, selection: session.selection().clone() }))
}

pub(super) async fn auto_fill(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AutoFillResponse>, ApiError> {
    let payload: AutoFillRequest = optional_json(&body)?;
    let handle = session_handle(&state, &session_id).await?;
    let mut session = handle.lock().await;
    let report = session
        .auto_fill(payload.section_ids.as_deref(), payload.seed)
        .map_err(session_error)?;
    Ok(Json(AutoFillResponse { report, selection: session.selection().clone() }))
}

pub(super) async fn clear_section(
    Path((session_id, section_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<SelectionState>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    let mut session = handle.lock().await;
    session.clear_section(&section_id).map_err(session_error)?;
    Ok(Json(session.selection().clone()))
}

pub(super) async fn begin_swap(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<SwapBeginRequest>,
) -> Result<Json<SwapBeginResponse>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    let (target, candidates) = handle
        .lock()
        .await
        .begin_swap(&payload.section_id, payload.unit_index, payload.part_index)
        .map_err(session_error)?;
    Ok(Json(SwapBeginResponse { target, candidates }))
}

pub(super) async fn complete_swap(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<SwapCompleteRequest>,
) -> Result<Json<SwapCompleteResponse>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    let mut session = handle.lock().await;
    let outcome = session.complete_swap(&payload.question_id).map_err(session_error)?;
    Ok(Json(SwapCompleteResponse {
        outcome,
        selection: session.selection().clone(),
        active_swap: session.active_swap().cloned(),
    }))
}

pub(super) async fn cancel_swap(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SwapCancelResponse>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    let cancelled = handle.lock().await.cancel_swap();
    Ok(Json(SwapCancelResponse { cancelled }))
}

pub(super) async fn effective_sections(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<EffectiveResponse>, ApiError> {
    let handle = session_handle(&state, &session_id).await?;
    let sections = handle.lock().await.effective_sections().map_err(session_error)?;
    let total_marks = sections.iter().map(PaperSection::marks).sum();
    Ok(Json(EffectiveResponse { sections, total_marks }))
}

pub(super) async fn preview_paper(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CompiledPaper>, ApiError> {
    let payload: PaperOptionsRequest = optional_json(&body)?;
    let handle = session_handle(&state, &session_id).await?;
    let compiled = handle.lock().await.compile(&payload.into_options()).map_err(session_error)?;
    Ok(Json(compiled))
}

pub(super) async fn save_paper(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SaveOutcome>), ApiError> {
    let payload: PaperOptionsRequest = optional_json(&body)?;
    let handle = session_handle(&state, &session_id).await?;
    let outcome = authoring::save_paper(state.bank(), &handle, &payload.into_options())
        .await
        .map_err(session_error)?;
    let status = if outcome.success { StatusCode::CREATED } else { StatusCode::SERVICE_UNAVAILABLE };
    Ok((status, Json(outcome)))
}
