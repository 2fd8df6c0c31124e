use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::engine::model::PaperPattern;
use crate::schemas::pattern::{PatternCreate, PatternListQuery};

/// Patterns bound to another subject are hidden; unbound patterns always match.
fn matches_subject(pattern: &PaperPattern, subject: Option<&str>) -> bool {
    match (subject.map(str::trim).filter(|s| !s.is_empty()), pattern.subject.as_deref()) {
        (Some(wanted), Some(bound)) => bound.trim().eq_ignore_ascii_case(wanted),
        _ => true,
    }
}

pub(super) async fn list_patterns(
    Query(params): Query<PatternListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaperPattern>>, ApiError> {
    let patterns = state
        .bank()
        .fetch_patterns()
        .await
        .map_err(|e| ApiError::from_bank(e, "Failed to load patterns"))?;

    Ok(Json(
        patterns
            .into_iter()
            .filter(|pattern| matches_subject(pattern, params.subject.as_deref()))
            .collect(),
    ))
}

pub(super) async fn create_pattern(
    State(state): State<AppState>,
    Json(payload): Json<PatternCreate>,
) -> Result<(StatusCode, Json<PaperPattern>), ApiError> {
    payload.validate().map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    let pattern = state
        .bank()
        .create_pattern(payload.into_pattern())
        .await
        .map_err(|e| ApiError::from_bank(e, "Failed to create pattern"))?;

    tracing::info!(
        pattern_id = %pattern.id,
        sections = pattern.sections.len(),
        total_marks = pattern.total_marks,
        "Pattern created"
    );
    Ok((StatusCode::CREATED, Json(pattern)))
}

pub(super) async fn get_pattern(
    Path(pattern_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PaperPattern>, ApiError> {
    state
        .bank()
        .fetch_pattern(&pattern_id)
        .await
        .map_err(|e| ApiError::from_bank(e, "Failed to load pattern"))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Pattern not found".to_string()))
}

pub(super) async fn delete_pattern(
    Path(pattern_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .bank()
        .delete_pattern(&pattern_id)
        .await
        .map_err(|e| ApiError::from_bank(e, "Failed to delete pattern"))?;

    if !deleted {
        return Err(ApiError::NotFound("Pattern not found".to_string()));
    }
    tracing::info!(pattern_id = %pattern_id, "Pattern deleted");
    Ok(StatusCode::NO_CONTENT)
}
