use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::schemas::paper::{PaperDetail, PaperPatch};
use crate::services::paper_snapshot::{PaperSummary, SaveOutcome};
use crate::services::question_bank::BankError;

pub(super) async fn list_papers(State(state): State<AppState>) -> Result<Json<Vec<PaperSummary>>, ApiError> {
    let papers = state
        .bank()
        .list_papers()
        .await
        .map_err(|e| ApiError::from_bank(e, "Failed to load papers"))?;
    Ok(Json(papers))
}

pub(super) async fn get_paper(
    Path(paper_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PaperDetail>, ApiError> {
    let paper = state
        .bank()
        .fetch_paper(&paper_id)
        .await
        .map_err(|e| ApiError::from_bank(e, "Failed to load paper"))?
        .ok_or_else(|| ApiError::NotFound("Paper not found".to_string()))?;
    Ok(Json(PaperDetail::from(paper)))
}

/// Edits presentation fields of a stored paper. Question picks are frozen once saved.
/// A store failure is reported as an unsuccessful outcome, a missing paper as 404.
pub(super) async fn update_paper(
    Path(paper_id): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<PaperPatch>,
) -> Result<(StatusCode, Json<SaveOutcome>), ApiError> {
    payload.validate().map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    let update = payload.into_update();
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    match state.bank().update_paper(&paper_id, &update).await {
        Ok(outcome) => {
            tracing::info!(paper_id = %paper_id, "Paper updated");
            Ok((StatusCode::OK, Json(outcome)))
        }
        Err(err @ BankError::NotFound(_)) => Err(ApiError::from_bank(err, "Failed to update paper")),
        Err(err) => {
            tracing::warn!(paper_id = %paper_id, error = %err, "Paper update failed");
            Ok((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(SaveOutcome::failed("Failed to update paper. Please try again.")),
            ))
        }
    }
}
