use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::engine::selection::SelectionError;
use crate::services::authoring::{SessionError, SessionHandle};

pub(super) fn session_error(err: SessionError) -> ApiError {
    match err {
        SessionError::NotFound(_) => ApiError::NotFound("Authoring session not found".to_string()),
        SessionError::CapacityReached(_) => ApiError::ServiceUnavailable(err.to_string()),
        SessionError::UnknownPattern(_) => ApiError::NotFound(err.to_string()),
        SessionError::MissingPattern | SessionError::NoActiveSwap => ApiError::Conflict(err.to_string()),
        SessionError::UnknownChapter(_) | SessionError::UnknownSubtopic(_) => {
            ApiError::BadRequest(err.to_string())
        }
        SessionError::Selection(SelectionError::UnknownSection(_)) => ApiError::NotFound(err.to_string()),
        SessionError::Selection(SelectionError::UnknownQuestion(_)) => {
            ApiError::UnprocessableEntity(err.to_string())
        }
        SessionError::Selection(SelectionError::SlotOutOfRange { .. }) => {
            ApiError::BadRequest(err.to_string())
        }
        SessionError::Bank(err) => ApiError::from_bank(err, "Question bank request failed"),
    }
}

pub(super) async fn session_handle(state: &AppState, session_id: &str) -> Result<SessionHandle, ApiError> {
    state.sessions().get(session_id).await.map_err(session_error)
}

/// Decodes an optional JSON body. Only an empty body falls back to the default.
pub(super) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))
}
