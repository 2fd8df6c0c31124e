mod handlers;
mod helpers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_session))
        .route("/:session_id", get(handlers::get_session).delete(handlers::delete_session))
        .route("/:session_id/context", put(handlers::update_context))
        .route("/:session_id/chapters", put(handlers::select_chapters))
        .route("/:session_id/subtopics", put(handlers::select_subtopics))
        .route("/:session_id/sections/:section_id/candidates", get(handlers::list_candidates))
        .route("/:session_id/sections/:section_id/clear", post(handlers::clear_section))
        .route("/:session_id/toggle", post(handlers::toggle_question))
        .route("/:session_id/auto-fill", post(handlers::auto_fill))
        .route("/:session_id/swap/begin", post(handlers::begin_swap))
        .route("/:session_id/swap/complete", post(handlers::complete_swap))
        .route("/:session_id/swap/cancel", post(handlers::cancel_swap))
        .route("/:session_id/effective", get(handlers::effective_sections))
        .route("/:session_id/preview", post(handlers::preview_paper))
        .route("/:session_id/papers", post(handlers::save_paper))
}
