mod handlers;

use axum::{routing::get, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_patterns).post(handlers::create_pattern))
        .route("/:pattern_id", get(handlers::get_pattern).delete(handlers::delete_pattern))
}
