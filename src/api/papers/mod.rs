mod handlers;

use axum::{routing::get, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_papers))
        .route("/:paper_id", get(handlers::get_paper).patch(handlers::update_paper))
}
