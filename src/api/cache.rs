use axum::{
    extract::{Query, State},
    routing::delete,
    Json, Router,
};

use crate::core::state::AppState;
use crate::schemas::cache::{CacheClearQuery, CacheClearResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", delete(clear_cache))
}

/// Forces the next pattern or pool read to go back to the store.
async fn clear_cache(
    Query(params): Query<CacheClearQuery>,
    State(state): State<AppState>,
) -> Json<CacheClearResponse> {
    let cleared = state.bank().invalidate_cache(params.scope);
    tracing::info!(scope = ?params.scope, cleared, "Bank cache invalidated");
    Json(CacheClearResponse { scope: params.scope, cleared })
}
