use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::engine::model::Chapter;
use crate::schemas::chapter::ChapterListQuery;
use crate::services::question_bank::ChapterQuery;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_chapters))
}

async fn list_chapters(
    Query(params): Query<ChapterListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Chapter>>, ApiError> {
    params.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let query = ChapterQuery {
        subject: params.subject.trim().to_string(),
        class_level: params.class_level.trim().to_string(),
        hide_invisible: params
            .hide_invisible
            .unwrap_or(state.settings().authoring().hide_invisible_chapters),
    };
    let chapters = state
        .bank()
        .fetch_chapters(&query)
        .await
        .map_err(|e| ApiError::from_bank(e, "Failed to load chapters"))?;

    Ok(Json(chapters))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;

    use crate::test_support;

    #[tokio::test]
    async fn lists_visible_chapters_with_subtopics() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/chapters?subject=physics&class_level=9",
                None,
            ))
            .await
            .expect("list chapters");
        assert_eq!(response.status(), StatusCode::OK);
        let chapters = test_support::read_json(response).await;
        let ids: Vec<&str> =
            chapters.as_array().expect("array").iter().filter_map(|c| c["id"].as_str()).collect();
        assert_eq!(ids, vec!["ch1", "ch2", "ch3"]);
        assert_eq!(chapters[0]["chapter_number"], 1);
        assert_eq!(chapters[0]["subtopics"][1]["name"], "Velocity");

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/chapters?subject=Physics&class_level=9&hide_invisible=false",
                None,
            ))
            .await
            .expect("list all chapters");
        let chapters = test_support::read_json(response).await;
        assert_eq!(chapters.as_array().expect("array").len(), 4);
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/v1/chapters?subject=&class_level=9",
                None,
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
