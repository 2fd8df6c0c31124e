use sqlx::types::Json as SqlxJson;
use time::PrimitiveDateTime;

use crate::db::models::PaperRow;
use crate::db::types::Medium;

pub(crate) const COLUMNS: &str = "\
    id, title, subject, class_level, pattern_id, medium, total_marks, snapshot, created_at, \
    updated_at";

pub(crate) struct CreatePaper<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) subject: &'a str,
    pub(crate) class_level: &'a str,
    pub(crate) pattern_id: Option<&'a str>,
    pub(crate) medium: Medium,
    pub(crate) total_marks: f64,
    pub(crate) snapshot: serde_json::Value,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) struct UpdatePaper<'a> {
    pub(crate) title: &'a str,
    pub(crate) medium: Medium,
    pub(crate) snapshot: serde_json::Value,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreatePaper<'_>,
) -> Result<PaperRow, sqlx::Error> {
    sqlx::query_as::<_, PaperRow>(&format!(
        "INSERT INTO papers (
            id, title, subject, class_level, pattern_id, medium, total_marks, snapshot,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.subject)
    .bind(params.class_level)
    .bind(params.pattern_id)
    .bind(params.medium)
    .bind(params.total_marks)
    .bind(SqlxJson(params.snapshot))
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: UpdatePaper<'_>,
) -> Result<Option<PaperRow>, sqlx::Error> {
    sqlx::query_as::<_, PaperRow>(&format!(
        "UPDATE papers
         SET title = $2, medium = $3, snapshot = $4, updated_at = $5
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(params.title)
    .bind(params.medium)
    .bind(SqlxJson(params.snapshot))
    .bind(params.now)
    .fetch_optional(executor)
    .await
}

fn select_by_id(lock: bool) -> String {
    let lock_clause = if lock { " FOR UPDATE" } else { "" };
    format!("SELECT {COLUMNS} FROM papers WHERE id = $1{lock_clause}")
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<PaperRow>, sqlx::Error> {
    sqlx::query_as::<_, PaperRow>(&select_by_id(false))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Same as [`find_by_id`] but holds a row lock until the surrounding transaction ends.
pub(crate) async fn find_by_id_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<PaperRow>, sqlx::Error> {
    sqlx::query_as::<_, PaperRow>(&select_by_id(true))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list(
    executor: impl sqlx::PgExecutor<'_>,
    limit: i64,
) -> Result<Vec<PaperRow>, sqlx::Error> {
    sqlx::query_as::<_, PaperRow>(&format!(
        "SELECT {COLUMNS} FROM papers ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(executor)
    .await
}
