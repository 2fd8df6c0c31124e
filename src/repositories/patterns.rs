use sqlx::types::Json as SqlxJson;
use time::PrimitiveDateTime;

use crate::db::models::PatternRow;
use crate::engine::model::PaperSection;

pub(crate) const COLUMNS: &str = "\
    id, name, subject, class_level, time_allowed, sections, total_marks, created_at, updated_at";

pub(crate) struct CreatePattern<'a> {
    pub(crate) id: &'a str,
    pub(crate) name: &'a str,
    pub(crate) subject: Option<&'a str>,
    pub(crate) class_level: Option<&'a str>,
    pub(crate) time_allowed: Option<&'a str>,
    pub(crate) sections: &'a [PaperSection],
    pub(crate) total_marks: f64,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn list(executor: impl sqlx::PgExecutor<'_>) -> Result<Vec<PatternRow>, sqlx::Error> {
    sqlx::query_as::<_, PatternRow>(&format!(
        "SELECT {COLUMNS} FROM paper_patterns ORDER BY name, created_at"
    ))
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<PatternRow>, sqlx::Error> {
    sqlx::query_as::<_, PatternRow>(&format!("SELECT {COLUMNS} FROM paper_patterns WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreatePattern<'_>,
) -> Result<PatternRow, sqlx::Error> {
    sqlx::query_as::<_, PatternRow>(&format!(
        "INSERT INTO paper_patterns (
            id, name, subject, class_level, time_allowed, sections, total_marks, created_at,
            updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.subject)
    .bind(params.class_level)
    .bind(params.time_allowed)
    .bind(SqlxJson(params.sections))
    .bind(params.total_marks)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(executor: impl sqlx::PgExecutor<'_>, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM paper_patterns WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
