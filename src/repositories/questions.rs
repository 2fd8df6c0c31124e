use crate::db::models::QuestionRow;

pub(crate) const COLUMNS: &str = "\
    id, chapter_id, question_type, subtopic, text, text_urdu, options, options_urdu, \
    correct_answer, marks, created_at, updated_at";

/// Questions of the given chapters that belong to `subject`.
pub(crate) async fn list_for_chapters(
    executor: impl sqlx::PgExecutor<'_>,
    subject: &str,
    chapter_ids: &[String],
) -> Result<Vec<QuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {columns} FROM questions q
         JOIN chapters c ON c.id = q.chapter_id
         WHERE q.chapter_id = ANY($1)
           AND lower(c.subject) = lower($2)
         ORDER BY c.order_index, q.created_at, q.id",
        columns = prefixed_columns("q")
    ))
    .bind(chapter_ids)
    .bind(subject)
    .fetch_all(executor)
    .await
}

fn prefixed_columns(alias: &str) -> String {
    COLUMNS
        .split(',')
        .map(|column| format!("{alias}.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
