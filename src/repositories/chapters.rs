use std::collections::HashMap;

use crate::db::models::{ChapterRow, SubtopicRow};
use crate::engine::model::Chapter;

pub(crate) const COLUMNS: &str = "\
    id, subject, class_level, name, chapter_number, order_index, is_visible, created_at, \
    updated_at";
pub(crate) const SUBTOPIC_COLUMNS: &str = "id, chapter_id, name, order_index";

pub(crate) struct ChapterFilter<'a> {
    pub(crate) subject: &'a str,
    pub(crate) class_level: &'a str,
    pub(crate) hide_invisible: bool,
}

pub(crate) async fn list(
    executor: impl sqlx::PgExecutor<'_>,
    filter: ChapterFilter<'_>,
) -> Result<Vec<ChapterRow>, sqlx::Error> {
    sqlx::query_as::<_, ChapterRow>(&format!(
        "SELECT {COLUMNS} FROM chapters
         WHERE lower(subject) = lower($1)
           AND lower(class_level) = lower($2)
           AND ($3 = FALSE OR is_visible = TRUE)
         ORDER BY order_index, name"
    ))
    .bind(filter.subject)
    .bind(filter.class_level)
    .bind(filter.hide_invisible)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_subtopics(
    executor: impl sqlx::PgExecutor<'_>,
    chapter_ids: &[String],
) -> Result<Vec<SubtopicRow>, sqlx::Error> {
    sqlx::query_as::<_, SubtopicRow>(&format!(
        "SELECT {SUBTOPIC_COLUMNS} FROM subtopics
         WHERE chapter_id = ANY($1)
         ORDER BY chapter_id, order_index, name"
    ))
    .bind(chapter_ids)
    .fetch_all(executor)
    .await
}

/// Nests subtopics under their chapters, keeping chapter order.
pub(crate) fn assemble(rows: Vec<ChapterRow>, subtopics: Vec<SubtopicRow>) -> Vec<Chapter> {
    let mut grouped = HashMap::<String, Vec<SubtopicRow>>::new();
    for subtopic in subtopics {
        grouped.entry(subtopic.chapter_id.clone()).or_default().push(subtopic);
    }

    rows.into_iter()
        .map(|row| {
            let nested = grouped.remove(&row.id).unwrap_or_default();
            row.into_chapter(nested)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn row(id: &str, name: &str) -> ChapterRow {
        let now = primitive_now_utc();
        ChapterRow {
            id: id.to_string(),
            subject: "Chemistry".to_string(),
            class_level: "10".to_string(),
            name: name.to_string(),
            chapter_number: None,
            order_index: 0,
            is_visible: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn assemble_groups_subtopics_by_chapter() {
        let subtopics = vec![
            SubtopicRow {
                id: "s2".to_string(),
                chapter_id: "c2".to_string(),
                name: "Alkanes".to_string(),
                order_index: 0,
            },
            SubtopicRow {
                id: "s1".to_string(),
                chapter_id: "c1".to_string(),
                name: "Equilibrium".to_string(),
                order_index: 0,
            },
        ];
        let chapters = assemble(vec![row("c1", "Chapter 9"), row("c2", "Chapter 12")], subtopics);

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].subtopics[0].id, "s1");
        assert_eq!(chapters[1].subtopics[0].id, "s2");
        assert_eq!(chapters[1].chapter_number, Some(12));
    }
}
