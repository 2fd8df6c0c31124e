use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::Medium;
use crate::engine::model::{Chapter, PaperPattern, PaperSection, Question, Subtopic};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ChapterRow {
    pub(crate) id: String,
    pub(crate) subject: String,
    pub(crate) class_level: String,
    pub(crate) name: String,
    pub(crate) chapter_number: Option<i32>,
    pub(crate) order_index: i32,
    pub(crate) is_visible: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SubtopicRow {
    pub(crate) id: String,
    pub(crate) chapter_id: String,
    pub(crate) name: String,
    pub(crate) order_index: i32,
}

impl ChapterRow {
    pub(crate) fn into_chapter(self, subtopics: Vec<SubtopicRow>) -> Chapter {
        Chapter {
            id: self.id,
            name: self.name,
            chapter_number: self.chapter_number.and_then(|value| u32::try_from(value).ok()),
            subtopics: subtopics
                .into_iter()
                .map(|row| Subtopic { id: row.id, name: row.name })
                .collect(),
        }
        .with_derived_number()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionRow {
    pub(crate) id: String,
    pub(crate) chapter_id: String,
    pub(crate) question_type: String,
    pub(crate) subtopic: Option<String>,
    pub(crate) text: String,
    pub(crate) text_urdu: Option<String>,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) options_urdu: Json<Vec<String>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) marks: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            question_type: row.question_type,
            chapter_id: row.chapter_id,
            subtopic: row.subtopic,
            text: row.text,
            text_urdu: row.text_urdu,
            options: row.options.0,
            options_urdu: row.options_urdu.0,
            correct_answer: row.correct_answer,
            marks: row.marks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct PatternRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) subject: Option<String>,
    pub(crate) class_level: Option<String>,
    pub(crate) time_allowed: Option<String>,
    pub(crate) sections: Json<Vec<PaperSection>>,
    pub(crate) total_marks: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl From<PatternRow> for PaperPattern {
    fn from(row: PatternRow) -> Self {
        PaperPattern {
            id: row.id,
            name: row.name,
            subject: row.subject,
            class_level: row.class_level,
            time_allowed: row.time_allowed,
            sections: row.sections.0,
            total_marks: row.total_marks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct PaperRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) class_level: String,
    pub(crate) pattern_id: Option<String>,
    pub(crate) medium: Medium,
    pub(crate) total_marks: f64,
    pub(crate) snapshot: Json<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
