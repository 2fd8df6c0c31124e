use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::model::{PaperPattern, PaperSection, SectionPart};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PatternListQuery {
    #[serde(default)]
    pub(crate) subject: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct SectionPartCreate {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[validate(length(min = 1, message = "part label must not be empty"))]
    pub(crate) label: String,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "part marks must be non-negative"))]
    pub(crate) marks: f64,
    #[serde(default, rename = "type")]
    pub(crate) part_type: Option<String>,
    #[serde(default, alias = "specificChapters")]
    pub(crate) specific_chapters: Vec<String>,
    #[serde(default, alias = "questionCount")]
    pub(crate) question_count: u32,
    #[serde(default, alias = "attemptCount")]
    pub(crate) attempt_count: u32,
    #[serde(default, alias = "isAlternative")]
    pub(crate) is_alternative: bool,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub(crate) struct SectionCreate {
    #[serde(default)]
    pub(crate) id: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "section type must not be empty"))]
    pub(crate) section_type: String,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default, alias = "titleUrdu")]
    pub(crate) title_urdu: Option<String>,
    #[serde(alias = "questionCount")]
    #[validate(range(min = 1, message = "question_count must be at least 1"))]
    pub(crate) question_count: u32,
    #[serde(default, alias = "attemptCount")]
    pub(crate) attempt_count: Option<u32>,
    #[serde(alias = "marksPerQuestion")]
    #[validate(range(min = 0.0, message = "marks_per_question must be non-negative"))]
    pub(crate) marks_per_question: f64,
    #[serde(default, alias = "subParts")]
    #[validate(nested)]
    pub(crate) sub_parts: Vec<SectionPartCreate>,
    #[serde(default, alias = "specificChapters")]
    pub(crate) specific_chapters: Vec<String>,
    #[serde(default)]
    pub(crate) heading: Option<String>,
    #[serde(default, alias = "showMarks")]
    pub(crate) show_marks: Option<bool>,
    #[serde(default, alias = "showPartMarks")]
    pub(crate) show_part_marks: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PatternCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default, alias = "classLevel")]
    pub(crate) class_level: Option<String>,
    #[serde(default, alias = "timeAllowed")]
    pub(crate) time_allowed: Option<String>,
    #[validate(length(min = 1, message = "a pattern needs at least one section"), nested)]
    pub(crate) sections: Vec<SectionCreate>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

impl From<SectionPartCreate> for SectionPart {
    fn from(part: SectionPartCreate) -> Self {
        SectionPart {
            id: part.id.unwrap_or_default(),
            label: part.label.trim().to_string(),
            marks: part.marks,
            part_type: non_blank(part.part_type),
            specific_chapters: part.specific_chapters,
            question_count: part.question_count,
            attempt_count: part.attempt_count,
            is_alternative: part.is_alternative,
        }
    }
}

impl From<SectionCreate> for PaperSection {
    fn from(section: SectionCreate) -> Self {
        PaperSection {
            id: section.id.unwrap_or_default(),
            section_type: section.section_type.trim().to_string(),
            title: non_blank(section.title),
            title_urdu: non_blank(section.title_urdu),
            question_count: section.question_count,
            attempt_count: section.attempt_count.unwrap_or(section.question_count),
            marks_per_question: section.marks_per_question,
            sub_parts: section.sub_parts.into_iter().map(SectionPart::from).collect(),
            specific_chapters: section.specific_chapters,
            heading: non_blank(section.heading),
            show_marks: section.show_marks.unwrap_or(true),
            show_part_marks: section.show_part_marks.unwrap_or(true),
        }
    }
}

impl PatternCreate {
    /// Unsaved pattern; ids and totals are filled in by normalisation.
    pub(crate) fn into_pattern(self) -> PaperPattern {
        let mut pattern = PaperPattern {
            id: String::new(),
            name: self.name.trim().to_string(),
            subject: non_blank(self.subject),
            class_level: non_blank(self.class_level),
            time_allowed: non_blank(self.time_allowed),
            sections: self.sections.into_iter().map(PaperSection::from).collect(),
            total_marks: 0.0,
        };
        pattern.normalize();
        pattern
    }
}
