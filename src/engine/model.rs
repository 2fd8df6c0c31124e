use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::chapters;

pub(crate) const MCQ_TYPE: &str = "MCQ";

/// One immutable question from the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    #[serde(rename = "type", alias = "question_type")]
    pub(crate) question_type: String,
    #[serde(alias = "chapterId")]
    pub(crate) chapter_id: String,
    #[serde(default)]
    pub(crate) subtopic: Option<String>,
    pub(crate) text: String,
    #[serde(default, alias = "textUrdu")]
    pub(crate) text_urdu: Option<String>,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default, alias = "optionsUrdu")]
    pub(crate) options_urdu: Vec<String>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    pub(crate) marks: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Subtopic {
    pub(crate) id: String,
    pub(crate) name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Chapter {
    pub(crate) id: String,
    pub(crate) name: String,
    /// Number used for mandatory-chapter matching, independent of the display name.
    #[serde(default, alias = "chapterNumber")]
    pub(crate) chapter_number: Option<u32>,
    #[serde(default)]
    pub(crate) subtopics: Vec<Subtopic>,
}

impl Chapter {
    /// Fills `chapter_number` from the display name when the bank did not store one.
    pub(crate) fn with_derived_number(mut self) -> Self {
        if self.chapter_number.is_none() {
            self.chapter_number = chapters::leading_chapter_number(&self.name);
        }
        self
    }
}

/// A fixed slot inside one compound question of a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SectionPart {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) label: String,
    #[serde(default)]
    pub(crate) marks: f64,
    #[serde(default, rename = "type", alias = "part_type")]
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

/// One numbered question block of a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PaperSection {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(rename = "type", alias = "section_type")]
    pub(crate) section_type: String,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default, alias = "titleUrdu")]
    pub(crate) title_urdu: Option<String>,
    #[serde(alias = "questionCount")]
    pub(crate) question_count: u32,
    #[serde(alias = "attemptCount")]
    pub(crate) attempt_count: u32,
    #[serde(alias = "marksPerQuestion")]
    pub(crate) marks_per_question: f64,
    #[serde(default, alias = "subParts")]
    pub(crate) sub_parts: Vec<SectionPart>,
    #[serde(default, alias = "specificChapters")]
    pub(crate) specific_chapters: Vec<String>,
    #[serde(default)]
    pub(crate) heading: Option<String>,
    #[serde(default = "default_true", alias = "showMarks")]
    pub(crate) show_marks: bool,
    #[serde(default = "default_true", alias = "showPartMarks")]
    pub(crate) show_part_marks: bool,
}

/// Position of one slot inside a section's selection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotSpec {
    pub(crate) index: usize,
    pub(crate) unit_index: usize,
    pub(crate) part_index: Option<usize>,
}

impl PaperSection {
    pub(crate) fn is_mcq(&self) -> bool {
        self.section_type.trim().eq_ignore_ascii_case(MCQ_TYPE)
    }

    pub(crate) fn parts_per_question(&self) -> usize {
        self.sub_parts.len().max(1)
    }

    /// MCQ pools sliced into labelled blocks: each part owns a contiguous run of slots.
    pub(crate) fn uses_part_blocks(&self) -> bool {
        self.is_mcq() && !self.sub_parts.is_empty()
    }

    pub(crate) fn capacity(&self) -> usize {
        if self.uses_part_blocks() {
            self.sub_parts.iter().map(|part| part.question_count as usize).sum()
        } else {
            self.question_count as usize * self.parts_per_question()
        }
    }

    pub(crate) fn marks(&self) -> f64 {
        f64::from(self.attempt_count) * self.marks_per_question
    }

    fn block_offset(&self, part_index: usize) -> usize {
        self.sub_parts
            .iter()
            .take(part_index)
            .map(|part| part.question_count as usize)
            .sum()
    }

    /// Maps a (unit, part) address to a global slot index.
    ///
    /// Block sections address `unit_index` within the part's own block, compound
    /// sections use `unit × parts + part`, flat sections only accept part 0.
    pub(crate) fn slot_index(&self, unit_index: usize, part_index: usize) -> Option<usize> {
        if self.uses_part_blocks() {
            let part = self.sub_parts.get(part_index)?;
            if unit_index >= part.question_count as usize {
                return None;
            }
            return Some(self.block_offset(part_index) + unit_index);
        }

        if unit_index >= self.question_count as usize {
            return None;
        }
        if self.sub_parts.is_empty() {
            return (part_index == 0).then_some(unit_index);
        }
        if part_index >= self.sub_parts.len() {
            return None;
        }
        Some(unit_index * self.sub_parts.len() + part_index)
    }

    pub(crate) fn slot(&self, index: usize) -> Option<SlotSpec> {
        if index >= self.capacity() {
            return None;
        }

        if self.uses_part_blocks() {
            let mut offset = 0usize;
            for (part_index, part) in self.sub_parts.iter().enumerate() {
                let size = part.question_count as usize;
                if index < offset + size {
                    return Some(SlotSpec {
                        index,
                        unit_index: index - offset,
                        part_index: Some(part_index),
                    });
                }
                offset += size;
            }
            return None;
        }

        if self.sub_parts.is_empty() {
            return Some(SlotSpec { index, unit_index: index, part_index: None });
        }

        let parts = self.sub_parts.len();
        Some(SlotSpec { index, unit_index: index / parts, part_index: Some(index % parts) })
    }

    pub(crate) fn part(&self, slot: &SlotSpec) -> Option<&SectionPart> {
        slot.part_index.and_then(|index| self.sub_parts.get(index))
    }

    /// A part's own type overrides the section type.
    pub(crate) fn requested_type<'a>(&'a self, part: Option<&'a SectionPart>) -> &'a str {
        part.and_then(|part| part.part_type.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.section_type.as_str())
    }

    /// A part's own chapter whitelist replaces the section's.
    pub(crate) fn chapter_constraint<'a>(&'a self, part: Option<&'a SectionPart>) -> &'a [String] {
        match part {
            Some(part) if !part.specific_chapters.is_empty() => &part.specific_chapters,
            _ => &self.specific_chapters,
        }
    }

    /// Keeps block-section counts equal to the sums of their part counts.
    pub(crate) fn sync_part_counts(&mut self) {
        if !self.uses_part_blocks() {
            return;
        }
        self.question_count = self.sub_parts.iter().map(|part| part.question_count).sum();
        self.attempt_count = self
            .sub_parts
            .iter()
            .map(|part| part.attempt_count.min(part.question_count))
            .sum();
    }
}

/// Reusable exam template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PaperPattern {
    #[serde(default)]
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default, alias = "classLevel")]
    pub(crate) class_level: Option<String>,
    #[serde(default, alias = "timeAllowed")]
    pub(crate) time_allowed: Option<String>,
    pub(crate) sections: Vec<PaperSection>,
    #[serde(default, alias = "totalMarks")]
    pub(crate) total_marks: f64,
}

impl PaperPattern {
    pub(crate) fn compute_total_marks(&self) -> f64 {
        self.sections.iter().map(PaperSection::marks).sum()
    }

    /// Assigns missing ids, syncs block counts, clamps attempts and refreshes the total.
    pub(crate) fn normalize(&mut self) {
        if self.id.trim().is_empty() {
            self.id = Uuid::new_v4().to_string();
        }
        for section in &mut self.sections {
            if section.id.trim().is_empty() {
                section.id = Uuid::new_v4().to_string();
            }
            for part in &mut section.sub_parts {
                if part.id.trim().is_empty() {
                    part.id = Uuid::new_v4().to_string();
                }
                part.attempt_count = part.attempt_count.min(part.question_count);
            }
            section.sync_part_counts();
            section.attempt_count = section.attempt_count.min(section.question_count);
        }
        self.total_marks = self.compute_total_marks();
    }

    /// Every chapter number named by a section or part whitelist.
    pub(crate) fn mandatory_chapter_numbers(&self) -> Vec<String> {
        let mut numbers = Vec::new();
        for section in &self.sections {
            numbers.extend(section.specific_chapters.iter().cloned());
            for part in &section.sub_parts {
                numbers.extend(part.specific_chapters.iter().cloned());
            }
        }
        numbers
    }
}

fn default_true() -> bool {
    true
}


#[cfg(test)]
mod tests {
    use super::fixtures::{part, section};
    use super::*;

    #[test]
    fn capacity_depends_on_layout() {
        let flat = section("s1", "SHORT", 5);
        assert_eq!(flat.capacity(), 5);

        let mut compound = section("s2", "LONG", 3);
        compound.sub_parts = vec![part("(a)"), part("(b)")];
        assert_eq!(compound.capacity(), 6);

        let mut blocks = section("s3", "mcq", 0);
        let mut first = part("A");
        first.question_count = 4;
        let mut second = part("B");
        second.question_count = 6;
        blocks.sub_parts = vec![first, second];
        assert!(blocks.uses_part_blocks());
        assert_eq!(blocks.capacity(), 10);
    }

    #[test]
    fn slot_index_round_trips_through_slot() {
        let mut compound = section("s", "LONG", 2);
        compound.sub_parts = vec![part("(a)"), part("(b)"), part("(c)")];
        assert_eq!(compound.slot_index(1, 2), Some(5));
        let slot = compound.slot(5).expect("slot");
        assert_eq!((slot.unit_index, slot.part_index), (1, Some(2)));
        assert_eq!(compound.slot_index(2, 0), None);
        assert_eq!(compound.slot_index(0, 3), None);
    }

    #[test]
    fn block_slots_are_addressed_within_their_part() {
        let mut blocks = section("s", "MCQ", 0);
        let mut first = part("A");
        first.question_count = 2;
        let mut second = part("B");
        second.question_count = 3;
        blocks.sub_parts = vec![first, second];

        assert_eq!(blocks.slot_index(0, 1), Some(2));
        assert_eq!(blocks.slot_index(2, 1), Some(4));
        assert_eq!(blocks.slot_index(2, 0), None);
        let slot = blocks.slot(3).expect("slot");
        assert_eq!((slot.unit_index, slot.part_index), (1, Some(1)));
    }

    #[test]
    fn flat_sections_reject_part_addresses() {
        let flat = section("s", "SHORT", 3);
        assert_eq!(flat.slot_index(2, 0), Some(2));
        assert_eq!(flat.slot_index(2, 1), None);
        assert_eq!(flat.slot(3), None);
    }

    #[test]
    fn part_type_overrides_section_type() {
        let mut compound = section("s", "LONG", 1);
        let mut typed = part("(a)");
        typed.part_type = Some("NUMERICAL".to_string());
        compound.sub_parts = vec![typed, part("(b)")];

        assert_eq!(compound.requested_type(compound.sub_parts.first()), "NUMERICAL");
        assert_eq!(compound.requested_type(compound.sub_parts.get(1)), "LONG");
        assert_eq!(compound.requested_type(None), "LONG");
    }

    #[test]
    fn normalize_syncs_block_counts_and_total() {
        let mut blocks = section("", "MCQ", 99);
        let mut first = part("A");
        first.question_count = 5;
        first.attempt_count = 5;
        let mut second = part("B");
        second.question_count = 3;
        second.attempt_count = 7;
        blocks.sub_parts = vec![first, second];

        let mut long = section("long", "LONG", 3);
        long.attempt_count = 5;
        long.marks_per_question = 8.0;

        let mut pattern = PaperPattern {
            id: String::new(),
            name: "Annual".to_string(),
            subject: None,
            class_level: None,
            time_allowed: None,
            sections: vec![blocks, long],
            total_marks: 0.0,
        };
        pattern.normalize();

        assert!(!pattern.id.is_empty());
        let blocks = &pattern.sections[0];
        assert!(!blocks.id.is_empty());
        assert_eq!(blocks.question_count, 8);
        assert_eq!(blocks.attempt_count, 8);
        assert_eq!(pattern.sections[1].attempt_count, 3);
        assert_eq!(pattern.total_marks, 8.0 + 24.0);
    }

    #[test]
    fn derived_chapter_number_is_kept_when_explicit() {
        let chapter = Chapter {
            id: "c".to_string(),
            name: "Chapter 7".to_string(),
            chapter_number: Some(3),
            subtopics: Vec::new(),
        }
        .with_derived_number();
        assert_eq!(chapter.chapter_number, Some(3));

        let derived = super::fixtures::chapter("c2", "Unit 12: Waves");
        assert_eq!(derived.chapter_number, Some(12));
    }
}
