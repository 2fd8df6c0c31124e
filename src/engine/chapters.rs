//! Mandatory-chapter resolution.
//!
//! Patterns name chapters by number strings ("5", "05"). Chapters carry an
//! explicit number; it is only derived from the display name when missing.

use std::collections::{BTreeSet, HashMap};

use crate::engine::model::{Chapter, PaperPattern};

/// First run of ASCII digits in a chapter name.
pub(crate) fn leading_chapter_number(name: &str) -> Option<u32> {
    let digits: String = name
        .chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

fn parse_number(value: &str) -> Option<u32> {
    value.trim().parse().ok()
}

/// True when the chapter's number appears in the list. Chapters without a number never match.
pub(crate) fn is_mandatory(chapter: &Chapter, mandatory_numbers: &[String]) -> bool {
    let Some(number) = chapter.chapter_number else {
        return false;
    };
    mandatory_numbers
        .iter()
        .filter_map(|value| parse_number(value))
        .any(|candidate| candidate == number)
}

/// Ids of every loaded chapter that some section or part of the pattern requires.
pub(crate) fn mandatory_chapter_ids(chapters: &[Chapter], pattern: &PaperPattern) -> BTreeSet<String> {
    let numbers = pattern.mandatory_chapter_numbers();
    if numbers.is_empty() {
        return BTreeSet::new();
    }
    chapters
        .iter()
        .filter(|chapter| is_mandatory(chapter, &numbers))
        .map(|chapter| chapter.id.clone())
        .collect()
}

/// Lookup from chapter id to chapter number.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChapterIndex {
    numbers: HashMap<String, Option<u32>>,
}

impl ChapterIndex {
    pub(crate) fn new(chapters: &[Chapter]) -> Self {
        let numbers = chapters
            .iter()
            .map(|chapter| (chapter.id.clone(), chapter.chapter_number))
            .collect();
        Self { numbers }
    }

    pub(crate) fn contains(&self, chapter_id: &str) -> bool {
        self.numbers.contains_key(chapter_id)
    }

    /// An empty constraint accepts every chapter.
    pub(crate) fn satisfies(&self, chapter_id: &str, constraint: &[String]) -> bool {
        if constraint.is_empty() {
            return true;
        }
        match self.numbers.get(chapter_id).copied().flatten() {
            Some(number) => constraint
                .iter()
                .filter_map(|value| parse_number(value))
                .any(|candidate| candidate == number),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::fixtures::{chapter, part, section};

    #[test]
    fn extracts_first_digit_run() {
        assert_eq!(leading_chapter_number("Chapter 12: Optics 3"), Some(12));
        assert_eq!(leading_chapter_number("7-Waves"), Some(7));
        assert_eq!(leading_chapter_number("Introduction"), None);
    }

    #[test]
    fn mandatory_compares_numbers_not_strings() {
        let optics = chapter("c5", "Chapter 05 Optics");
        assert!(is_mandatory(&optics, &["5".to_string()]));
        assert!(is_mandatory(&optics, &["05".to_string()]));
        assert!(!is_mandatory(&optics, &["50".to_string()]));
    }

    #[test]
    fn unnumbered_chapters_never_match() {
        let intro = chapter("c0", "Introduction");
        assert!(!is_mandatory(&intro, &["0".to_string(), "1".to_string()]));
        let index = ChapterIndex::new(&[intro]);
        assert!(!index.satisfies("c0", &["1".to_string()]));
        assert!(index.satisfies("c0", &[]));
    }

    #[test]
    fn pattern_constraints_select_chapters_from_sections_and_parts() {
        let chapters = vec![
            chapter("c1", "Chapter 1"),
            chapter("c2", "Chapter 2"),
            chapter("c3", "Chapter 3"),
        ];
        let mut long = section("long", "LONG", 1);
        let mut constrained = part("(a)");
        constrained.specific_chapters = vec!["3".to_string()];
        long.sub_parts = vec![constrained];
        let mut short = section("short", "SHORT", 2);
        short.specific_chapters = vec!["1".to_string()];

        let pattern = PaperPattern {
            id: "p".to_string(),
            name: "Pattern".to_string(),
            subject: None,
            class_level: None,
            time_allowed: None,
            sections: vec![short, long],
            total_marks: 0.0,
        };

        let ids = mandatory_chapter_ids(&chapters, &pattern);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["c1".to_string(), "c3".to_string()]);
    }

    #[test]
    fn index_checks_unknown_chapters() {
        let index = ChapterIndex::new(&[chapter("c1", "Chapter 1")]);
        assert!(index.contains("c1"));
        assert!(!index.satisfies("missing", &["1".to_string()]));
    }
}
