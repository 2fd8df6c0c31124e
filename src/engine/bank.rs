use std::collections::{BTreeSet, HashMap};

use crate::engine::model::{Chapter, Question};

/// Loaded candidate questions, deduplicated by id and kept in load order.
#[derive(Debug, Clone, Default)]
pub(crate) struct QuestionPool {
    questions: Vec<Question>,
    positions: HashMap<String, usize>,
}

impl QuestionPool {
    pub(crate) fn new(questions: impl IntoIterator<Item = Question>) -> Self {
        let mut pool = Self::default();
        for question in questions {
            if pool.positions.contains_key(&question.id) {
                continue;
            }
            pool.positions.insert(question.id.clone(), pool.questions.len());
            pool.questions.push(question);
        }
        pool
    }

    pub(crate) fn len(&self) -> usize {
        self.questions.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Question> {
        self.positions.get(id).map(|&index| &self.questions[index])
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Pool restricted to the selected subtopics.
    ///
    /// Chapters with no selected subtopic keep every question.
    pub(crate) fn filtered_by_subtopics(&self, chapters: &[Chapter], subtopic_ids: &BTreeSet<String>) -> Self {
        if subtopic_ids.is_empty() {
            return self.clone();
        }

        let mut wanted: HashMap<&str, Vec<&str>> = HashMap::new();
        for chapter in chapters {
            for subtopic in &chapter.subtopics {
                if subtopic_ids.contains(&subtopic.id) {
                    wanted.entry(chapter.id.as_str()).or_default().push(subtopic.name.as_str());
                }
            }
        }

        Self::new(
            self.questions
                .iter()
                .filter(|question| match wanted.get(question.chapter_id.as_str()) {
                    None => true,
                    Some(names) => question
                        .subtopic
                        .as_deref()
                        .map(|tag| names.iter().any(|name| name.trim().eq_ignore_ascii_case(tag.trim())))
                        .unwrap_or(false),
                })
                .cloned(),
        )
    }
}
