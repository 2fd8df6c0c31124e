//! Decides whether a stored question type satisfies a requested slot type.

use crate::engine::model::MCQ_TYPE;

/// English objective sub-categories stored as their own type.
const ENGLISH_OBJECTIVE_SUBTYPES: [&str; 4] = ["VERB", "SPELLING", "MEANING", "GRAMMAR"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct TypeMatcher {
    english_style: bool,
}

impl TypeMatcher {
    pub(crate) fn new(english_style: bool) -> Self {
        Self { english_style }
    }

    /// Subjects whose name contains "english" get the looser rules.
    pub(crate) fn for_subject(subject: Option<&str>) -> Self {
        let english_style = subject
            .map(|value| value.to_ascii_lowercase().contains("english"))
            .unwrap_or(false);
        Self::new(english_style)
    }

    pub(crate) fn is_english_style(&self) -> bool {
        self.english_style
    }

    pub(crate) fn matches(&self, question_type: &str, requested_type: &str) -> bool {
        let stored = question_type.trim().to_ascii_uppercase();
        let requested = requested_type.trim().to_ascii_uppercase();

        if stored == requested {
            return true;
        }
        if !self.english_style {
            return false;
        }
        if requested == MCQ_TYPE && ENGLISH_OBJECTIVE_SUBTYPES.contains(&stored.as_str()) {
            return true;
        }
        // An empty side would be a substring of everything.
        if stored.is_empty() || requested.is_empty() {
            return false;
        }
        stored.contains(&requested) || requested.contains(&stored)
    }
}

/// Types whose answers belong in the answer key even without free-text content.
pub(crate) fn is_objective_type(question_type: &str) -> bool {
    let normalized = question_type.trim().to_ascii_uppercase();
    normalized == MCQ_TYPE || ENGLISH_OBJECTIVE_SUBTYPES.contains(&normalized.as_str())
}
