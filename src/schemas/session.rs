use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::Medium;
use crate::engine::model::{Chapter, PaperPattern, PaperSection, Question};
use crate::engine::selection::{AutoFillReport, SelectionState, SlotTarget, SwapOutcome, ToggleOutcome};
use crate::services::authoring::{AuthoringContext, AuthoringSession, LoadOutcome, PaperOptions};
use crate::services::paper_snapshot::{InstituteMetadata, LayoutOptions};

/// Body of both session creation and context changes.
#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ContextRequest {
    #[serde(alias = "classLevel")]
    #[validate(length(min = 1, message = "class_level must not be empty"))]
    pub(crate) class_level: String,
    #[validate(length(min = 1, message = "subject must not be empty"))]
    pub(crate) subject: String,
    #[serde(default, alias = "patternId")]
    pub(crate) pattern_id: Option<String>,
}

impl ContextRequest {
    pub(crate) fn into_context(self) -> AuthoringContext {
        AuthoringContext {
            class_level: self.class_level.trim().to_string(),
            subject: self.subject.trim().to_string(),
            pattern_id: self
                .pattern_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChapterSelectionRequest {
    #[serde(alias = "chapterIds")]
    pub(crate) chapter_ids: Vec<String>,
    #[serde(default, alias = "bypassCache")]
    pub(crate) bypass_cache: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubtopicSelectionRequest {
    #[serde(alias = "subtopicIds")]
    pub(crate) subtopic_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ToggleRequest {
    #[serde(alias = "sectionId")]
    #[validate(length(min = 1, message = "section_id must not be empty"))]
    pub(crate) section_id: String,
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AutoFillRequest {
    #[serde(default)]
    pub(crate) seed: Option<u64>,
    #[serde(default, alias = "sectionIds")]
    pub(crate) section_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SwapBeginRequest {
    #[serde(alias = "sectionId")]
    pub(crate) section_id: String,
    #[serde(alias = "unitIndex")]
    pub(crate) unit_index: usize,
    #[serde(default, alias = "partIndex")]
    pub(crate) part_index: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SwapCompleteRequest {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PaperOptionsRequest {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) medium: Medium,
    #[serde(default, alias = "showAnswerKey")]
    pub(crate) show_answer_key: bool,
    #[serde(default)]
    pub(crate) institute: InstituteMetadata,
    #[serde(default)]
    pub(crate) layout: Option<LayoutOptions>,
    #[serde(default, alias = "timeAllowed")]
    pub(crate) time_allowed: Option<String>,
}

impl PaperOptionsRequest {
    pub(crate) fn into_options(self) -> PaperOptions {
        PaperOptions {
            title: self.title,
            medium: self.medium,
            show_answer_key: self.show_answer_key,
            institute: self.institute,
            layout: self.layout.unwrap_or_default(),
            time_allowed: self.time_allowed.filter(|value| !value.trim().is_empty()),
        }
    }
}

/// Client-facing picture of one authoring session.
#[derive(Debug, Serialize)]
pub(crate) struct SessionView {
    pub(crate) id: String,
    pub(crate) context: AuthoringContext,
    pub(crate) catalog_loaded: bool,
    pub(crate) pool_loaded: bool,
    pub(crate) pattern: Option<PaperPattern>,
    pub(crate) chapters: Vec<Chapter>,
    pub(crate) selected_chapter_ids: BTreeSet<String>,
    pub(crate) mandatory_chapter_ids: BTreeSet<String>,
    pub(crate) selected_subtopic_ids: BTreeSet<String>,
    pub(crate) pool_size: usize,
    pub(crate) filled_slots: usize,
    pub(crate) selection: SelectionState,
    pub(crate) active_swap: Option<SlotTarget>,
}

impl SessionView {
    pub(crate) fn from_session(session: &AuthoringSession) -> Self {
        Self {
            id: session.id().to_string(),
            context: session.context().clone(),
            catalog_loaded: session.is_catalog_loaded(),
            pool_loaded: session.is_pool_loaded(),
            pattern: session.pattern().cloned(),
            chapters: session.chapters().to_vec(),
            selected_chapter_ids: session.selected_chapter_ids().clone(),
            mandatory_chapter_ids: session.mandatory_chapter_ids().clone(),
            selected_subtopic_ids: session.selected_subtopic_ids().clone(),
            pool_size: session.pool().len(),
            filled_slots: session.selection().total_filled(),
            selection: session.selection().clone(),
            active_swap: session.active_swap().cloned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoadResponse {
    pub(crate) load: LoadOutcome,
    pub(crate) session: SessionView,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubtopicResponse {
    pub(crate) removed: usize,
    pub(crate) session: SessionView,
}

#[derive(Debug, Serialize)]
pub(crate) struct CandidatesResponse {
    pub(crate) section_id: String,
    pub(crate) candidates: Vec<Question>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToggleResponse {
    #[serde(flatten)]
    pub(crate) outcome: ToggleOutcome,
    pub(crate) selection: SelectionState,
}

#[derive(Debug, Serialize)]
pub(crate) struct AutoFillResponse {
    pub(crate) report: AutoFillReport,
    pub(crate) selection: SelectionState,
}

#[derive(Debug, Serialize)]
pub(crate) struct SwapBeginResponse {
    pub(crate) target: SlotTarget,
    pub(crate) candidates: Vec<Question>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SwapCompleteResponse {
    #[serde(flatten)]
    pub(crate) outcome: SwapOutcome,
    pub(crate) selection: SelectionState,
    pub(crate) active_swap: Option<SlotTarget>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EffectiveResponse {
    pub(crate) sections: Vec<PaperSection>,
    pub(crate) total_marks: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SwapCancelResponse {
    pub(crate) cancelled: bool,
}
