use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::types::Medium;
use crate::engine::compiler::CompiledPaper;
use crate::services::paper_snapshot::{InstituteMetadata, LayoutOptions, PaperUpdate, StoredPaper};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct PaperPatch {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must be 1..255 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) medium: Option<Medium>,
    #[serde(default, alias = "showAnswerKey")]
    pub(crate) show_answer_key: Option<bool>,
    #[serde(default)]
    pub(crate) institute: Option<InstituteMetadata>,
    #[serde(default)]
    pub(crate) layout: Option<LayoutOptions>,
    #[serde(default, alias = "timeAllowed")]
    pub(crate) time_allowed: Option<String>,
}

impl PaperPatch {
    pub(crate) fn into_update(self) -> PaperUpdate {
        PaperUpdate {
            title: self.title,
            medium: self.medium,
            show_answer_key: self.show_answer_key,
            institute: self.institute,
            layout: self.layout,
            time_allowed: self.time_allowed,
        }
    }
}

/// Stored paper together with its rendering, compiled from the snapshot.
#[derive(Debug, Serialize)]
pub(crate) struct PaperDetail {
    #[serde(flatten)]
    pub(crate) paper: StoredPaper,
    pub(crate) compiled: CompiledPaper,
}

impl From<StoredPaper> for PaperDetail {
    fn from(paper: StoredPaper) -> Self {
        let compiled = paper.snapshot.compile();
        Self { paper, compiled }
    }
}
