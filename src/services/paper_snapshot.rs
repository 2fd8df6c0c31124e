//! Saved papers embed their questions so later bank edits never alter them.

use serde::{Deserialize, Serialize};

use crate::db::types::Medium;
use crate::engine::compiler::{self, CompileOptions, CompiledPaper, ResolvedQuestion};
use crate::engine::model::PaperSection;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct InstituteMetadata {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) address: Option<String>,
    #[serde(default)]
    pub(crate) logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct LayoutOptions {
    #[serde(default = "default_font_size")]
    pub(crate) font_size: f64,
    #[serde(default = "default_line_spacing")]
    pub(crate) line_spacing: f64,
    #[serde(default)]
    pub(crate) urdu_font: Option<String>,
}

fn default_font_size() -> f64 {
    12.0
}

fn default_line_spacing() -> f64 {
    1.15
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self { font_size: default_font_size(), line_spacing: default_line_spacing(), urdu_font: None }
    }
}

/// Everything a renderer needs to print the paper again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PaperSnapshot {
    pub(crate) title: String,
    pub(crate) class_level: String,
    pub(crate) subject: String,
    pub(crate) pattern_id: Option<String>,
    pub(crate) pattern_name: Option<String>,
    pub(crate) time_allowed: Option<String>,
    pub(crate) medium: Medium,
    pub(crate) show_answer_key: bool,
    #[serde(default)]
    pub(crate) institute: InstituteMetadata,
    #[serde(default)]
    pub(crate) layout: LayoutOptions,
    pub(crate) total_marks: f64,
    pub(crate) effective_sections: Vec<PaperSection>,
    pub(crate) resolved_questions: Vec<ResolvedQuestion>,
}

impl PaperSnapshot {
    pub(crate) fn compile(&self) -> CompiledPaper {
        compiler::compile(
            &self.effective_sections,
            &self.resolved_questions,
            CompileOptions { medium: self.medium, show_answer_key: self.show_answer_key },
        )
    }

    /// Applies a partial update; `total_marks` is recomputed from the stored sections.
    pub(crate) fn apply(&mut self, update: &PaperUpdate) {
        if let Some(title) = update.title.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            self.title = title.to_string();
        }
        if let Some(medium) = update.medium {
            self.medium = medium;
        }
        if let Some(show_answer_key) = update.show_answer_key {
            self.show_answer_key = show_answer_key;
        }
        if let Some(institute) = &update.institute {
            self.institute = institute.clone();
        }
        if let Some(layout) = &update.layout {
            self.layout = layout.clone();
        }
        if let Some(time_allowed) = &update.time_allowed {
            self.time_allowed = Some(time_allowed.clone()).filter(|value| !value.trim().is_empty());
        }
        self.total_marks = self.compile().total_marks;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct PaperUpdate {
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) medium: Option<Medium>,
    #[serde(default)]
    pub(crate) show_answer_key: Option<bool>,
    #[serde(default)]
    pub(crate) institute: Option<InstituteMetadata>,
    #[serde(default)]
    pub(crate) layout: Option<LayoutOptions>,
    #[serde(default)]
    pub(crate) time_allowed: Option<String>,
}

impl PaperUpdate {
    pub(crate) fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Result of a durable write, as reported back to the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SaveOutcome {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) paper_id: Option<String>,
}

impl SaveOutcome {
    pub(crate) fn saved(paper_id: &str, message: &str) -> Self {
        Self { success: true, message: message.to_string(), paper_id: Some(paper_id.to_string()) }
    }

    pub(crate) fn failed(message: &str) -> Self {
        Self { success: false, message: message.to_string(), paper_id: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PaperSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) subject: String,
    pub(crate) class_level: String,
    pub(crate) pattern_id: Option<String>,
    pub(crate) medium: Medium,
    pub(crate) total_marks: f64,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StoredPaper {
    #[serde(flatten)]
    pub(crate) summary: PaperSummary,
    pub(crate) snapshot: PaperSnapshot,
}
