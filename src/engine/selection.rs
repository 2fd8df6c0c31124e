use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::engine::bank::QuestionPool;
use crate::engine::chapters::ChapterIndex;
use crate::engine::model::{PaperSection, Question, SlotSpec};
use crate::engine::type_matcher::TypeMatcher;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum SelectionError {
    #[error("Section {0} is not part of the pattern")]
    UnknownSection(String),
    #[error("Question {0} is not in the loaded pool")]
    UnknownQuestion(String),
    #[error("Slot (unit {unit_index}, part {part_index}) is outside section {section_id}")]
    SlotOutOfRange { section_id: String, unit_index: usize, part_index: usize },
}

/// Chosen question ids per section. Each list is indexed by slot; `None` marks a blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub(crate) struct SelectionState {
    sections: BTreeMap<String, Vec<Option<String>>>,
}

impl SelectionState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn slots(&self, section_id: &str) -> &[Option<String>] {
        self.sections.get(section_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn filled_ids(&self, section_id: &str) -> impl Iterator<Item = &str> {
        self.slots(section_id).iter().filter_map(|slot| slot.as_deref())
    }

    pub(crate) fn filled_count(&self, section_id: &str) -> usize {
        self.filled_ids(section_id).count()
    }

    pub(crate) fn total_filled(&self) -> usize {
        self.sections.keys().map(|id| self.filled_count(id)).sum()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.total_filled() == 0
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, section_id: &str, question_id: &str) -> bool {
        self.position(section_id, question_id).is_some()
    }

    pub(crate) fn clear_section(&mut self, section_id: &str) {
        self.sections.remove(section_id);
    }

    pub(crate) fn clear(&mut self) {
        self.sections.clear();
    }

    fn position(&self, section_id: &str, question_id: &str) -> Option<usize> {
        self.slots(section_id)
            .iter()
            .position(|slot| slot.as_deref() == Some(question_id))
    }

    fn set_slot(&mut self, section_id: &str, index: usize, value: Option<String>) -> Option<String> {
        let slots = self.sections.entry(section_id.to_string()).or_default();
        if slots.len() <= index {
            slots.resize(index + 1, None);
        }
        let previous = std::mem::replace(&mut slots[index], value);
        Self::trim(slots);
        previous
    }

    fn remove_at(&mut self, section_id: &str, index: usize, compact: bool) {
        let Some(slots) = self.sections.get_mut(section_id) else {
            return;
        };
        if index >= slots.len() {
            return;
        }
        if compact {
            slots.remove(index);
        } else {
            slots[index] = None;
        }
        Self::trim(slots);
    }

    fn trim(slots: &mut Vec<Option<String>>) {
        while matches!(slots.last(), Some(None)) {
            slots.pop();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(crate) enum ToggleOutcome {
    Added { slot: usize },
    Removed { slot: usize },
    CapacityReached { capacity: usize },
    NoMatchingSlot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(crate) enum SwapOutcome {
    Swapped { slot: usize, replaced: Option<String> },
    Unchanged,
    DuplicateInSection,
    ConstraintMismatch,
}

/// A single addressed slot with the constraints that apply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SlotTarget {
    pub(crate) section_id: String,
    pub(crate) unit_index: usize,
    pub(crate) part_index: usize,
    pub(crate) slot_index: usize,
    pub(crate) requested_type: String,
    pub(crate) chapter_constraint: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct SectionFill {
    pub(crate) section_id: String,
    pub(crate) filled: usize,
    pub(crate) unfilled: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct AutoFillReport {
    pub(crate) sections: Vec<SectionFill>,
}

impl AutoFillReport {
    pub(crate) fn filled(&self) -> usize {
        self.sections.iter().map(|section| section.filled).sum()
    }

    pub(crate) fn unfilled(&self) -> usize {
        self.sections.iter().map(|section| section.unfilled).sum()
    }
}

/// Applies selection policy for one pattern against one loaded pool.
///
/// Uniqueness is enforced per section only; a question may appear in two
/// different sections of the same paper.
pub(crate) struct SelectionEngine<'a> {
    sections: &'a [PaperSection],
    pool: &'a QuestionPool,
    chapters: &'a ChapterIndex,
    matcher: TypeMatcher,
}

impl<'a> SelectionEngine<'a> {
    pub(crate) fn new(
        sections: &'a [PaperSection],
        pool: &'a QuestionPool,
        chapters: &'a ChapterIndex,
        matcher: TypeMatcher,
    ) -> Self {
        Self { sections, pool, chapters, matcher }
    }

    pub(crate) fn section(&self, section_id: &str) -> Result<&'a PaperSection, SelectionError> {
        self.sections
            .iter()
            .find(|section| section.id == section_id)
            .ok_or_else(|| SelectionError::UnknownSection(section_id.to_string()))
    }

    fn question(&self, question_id: &str) -> Result<&'a Question, SelectionError> {
        self.pool
            .get(question_id)
            .ok_or_else(|| SelectionError::UnknownQuestion(question_id.to_string()))
    }

    fn accepts(&self, section: &PaperSection, slot: &SlotSpec, question: &Question) -> bool {
        let part = section.part(slot);
        self.matcher.matches(&question.question_type, section.requested_type(part))
            && self
                .chapters
                .satisfies(&question.chapter_id, section.chapter_constraint(part))
    }

    fn slot_specs(section: &PaperSection) -> impl Iterator<Item = SlotSpec> + '_ {
        (0..section.capacity()).filter_map(|index| section.slot(index))
    }

    /// Questions that at least one slot of the section would accept.
    pub(crate) fn candidates(&self, section_id: &str) -> Result<Vec<&'a Question>, SelectionError> {
        let section = self.section(section_id)?;
        Ok(self
            .pool
            .iter()
            .filter(|question| Self::slot_specs(section).any(|slot| self.accepts(section, &slot, question)))
            .collect())
    }

    /// Removes the question when present, otherwise places it in the first open slot that accepts it.
    pub(crate) fn toggle(
        &self,
        state: &mut SelectionState,
        section_id: &str,
        question_id: &str,
    ) -> Result<ToggleOutcome, SelectionError> {
        let section = self.section(section_id)?;

        if let Some(index) = state.position(section_id, question_id) {
            state.remove_at(section_id, index, section.sub_parts.is_empty());
            return Ok(ToggleOutcome::Removed { slot: index });
        }

        let question = self.question(question_id)?;
        let capacity = section.capacity();
        if state.filled_count(section_id) >= capacity {
            return Ok(ToggleOutcome::CapacityReached { capacity });
        }

        let slots = state.slots(section_id);
        let open = Self::slot_specs(section).find(|slot| {
            slots.get(slot.index).map(Option::is_none).unwrap_or(true)
                && self.accepts(section, slot, question)
        });

        match open {
            Some(slot) => {
                state.set_slot(section_id, slot.index, Some(question.id.clone()));
                Ok(ToggleOutcome::Added { slot: slot.index })
            }
            None => Ok(ToggleOutcome::NoMatchingSlot),
        }
    }

    pub(crate) fn slot_target(
        &self,
        section_id: &str,
        unit_index: usize,
        part_index: usize,
    ) -> Result<SlotTarget, SelectionError> {
        let section = self.section(section_id)?;
        let out_of_range = || SelectionError::SlotOutOfRange {
            section_id: section_id.to_string(),
            unit_index,
            part_index,
        };
        let slot_index = section.slot_index(unit_index, part_index).ok_or_else(out_of_range)?;
        let slot = section.slot(slot_index).ok_or_else(out_of_range)?;
        let part = section.part(&slot);

        Ok(SlotTarget {
            section_id: section.id.clone(),
            unit_index,
            part_index,
            slot_index,
            requested_type: section.requested_type(part).to_string(),
            chapter_constraint: section.chapter_constraint(part).to_vec(),
        })
    }

    /// Eligible replacements for a slot; questions already used in the section are excluded.
    pub(crate) fn swap_candidates(
        &self,
        state: &SelectionState,
        target: &SlotTarget,
    ) -> Result<Vec<&'a Question>, SelectionError> {
        let section = self.section(&target.section_id)?;
        let slot = self.target_slot(section, target)?;
        let used: HashSet<&str> = state.filled_ids(&target.section_id).collect();
        Ok(self
            .pool
            .iter()
            .filter(|question| !used.contains(question.id.as_str()) && self.accepts(section, &slot, question))
            .collect())
    }

    fn target_slot(&self, section: &PaperSection, target: &SlotTarget) -> Result<SlotSpec, SelectionError> {
        section.slot(target.slot_index).ok_or_else(|| SelectionError::SlotOutOfRange {
            section_id: target.section_id.clone(),
            unit_index: target.unit_index,
            part_index: target.part_index,
        })
    }

    /// Writes a question into the addressed slot, extending the list with blanks when needed.
    pub(crate) fn swap(
        &self,
        state: &mut SelectionState,
        target: &SlotTarget,
        question_id: &str,
    ) -> Result<SwapOutcome, SelectionError> {
        let section = self.section(&target.section_id)?;
        let slot = self.target_slot(section, target)?;
        let question = self.question(question_id)?;

        match state.position(&target.section_id, question_id) {
            Some(index) if index == slot.index => return Ok(SwapOutcome::Unchanged),
            Some(_) => return Ok(SwapOutcome::DuplicateInSection),
            None => {}
        }
        if !self.accepts(section, &slot, question) {
            return Ok(SwapOutcome::ConstraintMismatch);
        }

        let replaced = state.set_slot(&target.section_id, slot.index, Some(question.id.clone()));
        Ok(SwapOutcome::Swapped { slot: slot.index, replaced })
    }

    pub(crate) fn clear(&self, state: &mut SelectionState, section_id: &str) -> Result<(), SelectionError> {
        self.section(section_id)?;
        state.clear_section(section_id);
        Ok(())
    }

    /// Fills every empty slot with a random unused candidate, in slot order.
    ///
    /// Slots with no remaining candidate stay blank. `section_ids` limits the
    /// pass to those sections; `None` fills the whole pattern.
    pub(crate) fn auto_fill<R: Rng + ?Sized>(
        &self,
        state: &mut SelectionState,
        section_ids: Option<&[String]>,
        rng: &mut R,
    ) -> Result<AutoFillReport, SelectionError> {
        let targets: Vec<&PaperSection> = match section_ids {
            Some(ids) => ids.iter().map(|id| self.section(id)).collect::<Result<_, _>>()?,
            None => self.sections.iter().collect(),
        };

        let mut report = AutoFillReport::default();
        for section in targets {
            let mut fill = SectionFill { section_id: section.id.clone(), ..SectionFill::default() };
            let mut used: HashSet<String> = state.filled_ids(&section.id).map(str::to_string).collect();

            for slot in Self::slot_specs(section) {
                let occupied = state
                    .slots(&section.id)
                    .get(slot.index)
                    .map(Option::is_some)
                    .unwrap_or(false);
                if occupied {
                    continue;
                }

                let candidates: Vec<&Question> = self
                    .pool
                    .iter()
                    .filter(|question| !used.contains(&question.id) && self.accepts(section, &slot, question))
                    .collect();

                match candidates.choose(rng) {
                    Some(question) => {
                        used.insert(question.id.clone());
                        state.set_slot(&section.id, slot.index, Some(question.id.clone()));
                        fill.filled += 1;
                    }
                    None => fill.unfilled += 1,
                }
            }
            report.sections.push(fill);
        }
        Ok(report)
    }

    /// Blanks slots whose question left the pool or no longer fits its slot.
    pub(crate) fn reconcile(&self, state: &mut SelectionState) -> usize {
        let mut removed = 0;
        for section in self.sections {
            let compact = section.sub_parts.is_empty();
            let stale: Vec<usize> = state
                .slots(&section.id)
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| {
                    let id = slot.as_deref()?;
                    let keep = match (self.pool.get(id), section.slot(index)) {
                        (Some(question), Some(spec)) => self.accepts(section, &spec, question),
                        _ => false,
                    };
                    (!keep).then_some(index)
                })
                .collect();

            for index in stale.into_iter().rev() {
                state.remove_at(&section.id, index, compact);
                removed += 1;
            }
        }
        removed
    }
}
