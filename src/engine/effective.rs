use crate::engine::model::PaperSection;
use crate::engine::selection::SelectionState;

/// Units whose every slot is filled.
///
/// Without blanks this is `floor(len / parts_per_question)`.
pub(crate) fn complete_units(section: &PaperSection, slots: &[Option<String>]) -> usize {
    let parts = section.parts_per_question();
    slots
        .chunks(parts)
        .take(section.question_count as usize)
        .filter(|unit| unit.len() == parts && unit.iter().all(Option::is_some))
        .count()
}

/// Recomputes section counts from what was actually picked.
///
/// MCQ block sections pass through untouched; other sections with no complete
/// unit are dropped. The input pattern is never modified.
pub(crate) fn resolve(sections: &[PaperSection], selection: &SelectionState) -> Vec<PaperSection> {
    sections
        .iter()
        .filter_map(|section| {
            if section.uses_part_blocks() {
                return Some(section.clone());
            }
            let units = complete_units(section, selection.slots(&section.id)) as u32;
            if units == 0 {
                return None;
            }
            let mut effective = section.clone();
            effective.question_count = units;
            effective.attempt_count = units.min(section.attempt_count);
            Some(effective)
        })
        .collect()
}
