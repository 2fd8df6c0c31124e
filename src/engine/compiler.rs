//! Projects effective sections and resolved questions into a printable document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db::types::Medium;
use crate::engine::bank::QuestionPool;
use crate::engine::model::{PaperSection, Question};
use crate::engine::selection::SelectionState;
use crate::engine::type_matcher::is_objective_type;

pub(crate) const NO_QUESTIONS_PLACEHOLDER: &str = "No questions selected";

/// A selected question together with the slot it occupies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ResolvedQuestion {
    pub(crate) section_id: String,
    pub(crate) slot_index: usize,
    pub(crate) question: Question,
}

/// Selection order, section by section. Blank slots and ids missing from the pool are skipped.
pub(crate) fn resolve_questions(
    sections: &[PaperSection],
    selection: &SelectionState,
    pool: &QuestionPool,
) -> Vec<ResolvedQuestion> {
    let mut resolved = Vec::new();
    for section in sections {
        for (slot_index, slot) in selection.slots(&section.id).iter().enumerate() {
            let Some(question) = slot.as_deref().and_then(|id| pool.get(id)) else {
                continue;
            };
            resolved.push(ResolvedQuestion {
                section_id: section.id.clone(),
                slot_index,
                question: question.clone(),
            });
        }
    }
    resolved
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CompileOptions {
    pub(crate) medium: Medium,
    pub(crate) show_answer_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct OptionLine {
    pub(crate) label: String,
    pub(crate) text: Option<String>,
    pub(crate) text_urdu: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QuestionBody {
    pub(crate) question_id: String,
    pub(crate) question_type: String,
    pub(crate) text: Option<String>,
    pub(crate) text_urdu: Option<String>,
    pub(crate) options: Vec<OptionLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct QuestionItem {
    pub(crate) number: usize,
    pub(crate) part_label: Option<String>,
    pub(crate) marks: Option<f64>,
    #[serde(flatten)]
    pub(crate) body: QuestionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct PartItem {
    pub(crate) label: String,
    pub(crate) is_alternative: bool,
    pub(crate) marks: Option<f64>,
    #[serde(flatten)]
    pub(crate) body: QuestionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct UnitItem {
    pub(crate) number: usize,
    pub(crate) marks: Option<f64>,
    pub(crate) parts: Vec<PartItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum PaperItem {
    Question(QuestionItem),
    Unit(UnitItem),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CompiledSection {
    pub(crate) number: usize,
    pub(crate) section_id: String,
    /// Only set on the first section of a run sharing the same heading.
    pub(crate) heading: Option<String>,
    pub(crate) section_type: String,
    pub(crate) title: Option<String>,
    pub(crate) title_urdu: Option<String>,
    pub(crate) question_count: u32,
    pub(crate) attempt_count: u32,
    pub(crate) marks: Option<f64>,
    pub(crate) items: Vec<PaperItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AnswerKeyEntry {
    pub(crate) number: usize,
    pub(crate) section_number: usize,
    pub(crate) question_id: String,
    pub(crate) answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CompiledPaper {
    pub(crate) medium: Medium,
    pub(crate) total_marks: f64,
    pub(crate) sections: Vec<CompiledSection>,
    pub(crate) answer_key: Option<Vec<AnswerKeyEntry>>,
    pub(crate) placeholder: Option<String>,
}

impl CompiledPaper {
    #[cfg(test)]
    pub(crate) fn question_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|section| section.items.iter())
            .map(|item| match item {
                PaperItem::Question(_) => 1,
                PaperItem::Unit(unit) => unit.parts.len(),
            })
            .sum()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// English, Urdu or both; Urdu-only falls back to English text when a translation is missing.
fn project_text(medium: Medium, english: &str, urdu: Option<&str>) -> (Option<String>, Option<String>) {
    let urdu = non_blank(urdu);
    match medium {
        Medium::English => (Some(english.to_string()), None),
        Medium::Urdu => (None, urdu.or_else(|| Some(english.to_string()))),
        Medium::Both => (Some(english.to_string()), urdu),
    }
}

fn option_label(index: usize) -> String {
    let letter = (b'A' + (index % 26) as u8) as char;
    letter.to_string()
}

fn project_body(question: &Question, medium: Medium) -> QuestionBody {
    let (text, text_urdu) = project_text(medium, &question.text, question.text_urdu.as_deref());
    let option_count = question.options.len().max(question.options_urdu.len());
    let options = (0..option_count)
        .map(|index| {
            let english = question.options.get(index).map(String::as_str).unwrap_or_default();
            let urdu = question.options_urdu.get(index).map(String::as_str);
            let (text, text_urdu) = project_text(medium, english, urdu);
            OptionLine { label: option_label(index), text, text_urdu }
        })
        .collect();

    QuestionBody {
        question_id: question.id.clone(),
        question_type: question.question_type.clone(),
        text,
        text_urdu,
        options,
    }
}

fn project_title(section: &PaperSection, medium: Medium) -> (Option<String>, Option<String>) {
    let english = non_blank(section.title.as_deref());
    let urdu = non_blank(section.title_urdu.as_deref());
    match medium {
        Medium::English => (english, None),
        Medium::Urdu => (None, urdu.or(english)),
        Medium::Both => (english, urdu),
    }
}

fn unit_marks(section: &PaperSection) -> f64 {
    let parts: f64 = section
        .sub_parts
        .iter()
        .filter(|part| !part.is_alternative)
        .map(|part| part.marks)
        .sum();
    if parts > 0.0 {
        parts
    } else {
        section.marks_per_question
    }
}

struct SectionCompiler<'a> {
    section: &'a PaperSection,
    questions: Vec<&'a ResolvedQuestion>,
    medium: Medium,
}

impl SectionCompiler<'_> {
    fn flat_items(&self) -> Vec<(PaperItem, Vec<&Question>)> {
        let marks = self.section.show_marks.then_some(self.section.marks_per_question);
        self.questions
            .iter()
            .enumerate()
            .map(|(index, resolved)| {
                let part_label = self
                    .section
                    .slot(resolved.slot_index)
                    .and_then(|slot| self.section.part(&slot))
                    .map(|part| part.label.clone());
                let item = QuestionItem {
                    number: index + 1,
                    part_label,
                    marks,
                    body: project_body(&resolved.question, self.medium),
                };
                (PaperItem::Question(item), vec![&resolved.question])
            })
            .collect()
    }

    fn unit_items(&self) -> Vec<(PaperItem, Vec<&Question>)> {
        let parts = self.section.sub_parts.len();
        let by_slot: HashMap<usize, &ResolvedQuestion> = self
            .questions
            .iter()
            .map(|resolved| (resolved.slot_index, *resolved))
            .collect();
        let unit_total = self.section.show_marks.then(|| unit_marks(self.section));

        let last_unit = by_slot.keys().map(|slot| slot / parts).max();
        let limit = self.section.question_count as usize;

        let mut items = Vec::new();
        for unit_index in last_unit.map(|last| 0..last + 1).unwrap_or(0..0) {
            if items.len() >= limit {
                break;
            }
            let members: Option<Vec<&ResolvedQuestion>> = (0..parts)
                .map(|part_index| by_slot.get(&(unit_index * parts + part_index)).copied())
                .collect();
            let Some(members) = members else {
                continue;
            };

            let part_items = self
                .section
                .sub_parts
                .iter()
                .zip(&members)
                .map(|(part, resolved)| PartItem {
                    label: part.label.clone(),
                    is_alternative: part.is_alternative,
                    marks: self.section.show_part_marks.then_some(part.marks),
                    body: project_body(&resolved.question, self.medium),
                })
                .collect();
            let item = UnitItem { number: items.len() + 1, marks: unit_total, parts: part_items };
            let questions = members.into_iter().map(|resolved| &resolved.question).collect();
            items.push((PaperItem::Unit(item), questions));
        }
        items
    }

    fn items(&self) -> Vec<(PaperItem, Vec<&Question>)> {
        if self.section.is_mcq() || self.section.sub_parts.is_empty() {
            self.flat_items()
        } else {
            self.unit_items()
        }
    }
}

/// Builds the renderable paper.
///
/// Sections without a rendered question are skipped and later sections are
/// renumbered. Trailing partial units never render.
pub(crate) fn compile(
    effective_sections: &[PaperSection],
    resolved: &[ResolvedQuestion],
    options: CompileOptions,
) -> CompiledPaper {
    let mut by_section: HashMap<&str, Vec<&ResolvedQuestion>> = HashMap::new();
    for question in resolved {
        by_section.entry(question.section_id.as_str()).or_default().push(question);
    }

    let mut sections = Vec::new();
    let mut answer_key = Vec::new();
    let mut total_marks = 0.0;
    let mut last_heading: Option<String> = None;

    for section in effective_sections {
        let compiler = SectionCompiler {
            section,
            questions: by_section.remove(section.id.as_str()).unwrap_or_default(),
            medium: options.medium,
        };
        let items = compiler.items();
        if items.is_empty() {
            continue;
        }

        let number = sections.len() + 1;
        for question in items.iter().flat_map(|(_, questions)| questions.iter()) {
            let answer = non_blank(question.correct_answer.as_deref());
            if answer.is_some() || is_objective_type(&question.question_type) {
                answer_key.push(AnswerKeyEntry {
                    number: answer_key.len() + 1,
                    section_number: number,
                    question_id: question.id.clone(),
                    answer,
                });
            }
        }

        let heading = non_blank(section.heading.as_deref());
        let shown_heading = if heading.is_some() && heading != last_heading {
            heading.clone()
        } else {
            None
        };
        last_heading = heading;

        let (title, title_urdu) = project_title(section, options.medium);
        let marks = section.marks();
        total_marks += marks;
        sections.push(CompiledSection {
            number,
            section_id: section.id.clone(),
            heading: shown_heading,
            section_type: section.section_type.clone(),
            title,
            title_urdu,
            question_count: section.question_count,
            attempt_count: section.attempt_count,
            marks: section.show_marks.then_some(marks),
            items: items.into_iter().map(|(item, _)| item).collect(),
        });
    }

    let placeholder = sections.is_empty().then(|| NO_QUESTIONS_PLACEHOLDER.to_string());
    CompiledPaper {
        medium: options.medium,
        total_marks,
        sections,
        answer_key: options.show_answer_key.then_some(answer_key),
        placeholder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::chapters::ChapterIndex;
    use crate::engine::effective;
    use crate::engine::model::fixtures::{chapter, part, question, section};
    use crate::engine::selection::SelectionEngine;
    use crate::engine::type_matcher::TypeMatcher;

    fn mcq(id: &str, answer: &str) -> Question {
        let mut q = question(id, "MCQ", "c1");
        q.options = vec!["one".to_string(), "two".to_string(), "three".to_string(), "four".to_string()];
        q.options_urdu = vec!["ایک".to_string(), "دو".to_string()];
        q.text_urdu = Some(format!("سوال {id}"));
        q.correct_answer = Some(answer.to_string());
        q
    }

    fn build(
        sections: &[PaperSection],
        pool: &QuestionPool,
        picks: &[(&str, &str)],
        options: CompileOptions,
    ) -> CompiledPaper {
        let index = ChapterIndex::new(&[chapter("c1", "Chapter 1")]);
        let engine = SelectionEngine::new(sections, pool, &index, TypeMatcher::new(false));
        let mut state = SelectionState::new();
        for (section_id, question_id) in picks {
            engine.toggle(&mut state, section_id, question_id).expect("toggle");
        }
        let effective_sections = effective::resolve(sections, &state);
        let resolved = resolve_questions(&effective_sections, &state, pool);
        compile(&effective_sections, &resolved, options)
    }

    #[test]
    fn empty_selection_renders_placeholder() {
        let sections = vec![section("mcq", "MCQ", 2)];
        let paper = build(&sections, &QuestionPool::default(), &[], CompileOptions::default());
        assert!(paper.sections.is_empty());
        assert_eq!(paper.placeholder.as_deref(), Some(NO_QUESTIONS_PLACEHOLDER));
        assert_eq!(paper.total_marks, 0.0);
    }

    #[test]
    fn trailing_partial_unit_is_not_rendered() {
        let mut short = section("short", "SHORT", 2);
        short.sub_parts = vec![part("(a)"), part("(b)")];
        let sections = vec![short];
        let pool = QuestionPool::new(["a", "b", "c"].map(|id| question(id, "SHORT", "c1")));

        let paper = build(
            &sections,
            &pool,
            &[("short", "a"), ("short", "b"), ("short", "c")],
            CompileOptions::default(),
        );

        assert_eq!(paper.sections.len(), 1);
        let items = &paper.sections[0].items;
        assert_eq!(items.len(), 1);
        let PaperItem::Unit(unit) = &items[0] else {
            panic!("expected unit");
        };
        let ids: Vec<&str> = unit.parts.iter().map(|p| p.body.question_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(unit.marks, Some(4.0));
        assert_eq!(paper.question_count(), 2);
    }

    #[test]
    fn complete_unit_after_a_broken_unit_still_renders() {
        let mut short = section("short", "SHORT", 2);
        short.sub_parts = vec![part("(a)"), part("(b)")];
        let sections = vec![short];
        let pool = QuestionPool::new(["a", "c", "d"].map(|id| question(id, "SHORT", "c1")));
        let index = ChapterIndex::new(&[chapter("c1", "Chapter 1")]);
        let engine = SelectionEngine::new(&sections, &pool, &index, TypeMatcher::new(false));

        let mut state = SelectionState::new();
        for (unit_index, part_index, id) in [(0, 0, "a"), (1, 0, "c"), (1, 1, "d")] {
            let target = engine.slot_target("short", unit_index, part_index).expect("target");
            engine.swap(&mut state, &target, id).expect("swap");
        }

        let effective_sections = effective::resolve(&sections, &state);
        assert_eq!(effective_sections[0].question_count, 1);
        let resolved = resolve_questions(&effective_sections, &state, &pool);
        let paper = compile(&effective_sections, &resolved, CompileOptions::default());

        let PaperItem::Unit(unit) = &paper.sections[0].items[0] else {
            panic!("expected unit");
        };
        assert_eq!(unit.number, 1);
        let ids: Vec<&str> = unit.parts.iter().map(|p| p.body.question_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "d"]);
        assert_eq!(paper.sections[0].items.len(), 1);
    }

    #[test]
    fn unit_marks_skip_alternatives_and_fall_back_to_section_marks() {
        let mut with_or = section("long", "LONG", 1);
        let mut alternative = part("OR");
        alternative.is_alternative = true;
        alternative.marks = 5.0;
        let mut main = part("(a)");
        main.marks = 5.0;
        with_or.sub_parts = vec![main, alternative];
        assert_eq!(unit_marks(&with_or), 5.0);

        let mut unmarked = section("long2", "LONG", 1);
        unmarked.marks_per_question = 8.0;
        let mut bare = part("(a)");
        bare.marks = 0.0;
        unmarked.sub_parts = vec![bare];
        assert_eq!(unit_marks(&unmarked), 8.0);
    }

    #[test]
    fn sections_are_renumbered_and_headings_collapse() {
        let mut first = section("mcq", "MCQ", 2);
        first.heading = Some("Objective".to_string());
        let mut skipped = section("empty", "LONG", 1);
        skipped.heading = Some("Subjective".to_string());
        let mut second = section("short", "SHORT", 2);
        second.heading = Some("Objective".to_string());
        second.marks_per_question = 2.0;
        second.attempt_count = 1;
        let sections = vec![first, skipped, second];
        let pool = QuestionPool::new(vec![
            mcq("m1", "A"),
            mcq("m2", "C"),
            question("s1", "SHORT", "c1"),
        ]);

        let paper = build(
            &sections,
            &pool,
            &[("mcq", "m1"), ("mcq", "m2"), ("short", "s1")],
            CompileOptions::default(),
        );

        let numbers: Vec<usize> = paper.sections.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(paper.sections[0].heading.as_deref(), Some("Objective"));
        assert_eq!(paper.sections[1].heading, None);
        assert_eq!(paper.total_marks, 2.0 + 2.0);
    }

    #[test]
    fn answer_key_uses_a_paper_wide_counter() {
        let sections = vec![section("mcq", "MCQ", 2), section("short", "SHORT", 2)];
        let mut answered = question("s1", "SHORT", "c1");
        answered.correct_answer = Some("Newton".to_string());
        let pool = QuestionPool::new(vec![
            mcq("m1", "B"),
            mcq("m2", " "),
            answered,
            question("s2", "SHORT", "c1"),
        ]);

        let paper = build(
            &sections,
            &pool,
            &[("mcq", "m1"), ("mcq", "m2"), ("short", "s1"), ("short", "s2")],
            CompileOptions { medium: Medium::English, show_answer_key: true },
        );

        let key = paper.answer_key.expect("answer key");
        let rows: Vec<(usize, usize, &str, Option<&str>)> = key
            .iter()
            .map(|e| (e.number, e.section_number, e.question_id.as_str(), e.answer.as_deref()))
            .collect();
        assert_eq!(
            rows,
            vec![(1, 1, "m1", Some("B")), (2, 1, "m2", None), (3, 2, "s1", Some("Newton"))]
        );
    }

    #[test]
    fn answer_key_is_omitted_unless_requested() {
        let sections = vec![section("mcq", "MCQ", 1)];
        let pool = QuestionPool::new(vec![mcq("m1", "A")]);
        let paper = build(&sections, &pool, &[("mcq", "m1")], CompileOptions::default());
        assert!(paper.answer_key.is_none());
    }

    #[test]
    fn medium_controls_projected_text_and_option_pairing() {
        let sections = vec![section("mcq", "MCQ", 1)];
        let pool = QuestionPool::new(vec![mcq("m1", "A")]);
        let picks = [("mcq", "m1")];

        let both = build(&sections, &pool, &picks, CompileOptions { medium: Medium::Both, show_answer_key: false });
        let PaperItem::Question(item) = &both.sections[0].items[0] else {
            panic!("expected question");
        };
        assert_eq!(item.body.text.as_deref(), Some("Question m1"));
        assert_eq!(item.body.text_urdu.as_deref(), Some("سوال m1"));
        let labels: Vec<&str> = item.body.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C", "D"]);
        assert_eq!(item.body.options[1].text_urdu.as_deref(), Some("دو"));
        assert_eq!(item.body.options[3].text_urdu, None);

        let urdu = build(&sections, &pool, &picks, CompileOptions { medium: Medium::Urdu, show_answer_key: false });
        let PaperItem::Question(item) = &urdu.sections[0].items[0] else {
            panic!("expected question");
        };
        assert_eq!(item.body.text, None);
        assert_eq!(item.body.options[3].text_urdu.as_deref(), Some("four"));
    }

    #[test]
    fn marks_visibility_flags_hide_marks() {
        let mut short = section("short", "SHORT", 1);
        short.show_marks = false;
        short.show_part_marks = false;
        short.sub_parts = vec![part("(a)")];
        let sections = vec![short];
        let pool = QuestionPool::new(vec![question("s1", "SHORT", "c1")]);

        let paper = build(&sections, &pool, &[("short", "s1")], CompileOptions::default());
        let compiled = &paper.sections[0];
        assert_eq!(compiled.marks, None);
        let PaperItem::Unit(unit) = &compiled.items[0] else {
            panic!("expected unit");
        };
        assert_eq!(unit.marks, None);
        assert_eq!(unit.parts[0].marks, None);
        assert_eq!(paper.total_marks, 1.0);
    }

    #[test]
    fn mcq_blocks_render_flat_with_part_labels() {
        let mut blocks = section("mcq", "MCQ", 0);
        let mut first = part("Choose the correct verb");
        first.question_count = 1;
        let mut second = part("Spelling");
        second.question_count = 1;
        blocks.sub_parts = vec![first, second];
        blocks.sync_part_counts();
        let sections = vec![blocks];
        let pool = QuestionPool::new(vec![mcq("m1", "A"), mcq("m2", "B")]);

        let paper = build(&sections, &pool, &[("mcq", "m1"), ("mcq", "m2")], CompileOptions::default());
        let labels: Vec<(usize, Option<&str>)> = paper.sections[0]
            .items
            .iter()
            .map(|item| match item {
                PaperItem::Question(q) => (q.number, q.part_label.as_deref()),
                PaperItem::Unit(_) => panic!("unexpected unit"),
            })
            .collect();
        assert_eq!(labels, vec![(1, Some("Choose the correct verb")), (2, Some("Spelling"))]);
    }
}
