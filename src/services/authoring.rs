//! Per-author paper sessions.
//!
//! A session owns one selection state. Fetches run without holding the session
//! lock: the caller takes a [`FetchTicket`], awaits the bank, and applies the
//! result only if no newer context or chapter change happened meanwhile.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::core::metrics;
use crate::core::time::SharedClock;
use crate::db::types::Medium;
use crate::engine::bank::QuestionPool;
use crate::engine::chapters::{self, ChapterIndex};
use crate::engine::compiler::{self, CompileOptions, CompiledPaper};
use crate::engine::effective;
use crate::engine::model::{Chapter, PaperPattern, PaperSection, Question};
use crate::engine::selection::{
    AutoFillReport, SelectionEngine, SelectionError, SelectionState, SlotTarget, SwapOutcome,
    ToggleOutcome,
};
use crate::engine::type_matcher::TypeMatcher;
use crate::services::paper_snapshot::{InstituteMetadata, LayoutOptions, PaperSnapshot, SaveOutcome};
use crate::services::question_bank::{BankError, ChapterQuery, PoolRequest, QuestionBank};

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("Authoring session {0} not found")]
    NotFound(String),
    #[error("Too many active authoring sessions (limit {0})")]
    CapacityReached(usize),
    #[error("Pattern {0} not found")]
    UnknownPattern(String),
    #[error("No pattern selected for this session")]
    MissingPattern,
    #[error("Chapter {0} is not available for this class and subject")]
    UnknownChapter(String),
    #[error("Subtopic {0} does not belong to a selected chapter")]
    UnknownSubtopic(String),
    #[error("No slot swap in progress")]
    NoActiveSwap,
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Bank(#[from] BankError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct AuthoringContext {
    pub(crate) class_level: String,
    pub(crate) subject: String,
    pub(crate) pattern_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FetchKind {
    Catalog,
    Pool,
}

impl FetchKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Pool => "pool",
        }
    }
}

/// Proof of which request a fetch result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchTicket {
    kind: FetchKind,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum LoadOutcome {
    Applied,
    Stale,
}

/// Rendering choices that are not part of the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PaperOptions {
    pub(crate) title: Option<String>,
    pub(crate) medium: Medium,
    pub(crate) show_answer_key: bool,
    pub(crate) institute: InstituteMetadata,
    pub(crate) layout: LayoutOptions,
    pub(crate) time_allowed: Option<String>,
}

pub(crate) struct AuthoringSession {
    id: String,
    context: AuthoringContext,
    pattern: Option<PaperPattern>,
    chapters: Vec<Chapter>,
    chapter_index: ChapterIndex,
    selected_chapter_ids: BTreeSet<String>,
    mandatory_chapter_ids: BTreeSet<String>,
    selected_subtopic_ids: BTreeSet<String>,
    full_pool: QuestionPool,
    pool: QuestionPool,
    selection: SelectionState,
    swap: Option<SlotTarget>,
    context_generation: u64,
    pool_generation: u64,
    catalog_loaded: bool,
    pool_loaded: bool,
    last_touched: Instant,
}

impl AuthoringSession {
    pub(crate) fn new(context: AuthoringContext, now: Instant) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            context,
            pattern: None,
            chapters: Vec::new(),
            chapter_index: ChapterIndex::default(),
            selected_chapter_ids: BTreeSet::new(),
            mandatory_chapter_ids: BTreeSet::new(),
            selected_subtopic_ids: BTreeSet::new(),
            full_pool: QuestionPool::default(),
            pool: QuestionPool::default(),
            selection: SelectionState::new(),
            swap: None,
            context_generation: 0,
            pool_generation: 0,
            catalog_loaded: false,
            pool_loaded: false,
            last_touched: now,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn context(&self) -> &AuthoringContext {
        &self.context
    }

    pub(crate) fn pattern(&self) -> Option<&PaperPattern> {
        self.pattern.as_ref()
    }

    pub(crate) fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub(crate) fn selected_chapter_ids(&self) -> &BTreeSet<String> {
        &self.selected_chapter_ids
    }

    pub(crate) fn mandatory_chapter_ids(&self) -> &BTreeSet<String> {
        &self.mandatory_chapter_ids
    }

    pub(crate) fn selected_subtopic_ids(&self) -> &BTreeSet<String> {
        &self.selected_subtopic_ids
    }

    pub(crate) fn pool(&self) -> &QuestionPool {
        &self.pool
    }

    pub(crate) fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub(crate) fn active_swap(&self) -> Option<&SlotTarget> {
        self.swap.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn generations(&self) -> (u64, u64) {
        (self.context_generation, self.pool_generation)
    }

    pub(crate) fn is_catalog_loaded(&self) -> bool {
        self.catalog_loaded
    }

    pub(crate) fn is_pool_loaded(&self) -> bool {
        self.pool_loaded
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_touched = now;
    }

    pub(crate) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_touched)
    }

    fn matcher(&self) -> TypeMatcher {
        TypeMatcher::for_subject(Some(&self.context.subject))
    }

    fn sections(&self) -> Result<&[PaperSection], SessionError> {
        self.pattern
            .as_ref()
            .map(|pattern| pattern.sections.as_slice())
            .ok_or(SessionError::MissingPattern)
    }

    fn clear_pool_state(&mut self) {
        self.full_pool = QuestionPool::default();
        self.pool = QuestionPool::default();
        self.selection.clear();
        self.swap = None;
        self.selected_subtopic_ids.clear();
        self.pool_loaded = false;
    }

    /// Replaces the context and drops every derived value before any fetch starts.
    pub(crate) fn reset_context(&mut self, context: AuthoringContext) -> FetchTicket {
        self.context = context;
        self.pattern = None;
        self.chapters.clear();
        self.chapter_index = ChapterIndex::default();
        self.selected_chapter_ids.clear();
        self.mandatory_chapter_ids.clear();
        self.clear_pool_state();
        self.catalog_loaded = false;
        self.context_generation += 1;
        self.pool_generation += 1;
        tracing::info!(
            session_id = %self.id,
            subject = %self.context.subject,
            class_level = %self.context.class_level,
            generation = self.context_generation,
            "Authoring context reset"
        );
        FetchTicket { kind: FetchKind::Catalog, generation: self.context_generation }
    }

    pub(crate) fn catalog_query(&self, hide_invisible: bool) -> ChapterQuery {
        ChapterQuery {
            subject: self.context.subject.clone(),
            class_level: self.context.class_level.clone(),
            hide_invisible,
        }
    }

    fn is_current(&self, ticket: FetchTicket) -> bool {
        match ticket.kind {
            FetchKind::Catalog => ticket.generation == self.context_generation,
            FetchKind::Pool => ticket.generation == self.pool_generation,
        }
    }

    fn discard(&self, ticket: FetchTicket) -> LoadOutcome {
        metrics::record_stale_response(ticket.kind.as_str());
        tracing::debug!(
            session_id = %self.id,
            kind = ticket.kind.as_str(),
            ticket_generation = ticket.generation,
            "Discarding stale fetch result"
        );
        LoadOutcome::Stale
    }

    /// Installs chapters and pattern; mandatory chapters become selected.
    pub(crate) fn apply_catalog(
        &mut self,
        ticket: FetchTicket,
        chapters: Vec<Chapter>,
        pattern: Option<PaperPattern>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            return self.discard(ticket);
        }

        self.chapter_index = ChapterIndex::new(&chapters);
        self.mandatory_chapter_ids = pattern
            .as_ref()
            .map(|pattern| chapters::mandatory_chapter_ids(&chapters, pattern))
            .unwrap_or_default();
        self.selected_chapter_ids = self.mandatory_chapter_ids.clone();
        self.chapters = chapters;
        self.pattern = pattern;
        self.catalog_loaded = true;
        tracing::info!(
            session_id = %self.id,
            chapters = self.chapters.len(),
            mandatory = self.mandatory_chapter_ids.len(),
            "Chapter catalog loaded"
        );
        LoadOutcome::Applied
    }

    /// Selects chapters (mandatory ones always stay) and clears the old pool and selection.
    pub(crate) fn select_chapters(
        &mut self,
        chapter_ids: &[String],
        bypass_cache: bool,
    ) -> Result<(FetchTicket, PoolRequest), SessionError> {
        if let Some(unknown) = chapter_ids.iter().find(|id| !self.chapter_index.contains(id)) {
            return Err(SessionError::UnknownChapter(unknown.clone()));
        }

        let mut selected: BTreeSet<String> = chapter_ids.iter().cloned().collect();
        selected.extend(self.mandatory_chapter_ids.iter().cloned());
        self.selected_chapter_ids = selected;
        self.clear_pool_state();
        self.pool_generation += 1;

        let request = PoolRequest {
            subject: self.context.subject.clone(),
            chapter_ids: self.selected_chapter_ids.iter().cloned().collect(),
            bypass_cache,
        };
        Ok((FetchTicket { kind: FetchKind::Pool, generation: self.pool_generation }, request))
    }

    pub(crate) fn apply_pool(&mut self, ticket: FetchTicket, questions: Vec<Question>) -> LoadOutcome {
        if !self.is_current(ticket) {
            return self.discard(ticket);
        }

        let selected = &self.selected_chapter_ids;
        self.full_pool =
            QuestionPool::new(questions.into_iter().filter(|question| selected.contains(&question.chapter_id)));
        self.pool = self.full_pool.clone();
        self.pool_loaded = true;
        tracing::info!(session_id = %self.id, questions = self.pool.len(), "Question pool loaded");
        LoadOutcome::Applied
    }

    /// Narrows the pool to subtopics and blanks picks that fall outside it.
    pub(crate) fn select_subtopics(&mut self, subtopic_ids: &[String]) -> Result<usize, SessionError> {
        let known: HashMap<&str, &str> = self
            .chapters
            .iter()
            .filter(|chapter| self.selected_chapter_ids.contains(&chapter.id))
            .flat_map(|chapter| chapter.subtopics.iter().map(move |sub| (sub.id.as_str(), chapter.id.as_str())))
            .collect();
        if let Some(unknown) = subtopic_ids.iter().find(|id| !known.contains_key(id.as_str())) {
            return Err(SessionError::UnknownSubtopic(unknown.clone()));
        }

        self.selected_subtopic_ids = subtopic_ids.iter().cloned().collect();
        self.pool = self.full_pool.filtered_by_subtopics(&self.chapters, &self.selected_subtopic_ids);

        let removed = match self.pattern.as_ref() {
            Some(pattern) => {
                let engine =
                    SelectionEngine::new(&pattern.sections, &self.pool, &self.chapter_index, self.matcher());
                engine.reconcile(&mut self.selection)
            }
            None => 0,
        };
        if removed > 0 {
            self.swap = None;
        }
        Ok(removed)
    }

    pub(crate) fn candidates(&self, section_id: &str) -> Result<Vec<Question>, SessionError> {
        let sections = self.sections()?;
        let engine = SelectionEngine::new(sections, &self.pool, &self.chapter_index, self.matcher());
        Ok(engine.candidates(section_id)?.into_iter().cloned().collect())
    }

    pub(crate) fn toggle(&mut self, section_id: &str, question_id: &str) -> Result<ToggleOutcome, SessionError> {
        let pattern = self.pattern.as_ref().ok_or(SessionError::MissingPattern)?;
        let engine =
            SelectionEngine::new(&pattern.sections, &self.pool, &self.chapter_index, self.matcher());
        let outcome = engine.toggle(&mut self.selection, section_id, question_id)?;
        if matches!(outcome, ToggleOutcome::Removed { .. }) {
            self.swap = None;
        }
        Ok(outcome)
    }

    pub(crate) fn auto_fill(
        &mut self,
        section_ids: Option<&[String]>,
        seed: Option<u64>,
    ) -> Result<AutoFillReport, SessionError> {
        let pattern = self.pattern.as_ref().ok_or(SessionError::MissingPattern)?;
        let engine =
            SelectionEngine::new(&pattern.sections, &self.pool, &self.chapter_index, self.matcher());
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let report = engine.auto_fill(&mut self.selection, section_ids, &mut rng)?;

        metrics::record_autofill(report.filled(), report.unfilled());
        tracing::info!(
            session_id = %self.id,
            filled = report.filled(),
            unfilled = report.unfilled(),
            "Auto-fill completed"
        );
        Ok(report)
    }

    pub(crate) fn clear_section(&mut self, section_id: &str) -> Result<(), SessionError> {
        let pattern = self.pattern.as_ref().ok_or(SessionError::MissingPattern)?;
        let engine =
            SelectionEngine::new(&pattern.sections, &self.pool, &self.chapter_index, self.matcher());
        engine.clear(&mut self.selection, section_id)?;
        if self.swap.as_ref().is_some_and(|swap| swap.section_id == section_id) {
            self.swap = None;
        }
        Ok(())
    }

    /// Records the slot being swapped and returns its eligible replacements.
    pub(crate) fn begin_swap(
        &mut self,
        section_id: &str,
        unit_index: usize,
        part_index: usize,
    ) -> Result<(SlotTarget, Vec<Question>), SessionError> {
        let pattern = self.pattern.as_ref().ok_or(SessionError::MissingPattern)?;
        let engine =
            SelectionEngine::new(&pattern.sections, &self.pool, &self.chapter_index, self.matcher());
        let target = engine.slot_target(section_id, unit_index, part_index)?;
        let candidates = engine
            .swap_candidates(&self.selection, &target)?
            .into_iter()
            .cloned()
            .collect();
        self.swap = Some(target.clone());
        Ok((target, candidates))
    }

    /// Writes the chosen question into the pending slot. The pointer is kept when the swap is refused.
    pub(crate) fn complete_swap(&mut self, question_id: &str) -> Result<SwapOutcome, SessionError> {
        let target = self.swap.clone().ok_or(SessionError::NoActiveSwap)?;
        let pattern = self.pattern.as_ref().ok_or(SessionError::MissingPattern)?;
        let engine =
            SelectionEngine::new(&pattern.sections, &self.pool, &self.chapter_index, self.matcher());
        let outcome = engine.swap(&mut self.selection, &target, question_id)?;
        if matches!(outcome, SwapOutcome::Swapped { .. } | SwapOutcome::Unchanged) {
            self.swap = None;
        }
        Ok(outcome)
    }

    pub(crate) fn cancel_swap(&mut self) -> bool {
        self.swap.take().is_some()
    }

    pub(crate) fn effective_sections(&self) -> Result<Vec<PaperSection>, SessionError> {
        Ok(effective::resolve(self.sections()?, &self.selection))
    }

    pub(crate) fn compile(&self, options: &PaperOptions) -> Result<CompiledPaper, SessionError> {
        let effective_sections = self.effective_sections()?;
        let resolved = compiler::resolve_questions(&effective_sections, &self.selection, &self.pool);
        Ok(compiler::compile(
            &effective_sections,
            &resolved,
            CompileOptions { medium: options.medium, show_answer_key: options.show_answer_key },
        ))
    }

    /// Self-contained copy of the current paper for persistence.
    pub(crate) fn snapshot(&self, options: &PaperOptions) -> Result<PaperSnapshot, SessionError> {
        let pattern = self.pattern.as_ref().ok_or(SessionError::MissingPattern)?;
        let effective_sections = self.effective_sections()?;
        let resolved_questions =
            compiler::resolve_questions(&effective_sections, &self.selection, &self.pool);
        let total_marks = compiler::compile(
            &effective_sections,
            &resolved_questions,
            CompileOptions { medium: options.medium, show_answer_key: false },
        )
        .total_marks;

        let title = options
            .title
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} - {}", self.context.subject, pattern.name));

        Ok(PaperSnapshot {
            title,
            class_level: self.context.class_level.clone(),
            subject: self.context.subject.clone(),
            pattern_id: Some(pattern.id.clone()),
            pattern_name: Some(pattern.name.clone()),
            time_allowed: options.time_allowed.clone().or_else(|| pattern.time_allowed.clone()),
            medium: options.medium,
            show_answer_key: options.show_answer_key,
            institute: options.institute.clone(),
            layout: options.layout.clone(),
            total_marks,
            effective_sections,
            resolved_questions,
        })
    }
}

pub(crate) type SessionHandle = Arc<Mutex<AuthoringSession>>;

/// In-memory registry of live sessions.
#[derive(Clone)]
pub(crate) struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    clock: SharedClock,
    max_sessions: usize,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub(crate) fn new(clock: SharedClock, max_sessions: usize, idle_timeout: Duration) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), clock, max_sessions, idle_timeout }
    }

    pub(crate) async fn create(&self, context: AuthoringContext) -> Result<SessionHandle, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= self.max_sessions {
            return Err(SessionError::CapacityReached(self.max_sessions));
        }
        let session = AuthoringSession::new(context, self.clock.now());
        let id = session.id().to_string();
        let handle = Arc::new(Mutex::new(session));
        sessions.insert(id.clone(), handle.clone());
        tracing::info!(session_id = %id, active = sessions.len(), "Authoring session created");
        Ok(handle)
    }

    /// Looks a session up and marks it as used.
    pub(crate) async fn get(&self, id: &str) -> Result<SessionHandle, SessionError> {
        let handle = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        handle.lock().await.touch(self.clock.now());
        Ok(handle)
    }

    pub(crate) async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than the configured timeout.
    pub(crate) async fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let snapshot: Vec<(String, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect();

        let mut expired = Vec::new();
        for (id, handle) in snapshot {
            if handle.lock().await.idle_for(now) >= self.idle_timeout {
                expired.push(id);
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for id in &expired {
            sessions.remove(id);
        }
        tracing::info!(evicted = expired.len(), active = sessions.len(), "Evicted idle authoring sessions");
        expired.len()
    }
}

fn finish_load<T>(
    session: &mut AuthoringSession,
    ticket: FetchTicket,
    result: Result<T, SessionError>,
    apply: impl FnOnce(&mut AuthoringSession, T) -> LoadOutcome,
) -> Result<LoadOutcome, SessionError> {
    match result {
        Ok(value) => Ok(apply(session, value)),
        Err(_) if !session.is_current(ticket) => Ok(session.discard(ticket)),
        Err(err) => Err(err),
    }
}

/// Fetches chapters and the pattern for the session's current context.
pub(crate) async fn load_catalog(
    bank: &dyn QuestionBank,
    handle: &SessionHandle,
    ticket: FetchTicket,
    hide_invisible: bool,
) -> Result<LoadOutcome, SessionError> {
    let (query, pattern_id) = {
        let session = handle.lock().await;
        if !session.is_current(ticket) {
            return Ok(session.discard(ticket));
        }
        (session.catalog_query(hide_invisible), session.context().pattern_id.clone())
    };

    let fetched = async {
        let chapters = bank.fetch_chapters(&query).await?;
        let pattern = match pattern_id {
            Some(id) => Some(
                bank.fetch_pattern(&id)
                    .await?
                    .ok_or(SessionError::UnknownPattern(id))?,
            ),
            None => None,
        };
        Ok::<_, SessionError>((chapters, pattern))
    }
    .await;

    let mut session = handle.lock().await;
    finish_load(&mut session, ticket, fetched, |session, (chapters, pattern)| {
        session.apply_catalog(ticket, chapters, pattern)
    })
}

/// Fetches the question pool for the chapters chosen with `ticket`.
pub(crate) async fn load_pool(
    bank: &dyn QuestionBank,
    handle: &SessionHandle,
    ticket: FetchTicket,
    request: PoolRequest,
) -> Result<LoadOutcome, SessionError> {
    let fetched = bank.fetch_question_pool(&request).await.map_err(SessionError::from);
    let mut session = handle.lock().await;
    finish_load(&mut session, ticket, fetched, |session, questions| session.apply_pool(ticket, questions))
}

/// Persists the session's paper. The session itself is left untouched either way.
/// Store failures come back as an unsuccessful outcome rather than an error.
pub(crate) async fn save_paper(
    bank: &dyn QuestionBank,
    handle: &SessionHandle,
    options: &PaperOptions,
) -> Result<SaveOutcome, SessionError> {
    let (session_id, snapshot) = {
        let session = handle.lock().await;
        (session.id().to_string(), session.snapshot(options)?)
    };

    let outcome = match bank.persist_paper(&snapshot).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(session_id = %session_id, error = %err, "Paper save failed");
            return Ok(SaveOutcome::failed("Failed to save paper. Please try again."));
        }
    };
    metrics::record_paper_saved();
    tracing::info!(
        session_id = %session_id,
        paper_id = outcome.paper_id.as_deref().unwrap_or("-"),
        medium = options.medium.as_str(),
        questions = snapshot.resolved_questions.len(),
        total_marks = snapshot.total_marks,
        "Paper saved"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::ManualClock;
    use crate::test_support::{sample_context, InMemoryBank};

    async fn session_with_catalog(bank: &InMemoryBank, registry: &SessionRegistry) -> SessionHandle {
        let handle = registry.create(sample_context()).await.expect("session");
        let ticket = handle.lock().await.reset_context(sample_context());
        let outcome = load_catalog(bank, &handle, ticket, true).await.expect("catalog");
        assert_eq!(outcome, LoadOutcome::Applied);
        handle
    }

    async fn load_chapters(bank: &InMemoryBank, handle: &SessionHandle, ids: &[&str]) -> LoadOutcome {
        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let (ticket, request) = handle.lock().await.select_chapters(&ids, false).expect("chapters");
        load_pool(bank, handle, ticket, request).await.expect("pool")
    }

    fn registry() -> (SessionRegistry, ManualClock) {
        let clock = ManualClock::new();
        (SessionRegistry::new(Arc::new(clock.clone()), 4, Duration::from_secs(600)), clock)
    }

    #[tokio::test]
    async fn catalog_selects_mandatory_chapters() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;

        let session = handle.lock().await;
        assert!(session.is_catalog_loaded());
        assert_eq!(session.mandatory_chapter_ids().iter().collect::<Vec<_>>(), vec!["ch2"]);
        assert!(session.selected_chapter_ids().contains("ch2"));
    }

    #[tokio::test]
    async fn mandatory_chapters_cannot_be_deselected() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;

        load_chapters(&bank, &handle, &["ch1"]).await;
        let session = handle.lock().await;
        let selected: Vec<&String> = session.selected_chapter_ids().iter().collect();
        assert_eq!(selected, vec!["ch1", "ch2"]);
        assert!(session.is_pool_loaded());
        assert!(session.pool().len() > 0);
    }

    #[tokio::test]
    async fn stale_pool_result_is_discarded() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;

        let (old_ticket, old_request) = handle
            .lock()
            .await
            .select_chapters(&["ch1".to_string()], false)
            .expect("first");
        let (new_ticket, new_request) = handle
            .lock()
            .await
            .select_chapters(&["ch3".to_string()], false)
            .expect("second");

        let newer = load_pool(&bank, &handle, new_ticket, new_request).await.expect("new");
        let older = load_pool(&bank, &handle, old_ticket, old_request).await.expect("old");
        assert_eq!(newer, LoadOutcome::Applied);
        assert_eq!(older, LoadOutcome::Stale);

        let session = handle.lock().await;
        assert!(session.pool().iter().all(|q| q.chapter_id != "ch1"));
    }

    #[tokio::test]
    async fn context_change_invalidates_pending_fetches() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;

        let (pool_ticket, request) = handle
            .lock()
            .await
            .select_chapters(&["ch1".to_string()], false)
            .expect("chapters");
        let stale_catalog = FetchTicket { kind: FetchKind::Catalog, generation: handle.lock().await.generations().0 };
        let fresh = handle.lock().await.reset_context(sample_context());

        assert_eq!(load_pool(&bank, &handle, pool_ticket, request).await.unwrap(), LoadOutcome::Stale);
        assert_eq!(
            load_catalog(&bank, &handle, stale_catalog, true).await.unwrap(),
            LoadOutcome::Stale
        );
        {
            let session = handle.lock().await;
            assert!(!session.is_catalog_loaded());
            assert!(session.pool().is_empty());
            assert!(session.selection().is_empty());
        }
        assert_eq!(load_catalog(&bank, &handle, fresh, true).await.unwrap(), LoadOutcome::Applied);
    }

    #[tokio::test]
    async fn stale_fetch_errors_are_swallowed() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;

        let (ticket, request) = handle
            .lock()
            .await
            .select_chapters(&["ch1".to_string()], false)
            .expect("chapters");
        handle.lock().await.select_chapters(&["ch3".to_string()], false).expect("newer");

        bank.fail_pools(true);
        assert_eq!(load_pool(&bank, &handle, ticket, request).await.unwrap(), LoadOutcome::Stale);
    }

    #[tokio::test]
    async fn unknown_pattern_is_reported() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let mut context = sample_context();
        context.pattern_id = Some("missing".to_string());
        let handle = registry.create(context.clone()).await.expect("session");
        let ticket = handle.lock().await.reset_context(context);

        let err = load_catalog(&bank, &handle, ticket, true).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownPattern(id) if id == "missing"));
    }

    #[tokio::test]
    async fn chapter_change_resets_selection() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;
        load_chapters(&bank, &handle, &["ch1"]).await;

        {
            let mut session = handle.lock().await;
            session.auto_fill(None, Some(1)).expect("fill");
            assert!(!session.selection().is_empty());
        }
        let (ticket, _) = handle
            .lock()
            .await
            .select_chapters(&["ch3".to_string()], false)
            .expect("chapters");
        let session = handle.lock().await;
        assert!(session.selection().is_empty());
        assert!(!session.is_pool_loaded());
        assert_eq!(ticket.generation, session.generations().1);
    }

    #[tokio::test]
    async fn subtopic_filter_prunes_instead_of_resetting() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;
        load_chapters(&bank, &handle, &["ch1"]).await;

        let mut session = handle.lock().await;
        session.toggle("short", "ch1-short-1").expect("toggle");
        session.toggle("short", "ch2-short-1").expect("toggle");

        let removed = session.select_subtopics(&["ch1-sub-b".to_string()]).expect("subtopics");
        assert_eq!(removed, 1);
        let kept: Vec<&str> = session.selection().filled_ids("short").collect();
        assert_eq!(kept, vec!["ch2-short-1"]);

        let err = session.select_subtopics(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, SessionError::UnknownSubtopic(_)));
    }

    #[tokio::test]
    async fn swap_pointer_lifecycle() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;
        load_chapters(&bank, &handle, &["ch1"]).await;

        let mut session = handle.lock().await;
        assert!(matches!(session.complete_swap("x"), Err(SessionError::NoActiveSwap)));

        let (target, candidates) = session.begin_swap("long", 0, 1).expect("begin");
        assert_eq!(target.slot_index, 1);
        assert!(!candidates.is_empty());
        assert!(session.active_swap().is_some());

        let refused = session.complete_swap("ch1-mcq-1").expect("mismatch");
        assert_eq!(refused, SwapOutcome::ConstraintMismatch);
        assert!(session.active_swap().is_some());

        let chosen = candidates[0].id.clone();
        let outcome = session.complete_swap(&chosen).expect("swap");
        assert!(matches!(outcome, SwapOutcome::Swapped { slot: 1, .. }));
        assert!(session.active_swap().is_none());

        session.begin_swap("long", 0, 0).expect("begin");
        assert!(session.cancel_swap());
        assert!(!session.cancel_swap());
    }

    #[tokio::test]
    async fn registry_enforces_capacity_and_evicts_idle_sessions() {
        let (registry, clock) = registry();
        for _ in 0..3 {
            registry.create(sample_context()).await.expect("session");
        }
        let keep = registry.create(sample_context()).await.expect("session").lock().await.id().to_string();
        let err = registry.create(sample_context()).await.err().expect("full");
        assert!(matches!(err, SessionError::CapacityReached(4)));

        clock.advance(Duration::from_secs(300));
        registry.get(&keep).await.expect("touch");
        clock.advance(Duration::from_secs(400));

        assert_eq!(registry.evict_idle().await, 3);
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(&keep).await.is_ok());
        assert!(matches!(registry.get("gone").await, Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn save_failure_leaves_session_intact() {
        let bank = InMemoryBank::seeded();
        let (registry, _) = registry();
        let handle = session_with_catalog(&bank, &registry).await;
        load_chapters(&bank, &handle, &["ch1"]).await;
        handle.lock().await.auto_fill(None, Some(3)).expect("fill");
        let before = handle.lock().await.selection().clone();

        bank.fail_persist(true);
        let failed = save_paper(&bank, &handle, &PaperOptions::default()).await.expect("outcome");
        assert!(!failed.success);
        assert!(failed.paper_id.is_none());
        assert!(failed.message.starts_with("Failed to save paper"));
        assert_eq!(bank.saved_papers(), 0);
        assert_eq!(handle.lock().await.selection(), &before);

        bank.fail_persist(false);
        let outcome = save_paper(&bank, &handle, &PaperOptions::default()).await.expect("save");
        assert!(outcome.success);
        assert_eq!(bank.saved_papers(), 1);
    }
}
