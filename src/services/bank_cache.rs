//! Time-bounded memo of pattern lists and question pools.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::metrics;
use crate::core::time::SharedClock;
use crate::engine::model::{Chapter, PaperPattern, Question};
use crate::services::paper_snapshot::{PaperSnapshot, PaperSummary, PaperUpdate, SaveOutcome, StoredPaper};
use crate::services::question_bank::{BankError, ChapterQuery, PoolRequest, QuestionBank};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PoolKey {
    subject: String,
    chapter_ids: Vec<String>,
}

impl PoolKey {
    pub(crate) fn new(subject: &str, chapter_ids: &[String]) -> Self {
        let mut chapter_ids = chapter_ids.to_vec();
        chapter_ids.sort();
        chapter_ids.dedup();
        Self { subject: subject.trim().to_lowercase(), chapter_ids }
    }
}

/// Which memoized entries an invalidation drops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum CacheScope {
    Patterns,
    Pools,
    #[default]
    All,
}

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

#[derive(Default)]
struct Entries {
    patterns: Option<Entry<Vec<PaperPattern>>>,
    pools: HashMap<PoolKey, Entry<Vec<Question>>>,
}

pub(crate) struct BankCache {
    clock: SharedClock,
    ttl: Duration,
    entries: Mutex<Entries>,
}

impl BankCache {
    pub(crate) fn new(clock: SharedClock, ttl: Duration) -> Self {
        Self { clock, ttl, entries: Mutex::new(Entries::default()) }
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_fresh(&self, stored_at: Instant) -> bool {
        self.clock.now().saturating_duration_since(stored_at) < self.ttl
    }

    pub(crate) fn patterns(&self) -> Option<Vec<PaperPattern>> {
        let entries = self.entries();
        let hit = entries
            .patterns
            .as_ref()
            .filter(|entry| self.is_fresh(entry.stored_at))
            .map(|entry| entry.value.clone());
        metrics::record_cache_lookup("patterns", hit.is_some());
        hit
    }

    pub(crate) fn store_patterns(&self, patterns: Vec<PaperPattern>) {
        let stored_at = self.clock.now();
        self.entries().patterns = Some(Entry { value: patterns, stored_at });
    }

    pub(crate) fn pool(&self, key: &PoolKey) -> Option<Vec<Question>> {
        let entries = self.entries();
        let hit = entries
            .pools
            .get(key)
            .filter(|entry| self.is_fresh(entry.stored_at))
            .map(|entry| entry.value.clone());
        metrics::record_cache_lookup("pools", hit.is_some());
        hit
    }

    pub(crate) fn store_pool(&self, key: PoolKey, questions: Vec<Question>) {
        let stored_at = self.clock.now();
        let mut entries = self.entries();
        entries.pools.retain(|_, entry| self.is_fresh(entry.stored_at));
        entries.pools.insert(key, Entry { value: questions, stored_at });
    }

    pub(crate) fn invalidate_patterns(&self) {
        self.entries().patterns = None;
    }

    pub(crate) fn invalidate_pools(&self) {
        self.entries().pools.clear();
    }

    pub(crate) fn clear(&self) {
        *self.entries() = Entries::default();
    }

    pub(crate) fn invalidate(&self, scope: CacheScope) {
        match scope {
            CacheScope::Patterns => self.invalidate_patterns(),
            CacheScope::Pools => self.invalidate_pools(),
            CacheScope::All => self.clear(),
        }
    }
}

/// Wraps another bank and memoizes its pattern list and pools.
pub(crate) struct CachedQuestionBank {
    inner: Arc<dyn QuestionBank>,
    cache: BankCache,
}

impl CachedQuestionBank {
    pub(crate) fn new(inner: Arc<dyn QuestionBank>, cache: BankCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl QuestionBank for CachedQuestionBank {
    async fn fetch_chapters(&self, query: &ChapterQuery) -> Result<Vec<Chapter>, BankError> {
        self.inner.fetch_chapters(query).await
    }

    async fn fetch_question_pool(&self, request: &PoolRequest) -> Result<Vec<Question>, BankError> {
        let key = PoolKey::new(&request.subject, &request.chapter_ids);
        if !request.bypass_cache {
            if let Some(questions) = self.cache.pool(&key) {
                return Ok(questions);
            }
        }

        let questions = self.inner.fetch_question_pool(request).await?;
        self.cache.store_pool(key, questions.clone());
        Ok(questions)
    }

    async fn fetch_patterns(&self) -> Result<Vec<PaperPattern>, BankError> {
        if let Some(patterns) = self.cache.patterns() {
            return Ok(patterns);
        }
        let patterns = self.inner.fetch_patterns().await?;
        self.cache.store_patterns(patterns.clone());
        Ok(patterns)
    }

    async fn fetch_pattern(&self, id: &str) -> Result<Option<PaperPattern>, BankError> {
        if let Some(patterns) = self.cache.patterns() {
            if let Some(pattern) = patterns.into_iter().find(|pattern| pattern.id == id) {
                return Ok(Some(pattern));
            }
        }
        self.inner.fetch_pattern(id).await
    }

    async fn create_pattern(&self, pattern: PaperPattern) -> Result<PaperPattern, BankError> {
        let created = self.inner.create_pattern(pattern).await?;
        self.cache.invalidate_patterns();
        Ok(created)
    }

    async fn delete_pattern(&self, id: &str) -> Result<bool, BankError> {
        let deleted = self.inner.delete_pattern(id).await?;
        self.cache.invalidate_patterns();
        Ok(deleted)
    }

    async fn persist_paper(&self, snapshot: &PaperSnapshot) -> Result<SaveOutcome, BankError> {
        self.inner.persist_paper(snapshot).await
    }

    async fn update_paper(&self, id: &str, update: &PaperUpdate) -> Result<SaveOutcome, BankError> {
        self.inner.update_paper(id, update).await
    }

    async fn list_papers(&self) -> Result<Vec<PaperSummary>, BankError> {
        self.inner.list_papers().await
    }

    async fn fetch_paper(&self, id: &str) -> Result<Option<StoredPaper>, BankError> {
        self.inner.fetch_paper(id).await
    }

    async fn ping(&self) -> Result<(), BankError> {
        self.inner.ping().await
    }

    fn invalidate_cache(&self, scope: CacheScope) -> bool {
        self.cache.invalidate(scope);
        self.inner.invalidate_cache(scope);
        true
    }
}
