//! Boundary to the stored question bank, patterns and saved papers.
//!
//! The authoring flow only sees [`QuestionBank`]; retries, caching and storage
//! details stay behind it.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::PaperRow;
use crate::engine::model::{Chapter, PaperPattern, Question};
use crate::repositories;
use crate::services::bank_cache::CacheScope;
use crate::services::paper_snapshot::{PaperSnapshot, PaperSummary, PaperUpdate, SaveOutcome, StoredPaper};

pub(crate) const PAPER_LIST_LIMIT: i64 = 200;

#[derive(Debug, Error)]
pub(crate) enum BankError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("bank unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChapterQuery {
    pub(crate) subject: String,
    pub(crate) class_level: String,
    pub(crate) hide_invisible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PoolRequest {
    pub(crate) subject: String,
    pub(crate) chapter_ids: Vec<String>,
    /// Skip cached pools and read fresh data.
    pub(crate) bypass_cache: bool,
}

#[async_trait]
pub(crate) trait QuestionBank: Send + Sync {
    async fn fetch_chapters(&self, query: &ChapterQuery) -> Result<Vec<Chapter>, BankError>;

    async fn fetch_question_pool(&self, request: &PoolRequest) -> Result<Vec<Question>, BankError>;

    async fn fetch_patterns(&self) -> Result<Vec<PaperPattern>, BankError>;

    async fn fetch_pattern(&self, id: &str) -> Result<Option<PaperPattern>, BankError> {
        Ok(self.fetch_patterns().await?.into_iter().find(|pattern| pattern.id == id))
    }

    async fn create_pattern(&self, pattern: PaperPattern) -> Result<PaperPattern, BankError>;

    async fn delete_pattern(&self, id: &str) -> Result<bool, BankError>;

    async fn persist_paper(&self, snapshot: &PaperSnapshot) -> Result<SaveOutcome, BankError>;

    async fn update_paper(&self, id: &str, update: &PaperUpdate) -> Result<SaveOutcome, BankError>;

    async fn list_papers(&self) -> Result<Vec<PaperSummary>, BankError>;

    async fn fetch_paper(&self, id: &str) -> Result<Option<StoredPaper>, BankError>;

    async fn ping(&self) -> Result<(), BankError>;

    /// Drops memoized reads. Returns false when this bank keeps no cache.
    fn invalidate_cache(&self, _scope: CacheScope) -> bool {
        false
    }
}

#[derive(Clone)]
pub(crate) struct PgQuestionBank {
    pool: PgPool,
}

impl PgQuestionBank {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn paper_summary(row: &PaperRow) -> PaperSummary {
    PaperSummary {
        id: row.id.clone(),
        title: row.title.clone(),
        subject: row.subject.clone(),
        class_level: row.class_level.clone(),
        pattern_id: row.pattern_id.clone(),
        medium: row.medium,
        total_marks: row.total_marks,
        created_at: format_primitive(row.created_at),
        updated_at: format_primitive(row.updated_at),
    }
}

fn stored_paper(row: PaperRow) -> Result<StoredPaper, BankError> {
    let summary = paper_summary(&row);
    let snapshot: PaperSnapshot = serde_json::from_value(row.snapshot.0)?;
    Ok(StoredPaper { summary, snapshot })
}

#[async_trait]
impl QuestionBank for PgQuestionBank {
    async fn fetch_chapters(&self, query: &ChapterQuery) -> Result<Vec<Chapter>, BankError> {
        let rows = repositories::chapters::list(
            &self.pool,
            repositories::chapters::ChapterFilter {
                subject: &query.subject,
                class_level: &query.class_level,
                hide_invisible: query.hide_invisible,
            },
        )
        .await?;
        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        let subtopics = repositories::chapters::list_subtopics(&self.pool, &ids).await?;
        Ok(repositories::chapters::assemble(rows, subtopics))
    }

    async fn fetch_question_pool(&self, request: &PoolRequest) -> Result<Vec<Question>, BankError> {
        if request.chapter_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows =
            repositories::questions::list_for_chapters(&self.pool, &request.subject, &request.chapter_ids)
                .await?;
        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn fetch_patterns(&self) -> Result<Vec<PaperPattern>, BankError> {
        let rows = repositories::patterns::list(&self.pool).await?;
        Ok(rows.into_iter().map(PaperPattern::from).collect())
    }

    async fn fetch_pattern(&self, id: &str) -> Result<Option<PaperPattern>, BankError> {
        let row = repositories::patterns::find_by_id(&self.pool, id).await?;
        Ok(row.map(PaperPattern::from))
    }

    async fn create_pattern(&self, mut pattern: PaperPattern) -> Result<PaperPattern, BankError> {
        pattern.normalize();
        let row = repositories::patterns::create(
            &self.pool,
            repositories::patterns::CreatePattern {
                id: &pattern.id,
                name: &pattern.name,
                subject: pattern.subject.as_deref(),
                class_level: pattern.class_level.as_deref(),
                time_allowed: pattern.time_allowed.as_deref(),
                sections: &pattern.sections,
                total_marks: pattern.total_marks,
                now: primitive_now_utc(),
            },
        )
        .await?;
        Ok(PaperPattern::from(row))
    }

    async fn delete_pattern(&self, id: &str) -> Result<bool, BankError> {
        Ok(repositories::patterns::delete(&self.pool, id).await?)
    }

    async fn persist_paper(&self, snapshot: &PaperSnapshot) -> Result<SaveOutcome, BankError> {
        let id = Uuid::new_v4().to_string();
        let row = repositories::papers::create(
            &self.pool,
            repositories::papers::CreatePaper {
                id: &id,
                title: &snapshot.title,
                subject: &snapshot.subject,
                class_level: &snapshot.class_level,
                pattern_id: snapshot.pattern_id.as_deref(),
                medium: snapshot.medium,
                total_marks: snapshot.total_marks,
                snapshot: serde_json::to_value(snapshot)?,
                now: primitive_now_utc(),
            },
        )
        .await?;
        Ok(SaveOutcome::saved(&row.id, "Paper saved"))
    }

    async fn update_paper(&self, id: &str, update: &PaperUpdate) -> Result<SaveOutcome, BankError> {
        let mut tx = self.pool.begin().await?;
        let row = repositories::papers::find_by_id_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| BankError::NotFound(format!("Paper {id}")))?;

        let mut snapshot: PaperSnapshot = serde_json::from_value(row.snapshot.0)?;
        snapshot.apply(update);

        repositories::papers::update(
            &mut *tx,
            id,
            repositories::papers::UpdatePaper {
                title: &snapshot.title,
                medium: snapshot.medium,
                snapshot: serde_json::to_value(&snapshot)?,
                now: primitive_now_utc(),
            },
        )
        .await?
        .ok_or_else(|| BankError::NotFound(format!("Paper {id}")))?;
        tx.commit().await?;

        Ok(SaveOutcome::saved(id, "Paper updated"))
    }

    async fn list_papers(&self) -> Result<Vec<PaperSummary>, BankError> {
        let rows = repositories::papers::list(&self.pool, PAPER_LIST_LIMIT).await?;
        Ok(rows.iter().map(paper_summary).collect())
    }

    async fn fetch_paper(&self, id: &str) -> Result<Option<StoredPaper>, BankError> {
        repositories::papers::find_by_id(&self.pool, id).await?.map(stored_paper).transpose()
    }

    async fn ping(&self) -> Result<(), BankError> {
        repositories::health::ping(&self.pool).await?;
        Ok(())
    }
}
