pub(crate) mod authoring;
pub(crate) mod bank_cache;
pub(crate) mod paper_snapshot;
pub(crate) mod question_bank;
