use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::authoring::SessionRegistry;
use crate::services::question_bank::QuestionBank;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    bank: Arc<dyn QuestionBank>,
    sessions: SessionRegistry,
}

impl AppState {
    pub(crate) fn new(settings: Settings, bank: Arc<dyn QuestionBank>, sessions: SessionRegistry) -> Self {
        Self { inner: Arc::new(InnerState { settings, bank, sessions }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn bank(&self) -> &dyn QuestionBank {
        self.inner.bank.as_ref()
    }

    pub(crate) fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }
}
