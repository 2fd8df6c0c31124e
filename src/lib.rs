pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod engine;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{config::Settings, state::AppState, telemetry, time::system_clock};
use crate::services::authoring::SessionRegistry;
use crate::services::bank_cache::{BankCache, CachedQuestionBank};
use crate::services::question_bank::{PgQuestionBank, QuestionBank};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(settings.telemetry())?;
    core::metrics::init(settings.telemetry())?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let mut bank: Arc<dyn QuestionBank> = Arc::new(PgQuestionBank::new(db_pool));
    if let Some(ttl) = settings.bank_cache().ttl() {
        bank = Arc::new(CachedQuestionBank::new(bank, BankCache::new(system_clock(), ttl)));
        tracing::info!(ttl_seconds = ttl.as_secs(), "Question bank cache enabled");
    }

    let sessions = SessionRegistry::new(
        system_clock(),
        settings.authoring().max_sessions,
        settings.authoring().idle_timeout(),
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(tasks::session_sweeper::run(
        sessions.clone(),
        settings.authoring().sweep_interval(),
        shutdown_rx,
    ));

    let state = AppState::new(settings, bank, sessions);
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Paperwright API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    shutdown_tx.send(true).ok();
    if let Err(err) = sweeper.await {
        tracing::error!(error = %err, "Session sweeper task failed");
    }

    result?;

    Ok(())
}
