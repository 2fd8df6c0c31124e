use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::TelemetrySettings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    if !settings.prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_autofill(filled: usize, unfilled: usize) {
    metrics::counter!("paper_autofill_slots_total", "outcome" => "filled").increment(filled as u64);
    metrics::counter!("paper_autofill_slots_total", "outcome" => "unfilled")
        .increment(unfilled as u64);
}

pub(crate) fn record_stale_response(kind: &'static str) {
    metrics::counter!("paper_stale_responses_total", "kind" => kind).increment(1);
}

pub(crate) fn record_paper_saved() {
    metrics::counter!("papers_saved_total").increment(1);
}

pub(crate) fn record_cache_lookup(cache: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("bank_cache_lookups_total", "cache" => cache, "result" => result).increment(1);
}
