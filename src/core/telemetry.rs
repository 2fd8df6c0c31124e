use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::TelemetrySettings;

/// Directives appended to the configured level so driver chatter stays out of the logs.
const QUIET_DIRECTIVES: &str = "sqlx=warn,tower_http=info";

fn default_filter(settings: &TelemetrySettings) -> String {
    format!("{},{}", settings.log_level, QUIET_DIRECTIVES)
}

pub(crate) fn init_tracing(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(settings)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|err| anyhow::anyhow!(err.to_string()))?;

    Ok(())
}
