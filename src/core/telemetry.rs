use tracing_subscriber::{fmt, fmt::format::FmtSpan, EnvFilter};

use crate::core::config::Settings;

/// Installs the global subscriber. `RUST_LOG` wins over `REPORTCARD_LOG_LEVEL`.
pub(crate) fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let telemetry = settings.telemetry();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(telemetry.log_level.clone()));

    let builder =
        fmt().with_env_filter(filter).with_target(false).with_span_events(FmtSpan::CLOSE);

    let installed = if telemetry.json {
        builder.json().with_current_span(true).flatten_event(true).try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|err| anyhow::anyhow!(err.to_string()))?;

    tracing::info!(
        service = %settings.api().project_name,
        environment = settings.runtime().environment.as_str(),
        json = telemetry.json,
        "Tracing initialised"
    );
    Ok(())
}
