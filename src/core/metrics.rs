use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub(crate) const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub(crate) const REPORT_CARDS_BUILT_TOTAL: &str = "report_cards_built_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_none() {
        let handle = PrometheusBuilder::new().install_recorder()?;
        let _ = PROM_HANDLE.set(handle);
    }

    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP responses by status code");
    metrics::describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "HTTP request latency"
    );
    metrics::describe_counter!(REPORT_CARDS_BUILT_TOTAL, "Report card builds by outcome");
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_report_card(outcome: &'static str) {
    metrics::counter!(REPORT_CARDS_BUILT_TOTAL, "outcome" => outcome).increment(1);
}
