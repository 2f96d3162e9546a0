pub(crate) mod api;
pub(crate) mod core;
pub mod schemas;
pub mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{bootstrap::SeedDirectory, config::Settings, state::AppState, telemetry};
use crate::services::backend::HttpBackend;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let backend = HttpBackend::from_settings(&settings)?;
    let seeds = SeedDirectory::from_settings(&settings)?;
    let state = AppState::new(settings, Arc::new(backend), seeds);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        addr = %state.settings().server_addr(),
        backend = %state.settings().backend().base_url,
        environment = %state.settings().runtime().environment.as_str(),
        "Report card gateway listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    tracing::info!("Report card gateway stopped");
    Ok(())
}
