use std::sync::Arc;

use crate::core::{bootstrap::SeedDirectory, config::Settings};
use crate::services::access_control::AccessEvaluator;
use crate::services::backend::SchoolBackend;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    backend: Arc<dyn SchoolBackend>,
    seeds: SeedDirectory,
    evaluator: AccessEvaluator,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        backend: Arc<dyn SchoolBackend>,
        seeds: SeedDirectory,
    ) -> Self {
        let evaluator = AccessEvaluator::new(settings.accounts().match_first_name);
        Self { inner: Arc::new(InnerState { settings, backend, seeds, evaluator }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn backend(&self) -> &dyn SchoolBackend {
        self.inner.backend.as_ref()
    }

    pub(crate) fn seeds(&self) -> &SeedDirectory {
        &self.inner.seeds
    }

    pub(crate) fn evaluator(&self) -> &AccessEvaluator {
        &self.inner.evaluator
    }
}
