use std::sync::Arc;

use redacao_core::correction::CorrectionPersister;
use redacao_core::store::SubmissionStore;
use redacao_relay::GradingRelay;

/// Shared application state available to all handlers via Axum's `State` extractor.
///
/// Must be `Clone` because Axum clones the state for each request.
#[derive(Clone)]
pub struct AppState {
    /// Submission storage (PostgreSQL in production).
    pub store: Arc<dyn SubmissionStore>,
    /// Outbound grader client; `None` when no webhook URL is configured.
    pub relay: Option<Arc<GradingRelay>>,
}

impl AppState {
    /// Persister over the shared store with the default status fallback.
    pub fn persister(&self) -> CorrectionPersister {
        CorrectionPersister::new(Arc::clone(&self.store))
    }
}
