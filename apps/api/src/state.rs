use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;
use crate::search::SearchProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable text generator. Production: GeminiClient. Tests inject fakes.
    pub generator: Arc<dyn TextGenerator>,
    /// `None` when no search credentials are configured; the question agent
    /// then answers without live sources.
    pub search: Option<Arc<dyn SearchProvider>>,
    pub config: Config,
}
