use std::sync::Arc;

use chatrelay::orchestrator::Orchestrator;

use crate::configuration::UploadSettings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub uploads: UploadSettings,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, uploads: UploadSettings) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            uploads,
        }
    }
}
