// Export route modules
pub mod models;
pub mod reply;
pub mod upload;

use axum::Router;
use crate::state::AppState;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(reply::routes(state.clone()))
        .merge(models::routes(state.clone()))
        .merge(upload::routes(state))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chatrelay::models::model::{ModelDescriptor, ModelRegistry};
    use chatrelay::orchestrator::{Limits, Orchestrator};
    use chatrelay::providers::base::{ProviderHandle, ProviderId, ProviderTable};
    use chatrelay::providers::mock::{MockBlockClient, MockDeltaClient};
    use chatrelay::tools::calculator::Calculator;
    use chatrelay::tools::chart_generator::ChartGenerator;
    use chatrelay::tools::{ToolHandler, ToolRegistry};

    use crate::configuration::UploadSettings;
    use crate::state::AppState;

    pub fn models() -> ModelRegistry {
        ModelRegistry::new(vec![
            ModelDescriptor::new("delta-model", "Delta Model", ProviderId::OpenAi),
            ModelDescriptor::new("inline-model", "Inline Model", ProviderId::Cerebras)
                .without_tools(),
            ModelDescriptor::new("block-model", "Block Model", ProviderId::Anthropic),
            ModelDescriptor::new("offline-model", "Offline Model", ProviderId::Qwen),
        ])
    }

    /// State backed by canned provider streams
    pub fn state(delta: &MockDeltaClient, block: &MockBlockClient, uploads: UploadSettings) -> AppState {
        let delta = ProviderHandle::Delta(Arc::new(delta.clone()));
        let providers = ProviderTable::new()
            .with(ProviderId::OpenAi, delta.clone())
            .with(ProviderId::Cerebras, delta)
            .with(
                ProviderId::Anthropic,
                ProviderHandle::Block(Arc::new(block.clone())),
            );
        let handlers: Vec<Arc<dyn ToolHandler>> =
            vec![Arc::new(Calculator::new()), Arc::new(ChartGenerator::new())];
        let tools = Arc::new(ToolRegistry::new(handlers).unwrap());
        AppState::new(
            Orchestrator::new(models(), providers, tools, Limits::default()),
            uploads,
        )
    }
}
