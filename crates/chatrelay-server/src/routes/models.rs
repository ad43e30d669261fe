use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chatrelay::providers::base::ProviderId;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    label: String,
    provider: ProviderId,
}

#[derive(Debug, Serialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

// Only models whose provider has credentials are offered
async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let orchestrator = &state.orchestrator;
    let models = orchestrator
        .models()
        .iter()
        .filter(|model| orchestrator.providers().contains(model.provider_id))
        .map(|model| ModelInfo {
            name: model.name.clone(),
            label: model.label.clone(),
            provider: model.provider_id,
        })
        .collect();

    Json(ModelsResponse { models })
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/models", get(list_models))
        .with_state(state)
}
