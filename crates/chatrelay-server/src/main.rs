mod configuration;
mod error;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Result;
use chatrelay::models::model::ModelRegistry;
use chatrelay::orchestrator::Orchestrator;
use chatrelay::providers::factory::build_table;
use chatrelay::tools::ToolRegistry;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    if let Ok(path) = dotenv::dotenv() {
        eprintln!("Loaded environment from {:?}", path);
    }

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = configuration::Settings::new()?;

    let providers = build_table(settings.providers.into_configs(settings.limits.max_tokens))?;
    let tools = ToolRegistry::builtin(&settings.tools.tools_config())?;
    info!(tools = tools.len(), "tool registry ready");

    let orchestrator = Orchestrator::new(
        ModelRegistry::builtin(),
        providers,
        Arc::new(tools),
        settings.limits.limits(),
    );
    let state = state::AppState::new(orchestrator, settings.uploads.clone());

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    // Run server
    let addr = settings.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
