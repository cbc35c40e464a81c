//! Main Entrypoint for the Voice Agent API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Building the backend clients and the agent profiles.
//! 3. Constructing the Axum router.
//! 4. Serving until a termination signal, then draining sessions.

use anyhow::Context;
use gemini_realtime::LiveClient;
use std::{sync::Arc, time::Duration};
use tracing::info;
use voice_agent_api::{
    config::Config,
    router::create_router,
    state::AppState,
    supervisor::Supervisor,
    ws::agent::{AgentProfiles, load_prompts},
};
use voice_agent_core::{
    Backends,
    catalog::HttpCatalogClient,
    content::{GeminiEmbedder, PgVectorStore},
};

const BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Backends ---
    let catalog = HttpCatalogClient::new(&config.backend_base_url, BACKEND_TIMEOUT)
        .context("Invalid BACKEND_BASE_URL")?;
    let embedder = GeminiEmbedder::new(
        config.gemini_api_key.clone(),
        &config.embedding_model,
        BACKEND_TIMEOUT,
    )
    .context("Failed to build embedding client")?;
    let vector_store = PgVectorStore::connect_lazy(&config.database_url)
        .context("Invalid database configuration")?;
    let backends = Backends {
        catalog: Arc::new(catalog),
        embedder: Arc::new(embedder),
        vector_store: Arc::new(vector_store),
        similarity_threshold: config.similarity_threshold,
    };

    // --- 4. Build Agent Profiles ---
    let prompts = load_prompts(&config.prompts_path)?;
    let agents = AgentProfiles::from_prompts(&prompts, &config.voice_name, backends)?;

    let mut live = LiveClient::new(config.gemini_api_key.clone());
    if let Some(endpoint) = &config.live_endpoint {
        live = live.with_endpoint(endpoint.clone());
    }

    // --- 5. Create Router and Serve ---
    let supervisor = Supervisor::new(config.bind_address, config.shutdown_grace);
    let app_state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        live,
        agents: Arc::new(agents),
        shutdown: supervisor.shutdown_token(),
        sessions: supervisor.sessions(),
    });
    let app = create_router(app_state);

    info!(
        model = %config.live_model,
        voice = %config.voice_name,
        backend = %config.backend_base_url,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    supervisor.run(app).await
}
