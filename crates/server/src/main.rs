use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use civicvoice_server::{
    app, config,
    services::{drafter::OpenAiDrafter, mailer::SimulatedMailer},
    store::MemStore,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "civicvoice_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env();

    // Initialize storage
    let store = MemStore::new();
    if config.seed_demo_data {
        store.seed_demo_data().await;
        tracing::info!("seeded demo projects");
    }

    if config.openai_api_key.is_none() {
        tracing::warn!("no OPENAI_API_KEY set; email drafts use the local template fallback");
    }
    tracing::info!("outbound email delivery is simulated");

    // Build application state
    let state = AppState {
        store: Arc::new(store),
        drafter: Arc::new(OpenAiDrafter::from_config(&config)),
        mailer: Arc::new(SimulatedMailer),
        config: config.clone(),
    };

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
