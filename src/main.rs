use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forkcast::{
    config::Config, reaper, routes, search::SearchClient, state::AppState,
    store::MemoryLobbyStore, ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forkcast=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting forkcast...");

    let config = Config::from_env();

    let search = match config.search_api_key.clone() {
        Some(key) => Some(SearchClient::new(config.search_endpoint.clone(), key)),
        None => {
            tracing::warn!("SEARCH_API_KEY not set. Business search will be unavailable.");
            None
        }
    };

    let store = Arc::new(MemoryLobbyStore::new());
    let state = Arc::new(AppState::new_with_search(store, search));

    // Spawn background task for sweeping expired lobbies out of the store
    reaper::spawn_lobby_reaper(
        state.clone(),
        Duration::from_secs(config.reaper_interval_secs),
    );

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
