//! Dyad simulation engine API server entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use dyad_core::clock::SystemClock;
use dyad_core::model::LanguageModel;
use dyad_engine::TurnResolver;
use dyad_model::OpenRouterClient;
use dyad_session::{SessionDeps, SessionRegistry};
use dyad_store::{FsRunStore, InMemoryCharacterStore, InMemoryPlayerDirectory};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod error;
mod routes;
mod state;

use error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Dyad simulation engine API server");

    // Read configuration from environment.
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
    let games_dir =
        PathBuf::from(std::env::var("DYAD_GAMES_DIR").unwrap_or_else(|_| "games".to_string()));
    let runs_dir =
        PathBuf::from(std::env::var("DYAD_RUNS_DIR").unwrap_or_else(|_| "runs".to_string()));

    // Build collaborators.
    let model: Arc<dyn LanguageModel> = Arc::new(OpenRouterClient::from_env());
    let deps = SessionDeps {
        characters: Arc::new(InMemoryCharacterStore::with_seed_characters()),
        players: Arc::new(InMemoryPlayerDirectory::from_env()),
        clock: Arc::new(SystemClock),
        resolver: Arc::new(TurnResolver::new(model)),
    };
    let app_state = state::AppState::new(
        Arc::new(SessionRegistry::new()),
        deps,
        Arc::new(FsRunStore::new(runs_dir)),
        games_dir,
    );

    // Build router.
    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1/games", routes::games::router())
        .nest("/api/v1/runs", routes::runs::router())
        .nest("/api/v1/players", routes::players::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
