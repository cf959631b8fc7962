//! Game discovery routes.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;
use tracing::instrument;

use dyad_session::GameConfig;

use crate::error::ApiError;
use crate::state::AppState;

/// One discoverable game.
#[derive(Debug, Serialize)]
pub struct GameSummary {
    pub name: String,
    pub version: String,
    pub description: String,
    pub requires_consent: bool,
    pub goal_inference: bool,
}

impl From<GameConfig> for GameSummary {
    fn from(config: GameConfig) -> Self {
        Self {
            name: config.name,
            version: config.version,
            description: config.description,
            requires_consent: config.requires_consent,
            goal_inference: config.goal_inference,
        }
    }
}

/// GET /api/v1/games
#[instrument(skip(state))]
async fn list_games(State(state): State<AppState>) -> Result<Json<Vec<GameSummary>>, ApiError> {
    let games = GameConfig::list(&state.games_dir)?;
    Ok(Json(games.into_iter().map(GameSummary::from).collect()))
}

/// Returns the router for game discovery.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_games))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use dyad_core::clock::SystemClock;
    use dyad_core::model::LanguageModel;
    use dyad_engine::TurnResolver;
    use dyad_session::{SessionDeps, SessionRegistry};
    use dyad_store::{InMemoryCharacterStore, InMemoryPlayerDirectory, InMemoryRunStore};
    use dyad_test_support::ScriptedModel;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    const GAME: &str = r#"
name: Explore
version: "1.0.0"
description: Free exploration.
welcome_message: Welcome.
default_pc: human-normative
default_npc: flatworm
"#;

    fn test_state(games_dir: &std::path::Path) -> AppState {
        let model = Arc::new(ScriptedModel::new("{}", "{}"));
        let deps = SessionDeps {
            characters: Arc::new(InMemoryCharacterStore::with_seed_characters()),
            players: Arc::new(InMemoryPlayerDirectory::new("test-pepper")),
            clock: Arc::new(SystemClock),
            resolver: Arc::new(TurnResolver::new(model as Arc<dyn LanguageModel>)),
        };
        AppState::new(
            Arc::new(SessionRegistry::new()),
            deps,
            Arc::new(InMemoryRunStore::new()),
            games_dir.to_path_buf(),
        )
    }

    #[tokio::test]
    async fn test_list_games_returns_discoverable_configs() {
        // Arrange
        let games_dir = tempfile::tempdir().unwrap();
        std::fs::write(games_dir.path().join("explore.yaml"), GAME).unwrap();
        let app = router().with_state(test_state(games_dir.path()));

        let request = Request::builder()
            .method("GET")
            .uri("/")
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "Explore");
        assert_eq!(json[0]["requires_consent"], false);
    }
}
