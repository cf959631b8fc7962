//! Player consent-flow routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use dyad_core::store::PlayerProfile;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /api/v1/players.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePlayerRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Remaining consent-form answers keyed by question.
    #[serde(default)]
    pub answers: serde_json::Map<String, serde_json::Value>,
}

/// Response body carrying the one-time access key.
#[derive(Debug, Serialize)]
pub struct CreatePlayerResponse {
    pub player_id: String,
    /// Returned exactly once; only its digest is stored.
    pub access_key: String,
}

/// POST /api/v1/players
#[instrument(skip(state, request))]
async fn create_player(
    State(state): State<AppState>,
    Json(request): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<CreatePlayerResponse>), ApiError> {
    let issued = state
        .deps
        .players
        .create_player(PlayerProfile {
            full_name: request.full_name,
            email: request.email,
            answers: request.answers,
        })
        .await?;

    info!(player_id = %issued.player_id, "player created");
    Ok((
        StatusCode::CREATED,
        Json(CreatePlayerResponse {
            player_id: issued.player_id,
            access_key: issued.access_key,
        }),
    ))
}

/// Returns the router for the consent flow.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_player))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use dyad_core::clock::SystemClock;
    use dyad_core::model::LanguageModel;
    use dyad_engine::TurnResolver;
    use dyad_session::{SessionDeps, SessionRegistry};
    use dyad_store::{InMemoryCharacterStore, InMemoryPlayerDirectory, InMemoryRunStore};
    use dyad_test_support::ScriptedModel;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state() -> AppState {
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
            std::path::PathBuf::from("games"),
        )
    }

    #[tokio::test]
    async fn test_create_player_returns_one_time_access_key() {
        // Arrange
        let state = test_state();
        let app = router().with_state(state.clone());
        let body = serde_json::json!({
            "full_name": "Ada",
            "answers": { "consented": true }
        });

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        let access_key = json["access_key"].as_str().unwrap();
        assert_eq!(access_key.len(), 32);

        // The key resolves back to the issued player id.
        let resolved = state
            .deps
            .players
            .resolve_player_id(access_key)
            .await
            .unwrap();
        assert_eq!(resolved.as_deref(), json["player_id"].as_str());
    }
}
