//! Run lifecycle routes.
//!
//! Each route is transport framing around one session operation; the
//! session worker owns all sequencing, so handlers just relay through
//! the registry's handle.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::delete, routing::get, routing::post};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use dyad_core::error::SimError;
use dyad_core::event::Event;
use dyad_session::{CreateRequest, Session, SessionHandle, SessionMeta, SessionView};

use crate::error::ApiError;
use crate::state::AppState;

fn default_source() -> String {
    "api".to_string()
}

/// Request body for POST /api/v1/runs.
#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    /// Game name or explicit config path.
    pub game: String,
    /// Where the run originates; part of the run id.
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub pc_choice: Option<String>,
    #[serde(default)]
    pub npc_choice: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub player_id: Option<String>,
}

/// Response body for a created run.
#[derive(Debug, Serialize)]
pub struct CreateRunResponse {
    pub run_id: String,
}

/// Request body for POST /api/v1/runs/{id}/step.
#[derive(Debug, Default, Deserialize)]
pub struct StepRequest {
    /// Player input; absent means an empty step (the `ENTER` step).
    #[serde(default)]
    pub user_input: Option<String>,
}

/// Response body for a step (and for play, which batches steps).
#[derive(Debug, Serialize)]
pub struct StepResponse {
    pub events: Vec<Event>,
    pub meta: SessionMeta,
}

/// Request body for POST /api/v1/runs/{id}/play.
#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    /// Inputs processed strictly in order.
    pub inputs: Vec<String>,
}

/// Request body for POST /api/v1/runs/{id}/exit.
#[derive(Debug, Default, Deserialize)]
pub struct ExitRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response body for POST /api/v1/runs/{id}/save.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub output_path: String,
}

/// POST /api/v1/runs
#[instrument(skip(state, request), fields(game = %request.game, source = %request.source))]
async fn create_run(
    State(state): State<AppState>,
    Json(request): Json<CreateRunRequest>,
) -> Result<(StatusCode, Json<CreateRunResponse>), ApiError> {
    let session = Session::create(
        CreateRequest {
            game: request.game,
            source: request.source,
            pc_choice: request.pc_choice,
            npc_choice: request.npc_choice,
            access_key: request.access_key,
            player_id: request.player_id,
        },
        &state.games_dir,
        &state.deps,
    )
    .await?;

    let handle = SessionHandle::spawn(session, state.run_store.clone());
    let run_id = handle.run_id().to_owned();
    state.registry.add(handle);
    info!(%run_id, "run created");

    Ok((StatusCode::CREATED, Json(CreateRunResponse { run_id })))
}

/// POST /api/v1/runs/{id}/step
#[instrument(skip(state, request), fields(run_id = %run_id))]
async fn step_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(request): Json<StepRequest>,
) -> Result<Json<StepResponse>, ApiError> {
    let handle = state.registry.get(&run_id)?;
    let (events, meta) = handle.step(request.user_input.as_deref().unwrap_or("")).await?;
    Ok(Json(StepResponse { events, meta }))
}

/// POST /api/v1/runs/{id}/play
///
/// Batches inputs through the session strictly in order. A lifecycle
/// rejection (the session exited mid-batch) stops the batch and
/// returns what was produced; other errors propagate.
#[instrument(skip(state, request), fields(run_id = %run_id, inputs = request.inputs.len()))]
async fn play_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(request): Json<PlayRequest>,
) -> Result<Json<StepResponse>, ApiError> {
    let handle = state.registry.get(&run_id)?;

    let mut events = Vec::new();
    for input in &request.inputs {
        match handle.step(input).await {
            Ok((mut produced, _)) => events.append(&mut produced),
            Err(SimError::InvalidLifecycleTransition(_)) => break,
            Err(other) => return Err(other.into()),
        }
    }

    let meta = handle.meta().await?;
    Ok(Json(StepResponse { events, meta }))
}

/// GET /api/v1/runs/{id}
#[instrument(skip(state), fields(run_id = %run_id))]
async fn snapshot_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = state.registry.get(&run_id)?;
    Ok(Json(handle.snapshot().await?))
}

/// POST /api/v1/runs/{id}/exit
#[instrument(skip(state, request), fields(run_id = %run_id))]
async fn exit_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    Json(request): Json<ExitRequest>,
) -> Result<Json<SessionMeta>, ApiError> {
    let handle = state.registry.get(&run_id)?;
    let reason = request.reason.as_deref().unwrap_or("player exited");
    Ok(Json(handle.exit(reason).await?))
}

/// POST /api/v1/runs/{id}/save
#[instrument(skip(state), fields(run_id = %run_id))]
async fn save_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<SaveResponse>, ApiError> {
    let handle = state.registry.get(&run_id)?;
    let output_path = handle.save().await?;
    Ok(Json(SaveResponse { output_path }))
}

/// DELETE /api/v1/runs/{id}
#[instrument(skip(state), fields(run_id = %run_id))]
async fn delete_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    // Dropping the removed handle stops the worker once in-flight
    // requests drain.
    state.registry.remove(&run_id)?;
    info!(%run_id, "run deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for run lifecycle operations.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_run))
        .route("/{id}", get(snapshot_run))
        .route("/{id}", delete(delete_run))
        .route("/{id}/step", post(step_run))
        .route("/{id}/play", post(play_run))
        .route("/{id}/exit", post(exit_run))
        .route("/{id}/save", post(save_run))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use dyad_core::clock::SystemClock;
    use dyad_core::model::LanguageModel;
    use dyad_engine::TurnResolver;
    use dyad_session::{SessionDeps, SessionRegistry};
    use dyad_store::{InMemoryCharacterStore, InMemoryPlayerDirectory, InMemoryRunStore};
    use dyad_test_support::ScriptedModel;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const VALID_VERDICT: &str = r#"{"events": [{"type": "user", "content": "ok"}]}"#;
    const DRAFT: &str =
        r#"{"event_draft": {"type": "ai", "content": "The flatworm moves slowly across the surface."}}"#;

    const EXPLORE_GAME: &str = r#"
name: Explore
version: "1.0.0"
welcome_message: Welcome.
default_pc: human-normative
default_npc: flatworm
"#;

    const GATED_GAME: &str = r#"
name: Infer Intent
version: "1.0.0"
welcome_message: Welcome.
requires_consent: true
default_pc: human-normative
default_npc: flatworm
"#;

    fn test_app(games_dir: &std::path::Path) -> Router {
        let model = Arc::new(ScriptedModel::new(VALID_VERDICT, DRAFT));
        let deps = SessionDeps {
            characters: Arc::new(InMemoryCharacterStore::with_seed_characters()),
            players: Arc::new(InMemoryPlayerDirectory::new("test-pepper")),
            clock: Arc::new(SystemClock),
            resolver: Arc::new(TurnResolver::new(model as Arc<dyn LanguageModel>)),
        };
        let state = AppState::new(
            Arc::new(SessionRegistry::new()),
            deps,
            Arc::new(InMemoryRunStore::new()),
            games_dir.to_path_buf(),
        );
        router().with_state(state)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn created_run_id(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(post_json("/", &json!({ "game": "explore" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["run_id"]
            .as_str()
            .unwrap()
            .to_owned()
    }

    #[tokio::test]
    async fn test_create_step_snapshot_flow() {
        // Arrange
        let games_dir = tempfile::tempdir().unwrap();
        std::fs::write(games_dir.path().join("explore.yaml"), EXPLORE_GAME).unwrap();
        let app = test_app(games_dir.path());
        let run_id = created_run_id(&app).await;

        // Act: the ENTER step, then one freeform turn.
        let response = app
            .clone()
            .oneshot(post_json(&format!("/{run_id}/step"), &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let enter = body_json(response).await;
        assert_eq!(enter["meta"]["turns"], 1);
        assert_eq!(enter["meta"]["lifecycle"], "UPDATE");

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/{run_id}/step"),
                &json!({ "user_input": "I wave my hand" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let step = body_json(response).await;
        assert_eq!(step["meta"]["turns"], 2);
        let last = step["events"].as_array().unwrap().last().unwrap().clone();
        assert_eq!(last["type"], "assistant");

        // Assert: the snapshot reflects both turns.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/{run_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let view = body_json(response).await;
        assert_eq!(view["history"].as_array().unwrap().len(), 4);
        assert_eq!(view["game_name"], "Explore");
    }

    #[tokio::test]
    async fn test_play_batches_inputs_in_order() {
        let games_dir = tempfile::tempdir().unwrap();
        std::fs::write(games_dir.path().join("explore.yaml"), EXPLORE_GAME).unwrap();
        let app = test_app(games_dir.path());
        let run_id = created_run_id(&app).await;

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/{run_id}/play"),
                &json!({ "inputs": ["", "I wave my hand", "I crouch down"] }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let played = body_json(response).await;
        assert_eq!(played["meta"]["turns"], 3);
    }

    #[tokio::test]
    async fn test_exit_save_and_delete_round_trip() {
        let games_dir = tempfile::tempdir().unwrap();
        std::fs::write(games_dir.path().join("explore.yaml"), EXPLORE_GAME).unwrap();
        let app = test_app(games_dir.path());
        let run_id = created_run_id(&app).await;

        let response = app
            .clone()
            .oneshot(post_json(&format!("/{run_id}/save"), &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved = body_json(response).await;
        assert!(saved["output_path"].as_str().unwrap().contains(&run_id));

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/{run_id}/exit"),
                &json!({ "reason": "test over" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let meta = body_json(response).await;
        assert_eq!(meta["exited"], true);
        assert_eq!(meta["exit_reason"], "test over");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/{run_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // The id is no longer live.
        let response = app
            .clone()
            .oneshot(post_json(&format!("/{run_id}/step"), &json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_maps_domain_failures_to_statuses() {
        let games_dir = tempfile::tempdir().unwrap();
        std::fs::write(games_dir.path().join("explore.yaml"), EXPLORE_GAME).unwrap();
        std::fs::write(games_dir.path().join("infer-intent.yaml"), GATED_GAME).unwrap();
        let app = test_app(games_dir.path());

        let response = app
            .clone()
            .oneshot(post_json("/", &json!({ "game": "Foresight" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(post_json("/", &json!({ "game": "Infer Intent" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(post_json(
                "/",
                &json!({ "game": "explore", "npc_choice": "ghost" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
