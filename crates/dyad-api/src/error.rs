//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dyad_core::error::SimError;
use serde::Serialize;
use thiserror::Error;

/// Startup errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `SimError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub SimError);

impl From<SimError> for ApiError {
    fn from(err: SimError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            SimError::CharacterNotFound(_) => (StatusCode::NOT_FOUND, "character_not_found"),
            SimError::RunNotFound(_) => (StatusCode::NOT_FOUND, "run_not_found"),
            SimError::GameNotFound(_) => (StatusCode::NOT_FOUND, "game_not_found"),
            SimError::Authorization(_) => (StatusCode::FORBIDDEN, "authorization_failed"),
            SimError::GameValidation(_) => (StatusCode::BAD_REQUEST, "game_validation_failed"),
            SimError::InvalidLifecycleTransition(_) => {
                (StatusCode::CONFLICT, "invalid_lifecycle_transition")
            }
            SimError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: SimError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_not_found_variants_map_to_404() {
        assert_eq!(
            status_of(SimError::CharacterNotFound("ghost".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SimError::RunNotFound("explore-api-x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SimError::GameNotFound("Foresight".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_authorization_maps_to_403() {
        assert_eq!(
            status_of(SimError::Authorization("no identity".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_game_validation_maps_to_400() {
        assert_eq!(
            status_of(SimError::GameValidation("bad npc".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_invalid_transition_maps_to_409() {
        assert_eq!(
            status_of(SimError::InvalidLifecycleTransition("exited".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_persistence_maps_to_500() {
        assert_eq!(
            status_of(SimError::Persistence("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
