//! Error taxonomy shared by the progress subsystem and its HTTP surface.
//!
//! Every variant is recovered at the boundary of the triggering request: handlers
//! turn it into a `{ "error": ... }` body with a matching status code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::domain::{ExerciseId, ScenarioId, UserId};

/// Failures of the persistence service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("no progress document for user '{user}'")]
    Missing { user: UserId },

    #[error("progress document for user '{user}' already exists")]
    AlreadyExists { user: UserId },

    #[error("transaction aborted after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("exercise '{exercise}' has no content")]
    ContentExhaustedButEmpty { exercise: ExerciseId },

    #[error("unknown exercise '{0}'")]
    UnknownExercise(ExerciseId),

    #[error("unknown scenario '{scenario}' for exercise '{exercise}'")]
    UnknownScenario { exercise: ExerciseId, scenario: ScenarioId },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("feedback service error: {0}")]
    FeedbackService(String),

    #[error("feedback service not configured")]
    FeedbackUnavailable,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ContentExhaustedButEmpty { .. } => StatusCode::NOT_FOUND,
            AppError::UnknownExercise(_) => StatusCode::NOT_FOUND,
            AppError::UnknownScenario { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(PersistenceError::Missing { .. }) => StatusCode::NOT_FOUND,
            AppError::Persistence(PersistenceError::AlreadyExists { .. }) => StatusCode::CONFLICT,
            AppError::Persistence(PersistenceError::Conflict { .. }) => StatusCode::CONFLICT,
            AppError::Persistence(PersistenceError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::FeedbackService(_) => StatusCode::BAD_GATEWAY,
            AppError::FeedbackUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Unreadable or mismatched JSON bodies are client input errors.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(target: "counsel_backend", %status, error = %self, "Request failed");
        } else {
            tracing::warn!(target: "counsel_backend", %status, error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_document_maps_to_not_found() {
        let err = AppError::from(PersistenceError::Missing { user: "u1".into() });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "no progress document for user 'u1'");
    }

    #[test]
    fn feedback_failures_are_gateway_errors() {
        assert_eq!(AppError::FeedbackService("boom".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::FeedbackUnavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn conflict_is_retryable_by_the_user() {
        let err = AppError::from(PersistenceError::Conflict { attempts: 5 });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
