//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - Feedback proxy at `/api/generate`
/// - Progress API under `/api/v1/...`
/// - CORS (allow any origin/method/headers) - adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let user_exercise = "/api/v1/users/:user_id/exercises/:exercise_id";

    Router::new()
        .route("/api/generate", post(http::http_post_generate))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/exercises", get(http::http_list_exercises))
        .route("/api/v1/users", post(http::http_register))
        .route("/api/v1/users/:user_id", post(http::http_register_as))
        .route("/api/v1/users/:user_id/progress", get(http::http_get_progress))
        .route("/api/v1/users/:user_id/practice-time", post(http::http_post_practice_time))
        .route(&format!("{user_exercise}/next"), get(http::http_get_next))
        .route(&format!("{user_exercise}/answer"), post(http::http_post_answer))
        .route(&format!("{user_exercise}/likert"), post(http::http_post_likert))
        .route(&format!("{user_exercise}/complete"), post(http::http_post_complete))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
