//! Router assembly: gamification-engine endpoints, health check, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the stand-in service router with:
/// - `POST /exec/game/:game_id/action/:action` (only `SubmitCode` is known)
/// - `GET /data/game/:game_id/player/:player_id`
/// - `GET /api/v1/health`
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/exec/game/:game_id/action/:action", post(http::http_post_action))
        .route("/data/game/:game_id/player/:player_id", get(http::http_get_player))
        .route("/api/v1/health", get(http::http_health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
