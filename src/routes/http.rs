//! HTTP endpoint handlers. These are thin wrappers that forward to the progression state.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;
use axum::{
  body::Bytes,
  extract::{Path, State},
  http::{header::AUTHORIZATION, HeaderMap, StatusCode},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument, warn};

use crate::domain::ClassStructure;
use crate::metrics::MetricId;
use crate::progression::Rejection;
use crate::protocol::*;
use crate::state::AppState;
use crate::util::basic_auth_user;

type HttpError = (StatusCode, Json<ErrorOut>);

fn reject(code: StatusCode, msg: impl Into<String>) -> HttpError {
  (code, Json(ErrorOut { error: msg.into() }))
}

fn require_basic_auth(headers: &HeaderMap) -> Result<String, HttpError> {
  headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(basic_auth_user)
    .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "missing or malformed Basic credentials"))
}

fn require_game(state: &AppState, game_id: &str) -> Result<(), HttpError> {
  if state.serves_game(game_id) {
    Ok(())
  } else {
    Err(reject(StatusCode::NOT_FOUND, format!("unknown game '{}'", game_id)))
  }
}

/// Decoded only after auth and routing checks, so those answer first.
fn submission_body(raw: &[u8]) -> Result<IncomingSubmission, HttpError> {
  serde_json::from_slice(raw)
    .map_err(|e| reject(StatusCode::BAD_REQUEST, format!("malformed submission body: {}", e)))
}

/// Pull the submitted declaration trees out of the metric data.
fn declarations(body: &IncomingSubmission) -> Result<Vec<ClassStructure>, Rejection> {
  let key = MetricId::DeclarationsStructure.as_str();
  let raw = body
    .data
    .get(key)
    .ok_or_else(|| Rejection::MalformedPayload(format!("missing '{}' metric", key)))?;
  serde_json::from_value(raw.clone())
    .map_err(|e| Rejection::MalformedPayload(format!("'{}' is not a declaration list: {}", key, e)))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, headers, raw), fields(%game_id, %action, bytes = raw.len()))]
pub async fn http_post_action(
  State(state): State<Arc<AppState>>,
  Path((game_id, action)): Path<(String, String)>,
  headers: HeaderMap,
  raw: Bytes,
) -> Result<Json<PlayerStatus>, HttpError> {
  let user = require_basic_auth(&headers)?;
  require_game(&state, &game_id)?;
  if action != "SubmitCode" {
    return Err(reject(StatusCode::NOT_FOUND, format!("unknown action '{}'", action)));
  }
  let body = submission_body(&raw)?;
  if body.player_id.trim().is_empty() {
    return Err(reject(StatusCode::BAD_REQUEST, "playerId is required"));
  }

  let decls = declarations(&body).map_err(|r| {
    warn!(target: "grading", %game_id, player_id = %body.player_id, reason = %r, "Submission rejected");
    reject(StatusCode::BAD_REQUEST, r.to_string())
  })?;

  match state.submit(&game_id, &body.player_id, &decls).await {
    Ok(status) => {
      info!(target: "grading", %game_id, player_id = %body.player_id, %user, level = %status.custom_data.level, "SubmitCode graded");
      Ok(Json(status))
    }
    Err(r) => {
      warn!(target: "grading", %game_id, player_id = %body.player_id, reason = %r, "Submission rejected");
      Err(reject(StatusCode::BAD_REQUEST, r.to_string()))
    }
  }
}

#[instrument(level = "info", skip(state, headers), fields(%game_id, %player_id))]
pub async fn http_get_player(
  State(state): State<Arc<AppState>>,
  Path((game_id, player_id)): Path<(String, String)>,
  headers: HeaderMap,
) -> Result<Json<PlayerStatus>, HttpError> {
  require_basic_auth(&headers)?;
  require_game(&state, &game_id)?;
  let status = state.status(&game_id, &player_id).await;
  info!(target: "grading", %game_id, %player_id, level = %status.custom_data.level, "Player status served");
  Ok(Json(status))
}
