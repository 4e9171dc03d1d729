//! Client for the remote gamification engine.
//!
//! One `ScoringClient` represents one player's grading session: it computes the
//! metrics for each executed cell, posts them as a `SubmitCode` action and, when the
//! engine accepts the action, fetches the updated player status as a report.
//!
//! Failure handling differs per call on purpose:
//!   - a rejected submission (non-200) is published to the `DiagnosticSink` and
//!     `submit_actions` returns `Ok(None)`; the session carries on.
//!   - a failed status fetch (non-200) is a hard `Error::ReportFetch`.
//!   - transport errors propagate as `Error::Http`. No timeout, no retry.
//!
//! NOTE: credentials are sent as a Basic header rebuilt on every request and are never logged.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{StatusCode, Url};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ClientConfig, SubmissionMode};
use crate::error::{Error, Result};
use crate::execution::{Execution, ExecutionContext};
use crate::metrics::{MetricRegistry, REQUIRED_METRICS};
use crate::protocol::{GameStateReport, PlayerStatus, GOLD_COINS, POINTS};
use crate::submission::{build_flat_submission, build_submission, SubmissionPayload};
use crate::util::{basic_auth_header, endpoint, normalize_base_url, trunc_for_log};

const SUBMIT_ACTION: &str = "SubmitCode";
const SUCCEEDED: &str = "Succeeded";

/// Error surfaced to the host environment when the engine refuses an action.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorProduced {
  pub status: u16,
  /// HTTP reason phrase, shown inline to the learner.
  pub message: String,
}

/// Where rejected submissions are reported. The host environment decides how to show them.
pub trait DiagnosticSink: Send + Sync {
  fn publish(&self, event: ErrorProduced);
}

/// Default sink: log only.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
  fn publish(&self, event: ErrorProduced) {
    error!(target: "scoring_client", status = event.status, message = %event.message, "Submission rejected");
  }
}

/// Keeps every published event; handy for hosts that render them later, and for tests.
#[derive(Default)]
pub struct RecordingSink {
  events: Mutex<Vec<ErrorProduced>>,
}

impl RecordingSink {
  pub fn events(&self) -> Vec<ErrorProduced> {
    self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }
}

impl DiagnosticSink for RecordingSink {
  fn publish(&self, event: ErrorProduced) {
    self.events.lock().unwrap_or_else(|e| e.into_inner()).push(event);
  }
}

pub struct ScoringClient {
  config: ClientConfig,
  base_url: Url,
  http: reqwest::Client,
  registry: MetricRegistry,
  sink: Arc<dyn DiagnosticSink>,
  last_run: Option<DateTime<Utc>>,
  last_status: Option<PlayerStatus>,
}

impl ScoringClient {
  /// Validate identity fields and build the client. Fails on the first blank field.
  pub fn new(config: ClientConfig, registry: MetricRegistry) -> Result<Self> {
    config.validate()?;
    let base_url = normalize_base_url(&config.server_url)?;
    let http = match &config.http {
      Some(c) => c.clone(),
      None => reqwest::Client::builder().build()?,
    };
    info!(target: "scoring_client", game_id = %config.game_id, player_id = %config.player_id, server = %base_url, mode = ?config.mode, "Scoring client configured");
    Ok(Self {
      config,
      base_url,
      http,
      registry,
      sink: Arc::new(TracingSink),
      last_run: None,
      last_status: None,
    })
  }

  pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
    self.sink = sink;
    self
  }

  pub fn config(&self) -> &ClientConfig {
    &self.config
  }

  pub fn registry_mut(&mut self) -> &mut MetricRegistry {
    &mut self.registry
  }

  /// Time of the last submission the engine accepted.
  pub fn last_run(&self) -> Option<DateTime<Utc>> {
    self.last_run
  }

  /// Most recent successfully fetched player status.
  pub fn last_status(&self) -> Option<&PlayerStatus> {
    self.last_status.as_ref()
  }

  /// Grade one executed cell. `Ok(None)` means the engine rejected the action and
  /// an `ErrorProduced` was published.
  #[instrument(level = "info", skip(self, execution), fields(game_id = %self.config.game_id, player_id = %self.config.player_id, kernel = %execution.kernel))]
  pub async fn submit_actions(&mut self, execution: &Execution) -> Result<Option<GameStateReport>> {
    let ctx = ExecutionContext::new(execution, self.last_run, Utc::now());
    let payload = self.build_payload(&ctx).await?;
    let url = endpoint(
      &self.base_url,
      &format!("exec/game/{}/action/{}", self.config.game_id, SUBMIT_ACTION),
    )?;

    let start = std::time::Instant::now();
    let res = self
      .http
      .post(url)
      .header(USER_AGENT, "cellquest/0.1")
      .header(AUTHORIZATION, basic_auth_header(&self.config.user_id, &self.config.password))
      .json(&payload)
      .send()
      .await?;
    let status = res.status();
    debug!(target: "scoring_client", %status, elapsed = ?start.elapsed(), "SubmitCode answered");

    if status == StatusCode::OK {
      self.last_run = Some(Utc::now());
      return self.get_report().await.map(Some);
    }

    let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
    warn!(target: "scoring_client", code = status.as_u16(), %reason, "SubmitCode rejected; report skipped");
    self.sink.publish(ErrorProduced { status: status.as_u16(), message: reason });
    Ok(None)
  }

  async fn build_payload(&self, ctx: &ExecutionContext<'_>) -> Result<SubmissionPayload> {
    let (game_id, player_id) = (&self.config.game_id, &self.config.player_id);
    Ok(match self.config.mode {
      SubmissionMode::Structural => {
        let data = self.registry.compute_all(&REQUIRED_METRICS, ctx).await?;
        SubmissionPayload::Structural(build_submission(game_id, player_id, data))
      }
      SubmissionMode::Fixed => SubmissionPayload::Flat(build_flat_submission(game_id, player_id, ctx)),
    })
  }

  /// Fetch the player's current status and map it to a report. Safe to repeat.
  #[instrument(level = "info", skip(self), fields(game_id = %self.config.game_id, player_id = %self.config.player_id))]
  pub async fn get_report(&mut self) -> Result<GameStateReport> {
    let url = endpoint(
      &self.base_url,
      &format!("data/game/{}/player/{}", self.config.game_id, self.config.player_id),
    )?;

    let res = self
      .http
      .get(url)
      .header(USER_AGENT, "cellquest/0.1")
      .header(AUTHORIZATION, basic_auth_header(&self.config.user_id, &self.config.password))
      .send()
      .await?;

    let status = res.status();
    if status != StatusCode::OK {
      let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
      error!(target: "scoring_client", code = status.as_u16(), %reason, "Player status fetch failed");
      return Err(Error::ReportFetch { code: status.as_u16(), reason });
    }

    let body = res.text().await?;
    debug!(target: "scoring_client", body = %trunc_for_log(&body, 512), "Player status received");
    let player: PlayerStatus = serde_json::from_str(&body)?;
    // Retained even when it cannot be mapped to a report.
    let player = self.last_status.insert(player);
    let report = to_report(player, self.config.mode)?;
    info!(target: "scoring_client", level = %report.current_level, score = report.score, "Report ready");
    Ok(report)
  }
}

/// Structural mode reports the "points" concept; fixed mode reports the first concept.
pub fn to_report(player: &PlayerStatus, mode: SubmissionMode) -> Result<GameStateReport> {
  let score = match mode {
    SubmissionMode::Structural => player
      .concept(POINTS)
      .ok_or_else(|| Error::MissingPointConcept { name: POINTS.into() })?,
    SubmissionMode::Fixed => player
      .state
      .point_concept
      .first()
      .ok_or_else(|| Error::MissingPointConcept { name: "#0".into() })?,
  };
  Ok(GameStateReport {
    status: SUCCEEDED.into(),
    current_level: player.custom_data.level.clone(),
    score: score.score,
    gold_coins: player.concept(GOLD_COINS).map(|p| p.score),
  })
}
