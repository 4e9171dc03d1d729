//! Outbound payloads for `SubmitCode`. Pure assembly, no validation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::execution::{ExecutionContext, Severity};
use crate::metrics::MetricValue;

/// Structural-grading payload: metrics nested under `data`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  pub game_id: String,
  pub player_id: String,
  pub data: BTreeMap<String, MetricValue>,
}

/// Fixed-metric payload: the metrics flattened next to the identity fields.
#[derive(Debug, Serialize, PartialEq)]
pub struct FlatSubmission {
  #[serde(rename = "gameId")]
  pub game_id: String,
  #[serde(rename = "playerId")]
  pub player_id: String,
  #[serde(rename = "runTimems")]
  pub run_time_ms: f64,
  #[serde(rename = "timeSinceLastActionms")]
  pub time_since_last_action_ms: f64,
  pub success: bool,
  #[serde(rename = "warningCount")]
  pub warning_count: usize,
  #[serde(rename = "errorCount")]
  pub error_count: usize,
  #[serde(rename = "newVariables")]
  pub new_variables: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SubmissionPayload {
  Structural(Submission),
  Flat(FlatSubmission),
}

pub fn build_submission(game_id: &str, player_id: &str, data: BTreeMap<String, MetricValue>) -> Submission {
  Submission { game_id: game_id.to_string(), player_id: player_id.to_string(), data }
}

pub fn build_flat_submission(game_id: &str, player_id: &str, ctx: &ExecutionContext<'_>) -> FlatSubmission {
  let ex = ctx.execution;
  FlatSubmission {
    game_id: game_id.to_string(),
    player_id: player_id.to_string(),
    run_time_ms: ex.run_time.as_micros() as f64 / 1000.0,
    time_since_last_action_ms: ctx.millis_since_last_run(),
    success: !ex.failed(),
    warning_count: ex.count_severity(Severity::Warning),
    error_count: ex.count_severity(Severity::Error),
    new_variables: ex.new_variables.clone(),
  }
}
