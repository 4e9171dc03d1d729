//! Wire types shared by the scoring client and the stand-in service (serde ready).
//! Field names follow the gamification engine's JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Point concept used for the report score in structural mode.
pub const POINTS: &str = "points";
pub const GOLD_COINS: &str = "gold coins";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PointConcept {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub score: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    #[serde(default)]
    pub point_concept: Vec<PointConcept>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomData {
    #[serde(default)]
    pub level: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exercise: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub player_id: String,
    pub game_id: String,
    #[serde(default)]
    pub state: GameState,
    #[serde(default)]
    pub custom_data: CustomData,
}

impl PlayerStatus {
    pub fn concept(&self, name: &str) -> Option<&PointConcept> {
        self.state.point_concept.iter().find(|p| p.name == name)
    }
}

/// User-facing summary after a submission or a status fetch.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateReport {
    pub status: String,
    pub current_level: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold_coins: Option<f64>,
}

/// Body accepted by the stand-in service on `SubmitCode`. Metrics are kept as raw
/// JSON; only the ones the grader needs are decoded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingSubmission {
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub player_id: String,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
