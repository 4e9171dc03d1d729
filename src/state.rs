//! Application state of the stand-in scoring service.
//!
//! This module owns:
//!   - the exercise being graded (target class + level table)
//!   - one progression engine per (game, player), created on first contact
//!
//! The exercise comes from EXERCISE_CONFIG_PATH when present and valid,
//! otherwise from the built-in Triangle seed.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::config::{load_exercise_config_from_env, ExerciseConfig};
use crate::domain::ClassStructure;
use crate::progression::{LevelTable, Outcome, ProgressionEngine, Rejection};
use crate::protocol::PlayerStatus;
use crate::seeds::triangle_exercise;

type PlayerKey = (String, String);

#[derive(Clone)]
pub struct AppState {
    /// When set, only this game id is served.
    pub game_id: Option<String>,
    pub target_class: String,
    pub table: LevelTable,
    pub engines: Arc<RwLock<HashMap<PlayerKey, ProgressionEngine>>>,
}

impl AppState {
    /// Build state from env: exercise config if available, Triangle seed otherwise.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        match load_exercise_config_from_env() {
            Some(cfg) => Self::from_config(cfg),
            None => {
                let (target, table) = triangle_exercise();
                info!(target: "cellquest", %target, levels = table.len(), "Using built-in exercise");
                Self::with_exercise(None, target, table)
            }
        }
    }

    pub fn from_config(cfg: ExerciseConfig) -> Self {
        if cfg.levels.is_empty() {
            warn!(target: "cellquest", target_class = %cfg.target_class, "Exercise has no levels; every submission will be exhausted");
        }
        Self::with_exercise(cfg.game_id, cfg.target_class, LevelTable::new(cfg.levels))
    }

    pub fn with_exercise(game_id: Option<String>, target_class: impl Into<String>, table: LevelTable) -> Self {
        Self {
            game_id,
            target_class: target_class.into(),
            table,
            engines: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn serves_game(&self, game_id: &str) -> bool {
        self.game_id.as_deref().map_or(true, |g| g == game_id)
    }

    fn fresh_engine(&self) -> ProgressionEngine {
        ProgressionEngine::new(self.target_class.clone(), self.table.clone())
    }

    /// Grade a submission for one player and return the resulting status.
    #[instrument(level = "info", skip(self, declarations), fields(submitted = declarations.len()))]
    pub async fn submit(
        &self,
        game_id: &str,
        player_id: &str,
        declarations: &[ClassStructure],
    ) -> Result<PlayerStatus, Rejection> {
        let key = (game_id.to_string(), player_id.to_string());
        let mut engines = self.engines.write().await;
        // New players are only stored once a submission gets past rejection.
        let mut fresh = None;
        let engine = match engines.get_mut(&key) {
            Some(engine) => engine,
            None => fresh.insert(self.fresh_engine()),
        };

        let outcome = engine.submit(declarations)?;
        match outcome {
            Outcome::Advanced { from, to } => {
                info!(target: "grading", %game_id, %player_id, from, to, "Player advanced")
            }
            Outcome::Unchanged => info!(target: "grading", %game_id, %player_id, level = engine.level(), "No progress"),
            Outcome::Exhausted => info!(target: "grading", %game_id, %player_id, "Exercise already complete"),
        }
        let status = engine.status(game_id, player_id);
        if let Some(engine) = fresh {
            engines.insert(key, engine);
        }
        Ok(status)
    }

    /// Current status; players never seen before are at level 0.
    #[instrument(level = "debug", skip(self))]
    pub async fn status(&self, game_id: &str, player_id: &str) -> PlayerStatus {
        let key = (game_id.to_string(), player_id.to_string());
        if let Some(engine) = self.engines.read().await.get(&key) {
            return engine.status(game_id, player_id);
        }
        self.fresh_engine().status(game_id, player_id)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
