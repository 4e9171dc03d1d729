//! Configuration: scoring-client identity (from code or env) and the exercise
//! definition served by the stand-in service (from TOML).
//!
//! Env variables read by `ClientConfig::from_env`:
//!   GAME_ID, GAME_USER_ID, GAME_PASSWORD, PLAYER_ID : required
//!   GAME_SERVER_URL : optional, defaults to `DEFAULT_SERVER_URL`
//!
//! Exercise TOML (path in EXERCISE_CONFIG_PATH):
//!
//! ```toml
//! target_class = "Triangle"
//!
//! [[levels]]
//! name = "Triangle"
//! declarationContext = "topLevel"
//! modifiers = ["public"]
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::ClassStructure;
use crate::error::{Error, Result};

pub const DEFAULT_SERVER_URL: &str = "https://dev.smartcommunitylab.it/gamification-v3/";

/// How metrics are put on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmissionMode {
  /// Pluggable calculators, metrics nested under `data`; report score = "points".
  #[default]
  Structural,
  /// Built-in fixed metrics flattened into the body; report score = first concept.
  Fixed,
}

#[derive(Clone)]
pub struct ClientConfig {
  pub game_id: String,
  pub user_id: String,
  pub password: String,
  pub player_id: String,
  pub server_url: String,
  pub mode: SubmissionMode,
  /// Transport override, mostly for tests.
  pub http: Option<reqwest::Client>,
}

impl std::fmt::Debug for ClientConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ClientConfig")
      .field("game_id", &self.game_id)
      .field("user_id", &self.user_id)
      .field("password", &"***")
      .field("player_id", &self.player_id)
      .field("server_url", &self.server_url)
      .field("mode", &self.mode)
      .finish()
  }
}

impl ClientConfig {
  /// Blank `server_url` (None, empty or whitespace) falls back to `DEFAULT_SERVER_URL`.
  pub fn new(
    game_id: impl Into<String>,
    user_id: impl Into<String>,
    password: impl Into<String>,
    player_id: impl Into<String>,
    server_url: Option<&str>,
  ) -> Self {
    let server_url = match server_url {
      Some(u) if !u.trim().is_empty() => u.to_string(),
      _ => DEFAULT_SERVER_URL.to_string(),
    };
    Self {
      game_id: game_id.into(),
      user_id: user_id.into(),
      password: password.into(),
      player_id: player_id.into(),
      server_url,
      mode: SubmissionMode::default(),
      http: None,
    }
  }

  pub fn with_mode(mut self, mode: SubmissionMode) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
    self.http = Some(client);
    self
  }

  pub fn from_env() -> Result<Self> {
    let var = |k: &str| std::env::var(k).unwrap_or_default();
    let server = std::env::var("GAME_SERVER_URL").ok();
    let cfg = Self::new(var("GAME_ID"), var("GAME_USER_ID"), var("GAME_PASSWORD"), var("PLAYER_ID"), server.as_deref());
    cfg.validate()?;
    Ok(cfg)
  }

  /// Every identity field must be non-blank. The first offending field is named.
  pub fn validate(&self) -> Result<()> {
    let fields: [(&'static str, &str); 5] = [
      ("gameId", self.game_id.as_str()),
      ("userId", self.user_id.as_str()),
      ("password", self.password.as_str()),
      ("playerId", self.player_id.as_str()),
      ("serverUrl", self.server_url.as_str()),
    ];
    for (field, value) in fields {
      if value.trim().is_empty() {
        return Err(Error::BlankField { field });
      }
    }
    Ok(())
  }
}

/// Exercise served by the stand-in service: the class to grade and its level table.
#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseConfig {
  #[serde(default)]
  pub game_id: Option<String>,
  pub target_class: String,
  #[serde(default)]
  pub levels: Vec<ClassStructure>,
}

pub fn load_exercise_config(path: &Path) -> Result<ExerciseConfig> {
  let text = std::fs::read_to_string(path)?;
  let cfg: ExerciseConfig = toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))?;
  if cfg.target_class.trim().is_empty() {
    return Err(Error::Config("target_class must not be blank".into()));
  }
  Ok(cfg)
}

/// Attempt to load `ExerciseConfig` from EXERCISE_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_exercise_config_from_env() -> Option<ExerciseConfig> {
  let path = std::env::var("EXERCISE_CONFIG_PATH").ok()?;
  match load_exercise_config(Path::new(&path)) {
    Ok(cfg) => {
      info!(target: "cellquest", %path, target_class = %cfg.target_class, levels = cfg.levels.len(), "Loaded exercise config (TOML)");
      Some(cfg)
    }
    Err(e) => {
      error!(target: "cellquest", %path, error = %e, "Failed to load exercise config");
      None
    }
  }
}
