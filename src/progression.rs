//! Level progression for one player on one exercise.
//!
//! The engine holds an ordered level table and a level counter `L` that starts at 0
//! and only ever grows. A submission is graded against the expected structure of
//! level `L` alone: an exact structural match advances to `L + 1`, anything else
//! (a mismatch, a structure for a later level, or a table already exhausted) leaves
//! `L` untouched. Score is always derived from `L`, never stored.

use tracing::{debug, info, instrument};

use crate::domain::{find_class, ClassStructure};
use crate::protocol::{CustomData, GameState, PlayerStatus, PointConcept, GOLD_COINS, POINTS};

/// Expected structure per level; position in the list is the level index.
#[derive(Clone, Debug, Default)]
pub struct LevelTable {
  levels: Vec<ClassStructure>,
}

impl LevelTable {
  pub fn new(levels: Vec<ClassStructure>) -> Self {
    Self { levels }
  }

  pub fn len(&self) -> usize {
    self.levels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.levels.is_empty()
  }

  pub fn get(&self, level: usize) -> Option<&ClassStructure> {
    self.levels.get(level)
  }
}

/// Score as a pure function of level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scoring {
  pub points: f64,
  pub gold_coins: f64,
}

pub fn score_for(level: usize) -> Scoring {
  Scoring { points: level as f64 * 10.0, gold_coins: level as f64 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
  Advanced { from: usize, to: usize },
  /// Target found but did not equal the current level's expectation.
  Unchanged,
  /// Every level already solved.
  Exhausted,
}

/// Submission refused before grading. Level is never changed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
  #[error("submitted declarations do not include class '{name}'")]
  MissingTarget { name: String },
  #[error("malformed submission: {0}")]
  MalformedPayload(String),
}

#[derive(Clone, Debug)]
pub struct ProgressionEngine {
  target_class: String,
  table: LevelTable,
  level: usize,
}

impl ProgressionEngine {
  pub fn new(target_class: impl Into<String>, table: LevelTable) -> Self {
    Self { target_class: target_class.into(), table, level: 0 }
  }

  pub fn level(&self) -> usize {
    self.level
  }

  pub fn target_class(&self) -> &str {
    &self.target_class
  }

  pub fn is_complete(&self) -> bool {
    self.level >= self.table.len()
  }

  pub fn scoring(&self) -> Scoring {
    score_for(self.level)
  }

  /// Grade one submission. The target class is looked up by exact name among the
  /// submitted declarations and compared with full structural equality.
  #[instrument(level = "debug", skip(self, declarations), fields(target = %self.target_class, level = self.level, submitted = declarations.len()))]
  pub fn submit(&mut self, declarations: &[ClassStructure]) -> Result<Outcome, Rejection> {
    let submitted = find_class(declarations, &self.target_class)
      .ok_or_else(|| Rejection::MissingTarget { name: self.target_class.clone() })?;

    let Some(expected) = self.table.get(self.level) else {
      debug!(target: "grading", level = self.level, "Level table exhausted; nothing to grade");
      return Ok(Outcome::Exhausted);
    };

    if submitted == expected {
      let from = self.level;
      self.level += 1;
      info!(target: "grading", from, to = self.level, "Level advanced");
      Ok(Outcome::Advanced { from, to: self.level })
    } else {
      debug!(target: "grading", level = self.level, "Submission does not match expected structure");
      Ok(Outcome::Unchanged)
    }
  }

  /// Player status document for the current level.
  pub fn status(&self, game_id: &str, player_id: &str) -> PlayerStatus {
    let s = self.scoring();
    PlayerStatus {
      player_id: player_id.to_string(),
      game_id: game_id.to_string(),
      state: GameState {
        point_concept: vec![
          PointConcept { id: "0".into(), name: POINTS.into(), score: s.points },
          PointConcept { id: "1".into(), name: GOLD_COINS.into(), score: s.gold_coins },
        ],
      },
      custom_data: CustomData { level: self.level.to_string(), exercise: self.target_class.clone() },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::triangle_exercise;

  fn engine() -> ProgressionEngine {
    let (target, table) = triangle_exercise();
    ProgressionEngine::new(target, table)
  }

  fn level(n: usize) -> ClassStructure {
    triangle_exercise().1.get(n).cloned().unwrap()
  }

  #[test]
  fn matching_structure_advances_one_level() {
    let mut e = engine();
    assert_eq!(e.submit(&[level(0)]), Ok(Outcome::Advanced { from: 0, to: 1 }));
    assert_eq!(e.level(), 1);
    assert_eq!(e.scoring(), Scoring { points: 10.0, gold_coins: 1.0 });
  }

  #[test]
  fn skipping_ahead_does_not_advance() {
    let mut e = engine();
    assert_eq!(e.submit(&[level(1)]), Ok(Outcome::Unchanged));
    assert_eq!(e.level(), 0);
    e.submit(&[level(0)]).unwrap();
    assert_eq!(e.submit(&[level(2)]), Ok(Outcome::Unchanged));
    assert_eq!(e.level(), 1);
  }

  #[test]
  fn repeating_a_solved_level_does_not_advance() {
    let mut e = engine();
    e.submit(&[level(0)]).unwrap();
    assert_eq!(e.submit(&[level(0)]), Ok(Outcome::Unchanged));
    assert_eq!(e.level(), 1);
  }

  #[test]
  fn full_walkthrough_scores_by_level() {
    let mut e = engine();
    for n in 0..4 {
      e.submit(&[level(n)]).unwrap();
      assert_eq!(e.scoring(), score_for(n + 1));
    }
    assert!(e.is_complete());
    assert_eq!(e.scoring(), Scoring { points: 40.0, gold_coins: 4.0 });
    assert_eq!(e.submit(&[level(3)]), Ok(Outcome::Exhausted));
    assert_eq!(e.level(), 4);
  }

  #[test]
  fn missing_target_is_rejected_without_change() {
    let mut e = engine();
    let other = ClassStructure::new("Square", crate::domain::DeclarationContextKind::TopLevel, ["public"]);
    assert_eq!(e.submit(&[other]), Err(Rejection::MissingTarget { name: "Triangle".into() }));
    assert_eq!(e.submit(&[]), Err(Rejection::MissingTarget { name: "Triangle".into() }));
    assert_eq!(e.level(), 0);
  }

  #[test]
  fn target_is_found_among_other_declarations() {
    let mut e = engine();
    let helper = ClassStructure::new("Helper", crate::domain::DeclarationContextKind::TopLevel, ["internal"]);
    assert!(matches!(e.submit(&[helper, level(0)]), Ok(Outcome::Advanced { .. })));
  }

  #[test]
  fn status_reflects_level() {
    let mut e = engine();
    e.submit(&[level(0)]).unwrap();
    e.submit(&[level(1)]).unwrap();
    let s = e.status("g", "p");
    assert_eq!(s.custom_data.level, "2");
    assert_eq!(s.concept(POINTS).map(|p| p.score), Some(20.0));
    assert_eq!(s.concept(GOLD_COINS).map(|p| p.score), Some(2.0));
  }
}
