//! Domain models: scenario pools, per-user progress, rank tiers and badges.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::ranks::RankTable;

pub type UserId = String;
pub type ExerciseId = String;

/// Stable identifier of one scenario inside a pool. Older exercises use
/// numeric ids, newer ones use slugs; both travel as plain JSON values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScenarioId {
  Num(i64),
  Text(String),
}

impl fmt::Display for ScenarioId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ScenarioId::Num(n) => write!(f, "{}", n),
      ScenarioId::Text(s) => write!(f, "{}", s),
    }
  }
}

impl From<i64> for ScenarioId {
  fn from(n: i64) -> Self { ScenarioId::Num(n) }
}

impl From<&str> for ScenarioId {
  fn from(s: &str) -> Self { ScenarioId::Text(s.to_string()) }
}

/// How a finished scenario is scored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
  /// Free-text answer evaluated by the feedback service.
  AiFeedback,
  /// Likert questionnaire scored locally.
  Likert,
  /// Classification/diagram tasks whose points are computed by the client.
  ClientScored,
}

/// One Likert item. Reverse-keyed items contribute `6 - answer`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikertQuestion {
  pub text: String,
  #[serde(default)] pub reverse: bool,
}

/// One unit of exercise content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioItem {
  pub id: ScenarioId,
  pub title: String,
  #[serde(default)] pub body: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")] pub questions: Vec<LikertQuestion>,
}

/// Ordered, immutable list of items for one exercise. Ids are unique.
#[derive(Clone, Debug, Serialize)]
pub struct ScenarioPool {
  pub exercise: ExerciseId,
  pub title: String,
  pub kind: ExerciseKind,
  items: Vec<ScenarioItem>,
}

impl ScenarioPool {
  pub fn new(exercise: &str, title: &str, kind: ExerciseKind) -> Self {
    Self { exercise: exercise.to_string(), title: title.to_string(), kind, items: Vec::new() }
  }

  /// Builder-style insert used by the seed tables.
  pub fn with(mut self, item: ScenarioItem) -> Self {
    self.insert(item);
    self
  }

  /// Append an item; returns false (and keeps the pool untouched) on a duplicate id.
  pub fn insert(&mut self, item: ScenarioItem) -> bool {
    if self.items.iter().any(|i| i.id == item.id) {
      return false;
    }
    self.items.push(item);
    true
  }

  pub fn items(&self) -> &[ScenarioItem] { &self.items }
  pub fn len(&self) -> usize { self.items.len() }
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn get(&self, id: &ScenarioId) -> Option<&ScenarioItem> {
    self.items.iter().find(|i| &i.id == id)
  }
}

/// Per-user persisted record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
  pub points: u64,
  pub exercise_count: u64,
  /// Minutes.
  pub practice_time: u64,
  #[serde(default)] pub completed_exercises: BTreeMap<ExerciseId, Vec<ScenarioId>>,
  /// Cached rank name; readers derive the rank from `points` instead.
  #[serde(default)] pub rank: String,
}

impl UserProgress {
  /// Zero-valued record created at registration.
  pub fn new(initial_rank: &str) -> Self {
    Self { rank: initial_rank.to_string(), ..Self::default() }
  }

  pub fn completed(&self, exercise: &str) -> &[ScenarioId] {
    self.completed_exercises.get(exercise).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Cardinality of the completed set (duplicates in the stored list count once).
  pub fn completed_count(&self, exercise: &str) -> usize {
    self.completed(exercise).iter().collect::<BTreeSet<_>>().len()
  }
}

/// Static rank tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
  pub name: String,
  pub min_points: u64,
  #[serde(default)] pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
  Rank,
  Achievement,
  Mastery,
}

/// Predicate shapes a badge can be built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BadgeRule {
  /// `points >= min_points` of a rank tier.
  RankTier { min_points: u64 },
  /// Every scenario of the pool seen since the last cycle reset.
  ExerciseMastery { exercise: ExerciseId },
  /// At least `min` distinct scenarios of the exercise completed.
  CountThreshold { exercise: ExerciseId, min: usize },
  /// Conjunction, used for hub mastery.
  AllOf(Vec<BadgeRule>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Badge {
  pub id: String,
  pub name: String,
  pub description: String,
  pub category: BadgeCategory,
  pub rule: BadgeRule,
}

/// Pool size per exercise, as needed by mastery predicates.
pub type PoolSizes = HashMap<ExerciseId, usize>;

/// Everything static the progress model needs: pools, rank table, badges.
#[derive(Clone, Debug)]
pub struct Catalog {
  pub pools: BTreeMap<ExerciseId, ScenarioPool>,
  pub ranks: RankTable,
  pub badges: Vec<Badge>,
}

impl Catalog {
  pub fn pool(&self, exercise: &str) -> Result<&ScenarioPool, AppError> {
    self.pools.get(exercise).ok_or_else(|| AppError::UnknownExercise(exercise.to_string()))
  }

  pub fn pool_sizes(&self) -> PoolSizes {
    self.pools.iter().map(|(id, p)| (id.clone(), p.len())).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(id: impl Into<ScenarioId>) -> ScenarioItem {
    ScenarioItem { id: id.into(), title: "t".into(), body: String::new(), questions: vec![] }
  }

  #[test]
  fn pool_rejects_duplicate_ids() {
    let mut pool = ScenarioPool::new("x", "X", ExerciseKind::AiFeedback).with(item(1i64)).with(item("a"));
    assert!(!pool.insert(item(1i64)));
    assert!(pool.insert(item(2i64)));
    assert_eq!(pool.len(), 3);
  }

  #[test]
  fn scenario_id_json_is_untagged() {
    let ids: Vec<ScenarioId> = serde_json::from_str(r#"[3, "rp-01"]"#).unwrap();
    assert_eq!(ids, vec![ScenarioId::Num(3), ScenarioId::Text("rp-01".into())]);
    assert_eq!(serde_json::to_string(&ids).unwrap(), r#"[3,"rp-01"]"#);
  }

  #[test]
  fn completed_count_ignores_duplicates() {
    let mut p = UserProgress::new("Novizio");
    p.completed_exercises.insert("x".into(), vec![ScenarioId::Num(1), ScenarioId::Num(1), ScenarioId::Num(2)]);
    assert_eq!(p.completed_count("x"), 2);
    assert_eq!(p.completed_count("missing"), 0);
  }

  #[test]
  fn progress_serializes_camel_case() {
    let p = UserProgress::new("Novizio");
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["exerciseCount"], 0);
    assert_eq!(v["practiceTime"], 0);
    assert!(v["completedExercises"].as_object().unwrap().is_empty());
  }
}
