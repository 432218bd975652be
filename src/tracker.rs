//! Completion tracker: picks the next unseen scenario and detects pool exhaustion.
//!
//! Selection is random among unseen items. Once every item of a pool has been
//! completed the caller must clear the completed set (a cycle reset) and the pick
//! is made from the whole pool.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, instrument};

use crate::domain::{ScenarioId, ScenarioItem, ScenarioPool};
use crate::error::AppError;

#[derive(Debug)]
pub struct Selection<'a> {
  pub item: &'a ScenarioItem,
  /// True when the pool was exhausted; the caller persists the cleared set.
  pub did_reset: bool,
}

/// True when every item of a non-empty pool appears in `completed`.
/// Ids outside the pool are ignored.
pub fn covers_pool(pool: &ScenarioPool, completed: &[ScenarioId]) -> bool {
  !pool.is_empty() && pool.items().iter().all(|i| completed.contains(&i.id))
}

#[instrument(level = "debug", skip(pool, completed, rng), fields(exercise = %pool.exercise, pool_len = pool.len(), completed_len = completed.len()))]
pub fn select_next<'a, R: Rng + ?Sized>(
  pool: &'a ScenarioPool,
  completed: &[ScenarioId],
  rng: &mut R,
) -> Result<Selection<'a>, AppError> {
  if pool.is_empty() {
    return Err(AppError::ContentExhaustedButEmpty { exercise: pool.exercise.clone() });
  }

  let seen: HashSet<&ScenarioId> = completed.iter().collect();
  let available: Vec<&ScenarioItem> = pool.items().iter().filter(|i| !seen.contains(&i.id)).collect();

  if let Some(&item) = available.choose(rng) {
    return Ok(Selection { item, did_reset: false });
  }

  debug!(target: "progress", exercise = %pool.exercise, "Pool exhausted; starting a new cycle");
  let item = pool
    .items()
    .choose(rng)
    .ok_or_else(|| AppError::ContentExhaustedButEmpty { exercise: pool.exercise.clone() })?;
  Ok(Selection { item, did_reset: true })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ExerciseKind;

  fn pool(n: i64) -> ScenarioPool {
    (1..=n).fold(ScenarioPool::new("vissi-explorer", "Vissi", ExerciseKind::AiFeedback), |p, i| {
      p.with(ScenarioItem { id: i.into(), title: format!("storia {}", i), body: String::new(), questions: vec![] })
    })
  }

  #[test]
  fn prefers_unseen_items() {
    let p = pool(5);
    let completed: Vec<ScenarioId> = vec![ScenarioId::Num(1), ScenarioId::Num(2), ScenarioId::Num(4)];
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
      let s = select_next(&p, &completed, &mut rng).unwrap();
      assert!(!s.did_reset);
      assert!(!completed.contains(&s.item.id));
    }
  }

  #[test]
  fn single_unseen_item_is_always_chosen() {
    let p = pool(3);
    let completed: Vec<ScenarioId> = vec![ScenarioId::Num(1), ScenarioId::Num(3)];
    let s = select_next(&p, &completed, &mut rand::thread_rng()).unwrap();
    assert_eq!(s.item.id, ScenarioId::Num(2));
  }

  #[test]
  fn exhaustion_resets_and_draws_from_full_pool() {
    let p = pool(4);
    let completed: Vec<ScenarioId> = (1..=4i64).map(ScenarioId::from).collect();
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
      let s = select_next(&p, &completed, &mut rng).unwrap();
      assert!(s.did_reset);
      assert!(p.get(&s.item.id).is_some());
    }
  }

  #[test]
  fn stale_ids_outside_the_pool_do_not_count() {
    let p = pool(2);
    let completed: Vec<ScenarioId> = vec![ScenarioId::Num(1), ScenarioId::Num(99)];
    let s = select_next(&p, &completed, &mut rand::thread_rng()).unwrap();
    assert!(!s.did_reset);
    assert_eq!(s.item.id, ScenarioId::Num(2));
  }

  #[test]
  fn coverage_needs_every_pool_item() {
    let p = pool(3);
    let all: Vec<ScenarioId> = (1..=3i64).map(ScenarioId::from).collect();
    assert!(covers_pool(&p, &all));
    assert!(!covers_pool(&p, &[ScenarioId::Num(3), ScenarioId::Num(99)]));
    assert!(!covers_pool(&pool(0), &[]));
  }

  #[test]
  fn empty_pool_is_reported() {
    let p = pool(0);
    let err = select_next(&p, &[], &mut rand::thread_rng()).unwrap_err();
    assert!(matches!(err, AppError::ContentExhaustedButEmpty { .. }));
  }
}
