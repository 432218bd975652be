//! Badge evaluation. Badges are derived on every read, never stored as earned.
//!
//! Mastery is measured against the *current* completed set, so a cycle reset
//! can make a mastery badge disappear until the pool is finished again.

use crate::domain::{Badge, BadgeRule, PoolSizes, UserProgress};

impl BadgeRule {
  pub fn check(&self, progress: &UserProgress, pools: &PoolSizes) -> bool {
    match self {
      BadgeRule::RankTier { min_points } => progress.points >= *min_points,
      BadgeRule::ExerciseMastery { exercise } => match pools.get(exercise) {
        // An empty or unknown pool cannot be mastered.
        Some(&size) if size > 0 => progress.completed_count(exercise) >= size,
        _ => false,
      },
      BadgeRule::CountThreshold { exercise, min } => progress.completed_count(exercise) >= *min,
      BadgeRule::AllOf(rules) => !rules.is_empty() && rules.iter().all(|r| r.check(progress, pools)),
    }
  }
}

/// All badges whose predicate holds for this snapshot, in catalogue order.
pub fn evaluate<'a>(progress: &UserProgress, badges: &'a [Badge], pools: &PoolSizes) -> Vec<&'a Badge> {
  badges.iter().filter(|b| b.rule.check(progress, pools)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{BadgeCategory, ScenarioId};

  fn badge(id: &str, category: BadgeCategory, rule: BadgeRule) -> Badge {
    Badge { id: id.into(), name: id.into(), description: String::new(), category, rule }
  }

  fn mastery(exercise: &str) -> BadgeRule {
    BadgeRule::ExerciseMastery { exercise: exercise.into() }
  }

  fn pools() -> PoolSizes {
    PoolSizes::from([("vissi-explorer".to_string(), 5), ("role-play".to_string(), 2), ("vuoto".to_string(), 0)])
  }

  fn with_completed(exercise: &str, ids: &[i64]) -> UserProgress {
    let mut p = UserProgress::default();
    p.completed_exercises.insert(exercise.into(), ids.iter().copied().map(ScenarioId::from).collect());
    p
  }

  #[test]
  fn mastery_requires_every_item() {
    let rule = mastery("vissi-explorer");
    let full = with_completed("vissi-explorer", &[1, 2, 3, 4, 5]);
    assert!(rule.check(&full, &pools()));
    let missing_one = with_completed("vissi-explorer", &[1, 2, 3, 4]);
    assert!(!rule.check(&missing_one, &pools()));
  }

  #[test]
  fn mastery_flickers_after_cycle_reset() {
    let rule = mastery("vissi-explorer");
    let p = with_completed("vissi-explorer", &[]);
    assert!(!rule.check(&p, &pools()));
  }

  #[test]
  fn empty_or_unknown_pools_are_never_mastered() {
    assert!(!mastery("vuoto").check(&UserProgress::default(), &pools()));
    assert!(!mastery("sconosciuto").check(&UserProgress::default(), &pools()));
  }

  #[test]
  fn count_threshold() {
    let rule = BadgeRule::CountThreshold { exercise: "diario".into(), min: 5 };
    assert!(!rule.check(&with_completed("diario", &[1, 2, 3, 4]), &pools()));
    assert!(rule.check(&with_completed("diario", &[1, 2, 3, 4, 5]), &pools()));
  }

  #[test]
  fn rank_tier() {
    let rule = BadgeRule::RankTier { min_points: 50 };
    let mut p = UserProgress::default();
    p.points = 49;
    assert!(!rule.check(&p, &pools()));
    p.points = 50;
    assert!(rule.check(&p, &pools()));
  }

  #[test]
  fn hub_needs_all_parts() {
    let hub = BadgeRule::AllOf(vec![mastery("vissi-explorer"), mastery("role-play")]);
    let mut p = with_completed("vissi-explorer", &[1, 2, 3, 4, 5]);
    assert!(!hub.check(&p, &pools()));
    p.completed_exercises.insert("role-play".into(), vec![ScenarioId::Num(1), ScenarioId::Num(2)]);
    assert!(hub.check(&p, &pools()));
    assert!(!BadgeRule::AllOf(vec![]).check(&p, &pools()));
  }

  #[test]
  fn evaluate_keeps_catalogue_order() {
    let badges = vec![
      badge("a", BadgeCategory::Rank, BadgeRule::RankTier { min_points: 0 }),
      badge("b", BadgeCategory::Mastery, mastery("vissi-explorer")),
      badge("c", BadgeCategory::Achievement, BadgeRule::CountThreshold { exercise: "role-play".into(), min: 1 }),
    ];
    let p = with_completed("role-play", &[1]);
    let ids: Vec<&str> = evaluate(&p, &badges, &pools()).iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
  }
}
