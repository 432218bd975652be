//! Progress aggregation: completion percentages and the per-user display snapshot.

use serde::Serialize;

use crate::badges::evaluate;
use crate::domain::{BadgeCategory, Catalog, UserProgress};
use crate::ranks::{next_rank, resolve_rank};

/// Share of a pool completed, in `[0, 100]`. Over-counting is clamped.
pub fn percent_complete(completed_count: i64, pool_size: i64) -> f64 {
  if pool_size <= 0 {
    return 0.0;
  }
  let done = completed_count.clamp(0, pool_size);
  100.0 * done as f64 / pool_size as f64
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSummary {
  pub exercise: String,
  pub title: String,
  pub completed: usize,
  pub pool_size: usize,
  pub percent: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankSummary {
  pub name: String,
  pub message: String,
  pub min_points: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRankSummary {
  pub name: String,
  pub min_points: u64,
  pub points_needed: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeSummary {
  pub id: String,
  pub name: String,
  pub description: String,
  pub category: BadgeCategory,
  pub earned: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
  pub points: u64,
  pub exercise_count: u64,
  pub practice_time: u64,
  pub rank: RankSummary,
  pub next_rank: Option<NextRankSummary>,
  pub exercises: Vec<ExerciseSummary>,
  pub badges: Vec<BadgeSummary>,
  pub earned_badges: usize,
}

/// Derive everything the dashboard shows. The rank comes from `points`,
/// never from the cached `rank` field.
pub fn summarize(progress: &UserProgress, catalog: &Catalog) -> ProgressSummary {
  let current = resolve_rank(progress.points, &catalog.ranks);
  let next = next_rank(progress.points, &catalog.ranks).map(|r| NextRankSummary {
    name: r.name.clone(),
    min_points: r.min_points,
    points_needed: r.min_points - progress.points,
  });

  let exercises = catalog
    .pools
    .values()
    .map(|pool| {
      let completed = progress.completed_count(&pool.exercise);
      ExerciseSummary {
        exercise: pool.exercise.clone(),
        title: pool.title.clone(),
        completed,
        pool_size: pool.len(),
        percent: percent_complete(completed as i64, pool.len() as i64),
      }
    })
    .collect();

  let pools = catalog.pool_sizes();
  let earned: Vec<&str> = evaluate(progress, &catalog.badges, &pools).iter().map(|b| b.id.as_str()).collect();
  let badges: Vec<BadgeSummary> = catalog
    .badges
    .iter()
    .map(|b| BadgeSummary {
      id: b.id.clone(),
      name: b.name.clone(),
      description: b.description.clone(),
      category: b.category,
      earned: earned.contains(&b.id.as_str()),
    })
    .collect();

  ProgressSummary {
    points: progress.points,
    exercise_count: progress.exercise_count,
    practice_time: progress.practice_time,
    rank: RankSummary { name: current.name.clone(), message: current.message.clone(), min_points: current.min_points },
    next_rank: next,
    exercises,
    earned_badges: earned.len(),
    badges,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::builtin_catalog;
  use proptest::prelude::*;

  #[test]
  fn percent_boundaries() {
    assert_eq!(percent_complete(0, 10), 0.0);
    assert_eq!(percent_complete(10, 10), 100.0);
    assert_eq!(percent_complete(15, 10), 100.0);
    assert_eq!(percent_complete(5, 0), 0.0);
    assert_eq!(percent_complete(5, -3), 0.0);
    assert_eq!(percent_complete(-2, 10), 0.0);
    assert_eq!(percent_complete(1, 4), 25.0);
  }

  proptest! {
    #[test]
    fn percent_stays_in_range(done in -50i64..500, size in -5i64..200) {
      let p = percent_complete(done, size);
      prop_assert!((0.0..=100.0).contains(&p));
    }
  }

  #[test]
  fn summary_derives_rank_from_points_not_cache() {
    let catalog = builtin_catalog();
    let mut p = UserProgress::new("Novizio");
    p.points = 10_000;
    let s = summarize(&p, &catalog);
    let top = catalog.ranks.ranks().last().unwrap();
    assert_eq!(s.rank.name, top.name);
    assert!(s.next_rank.is_none());
  }

  #[test]
  fn summary_reports_points_needed() {
    let catalog = builtin_catalog();
    let mut p = UserProgress::default();
    p.points = 20;
    let s = summarize(&p, &catalog);
    let next = s.next_rank.unwrap();
    assert_eq!(next.points_needed, next.min_points - 20);
  }

  #[test]
  fn summary_lists_every_exercise_and_badge() {
    let catalog = builtin_catalog();
    let s = summarize(&UserProgress::default(), &catalog);
    assert_eq!(s.exercises.len(), catalog.pools.len());
    assert_eq!(s.badges.len(), catalog.badges.len());
    assert!(s.exercises.iter().all(|e| e.percent == 0.0));
    // Nothing but rank badges can be earned at zero points.
    assert!(s.badges.iter().filter(|b| b.earned).all(|b| b.category == BadgeCategory::Rank));
  }
}
