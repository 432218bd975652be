//! Score accumulation: raw outcomes -> point deltas -> transactional progress update.
//!
//! Three sources of points:
//!   - AI feedback (structured score field, else the `**Punteggio:** N` marker, else 0)
//!   - Likert questionnaires scored locally
//!   - client-scored tasks (classification, diagrams) reporting their own points

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::domain::{LikertQuestion, ScenarioId, UserProgress};
use crate::error::AppError;
use crate::ranks::{resolve_rank, RankTable};
use crate::store::ProgressStore;

pub const LIKERT_MIN: u8 = 1;
pub const LIKERT_MAX: u8 = 5;

static SCORE_MARKER: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\*\*Punteggio:\*\*\s*(-?\d+)").expect("score marker regex"));

/// Negative deltas from malformed upstream parsing count as zero.
pub fn clamp_points(raw: i64) -> u64 {
  raw.max(0) as u64
}

/// Pull `N` out of a `**Punteggio:** N` marker.
pub fn extract_points(feedback: &str) -> Option<i64> {
  SCORE_MARKER
    .captures(feedback)
    .and_then(|c| c.get(1))
    .and_then(|m| m.as_str().parse::<i64>().ok())
}

/// Structured score wins; otherwise fall back to the text marker; otherwise 0.
pub fn points_from_feedback(structured: Option<i64>, feedback: &str) -> u64 {
  match structured.or_else(|| extract_points(feedback)) {
    Some(n) => clamp_points(n),
    None => {
      warn!(target: "progress", feedback_len = feedback.len(), "No score in feedback; crediting 0 points");
      0
    }
  }
}

/// Sum of keyed answers. Every question needs exactly one answer in 1..=5.
pub fn score_likert(questions: &[LikertQuestion], answers: &[u8]) -> Result<u64, AppError> {
  if questions.len() != answers.len() {
    return Err(AppError::InvalidInput(format!(
      "expected {} answers, got {}", questions.len(), answers.len()
    )));
  }
  questions.iter().zip(answers).enumerate().try_fold(0u64, |acc, (idx, (q, &a))| {
    if !(LIKERT_MIN..=LIKERT_MAX).contains(&a) {
      return Err(AppError::InvalidInput(format!(
        "answer {} out of range: {} (expected {}..={})", idx + 1, a, LIKERT_MIN, LIKERT_MAX
      )));
    }
    let keyed = if q.reverse { LIKERT_MAX + 1 - a } else { a };
    Ok(acc + u64::from(keyed))
  })
}

/// Pure transaction body for one completion.
pub fn apply_completion(
  progress: &UserProgress,
  exercise: &str,
  scenario: &ScenarioId,
  points_earned: u64,
  ranks: &RankTable,
) -> UserProgress {
  let mut next = progress.clone();
  next.points = next.points.saturating_add(points_earned);
  next.exercise_count = next.exercise_count.saturating_add(1);
  let done = next.completed_exercises.entry(exercise.to_string()).or_default();
  if !done.contains(scenario) {
    done.push(scenario.clone());
  }
  next.rank = resolve_rank(next.points, ranks).name.clone();
  next
}

/// Pure transaction body for a cycle reset.
pub fn apply_cycle_reset(progress: &UserProgress, exercise: &str) -> UserProgress {
  let mut next = progress.clone();
  next.completed_exercises.insert(exercise.to_string(), Vec::new());
  next
}

/// Record one completion atomically. A single attempt: failures surface to the caller.
#[instrument(level = "info", skip(store, ranks), fields(%user, %exercise, %scenario))]
pub async fn record_completion(
  store: &dyn ProgressStore,
  user: &str,
  exercise: &str,
  scenario: &ScenarioId,
  points_earned: i64,
  ranks: &RankTable,
) -> Result<UserProgress, AppError> {
  let earned = clamp_points(points_earned);
  if points_earned < 0 {
    warn!(target: "progress", points_earned, "Negative score clamped to 0");
  }
  let tx = |p: &UserProgress| apply_completion(p, exercise, scenario, earned, ranks);
  let doc = store.run_transaction(user, &tx).await?;
  info!(target: "progress", earned, total = doc.points, count = doc.exercise_count, rank = %doc.rank, "Completion recorded");
  Ok(doc)
}
