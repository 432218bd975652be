//! Rank resolution: cumulative points -> named tier.

use crate::domain::Rank;
use crate::error::AppError;

/// Rank table, sorted ascending by `min_points`, first entry at 0 points.
/// Construction validates both, so resolution is total.
#[derive(Clone, Debug)]
pub struct RankTable(Vec<Rank>);

impl RankTable {
  pub fn new(ranks: Vec<Rank>) -> Result<Self, AppError> {
    match ranks.first() {
      None => return Err(AppError::InvalidInput("rank table is empty".into())),
      Some(r) if r.min_points != 0 => {
        return Err(AppError::InvalidInput(format!(
          "first rank '{}' must start at 0 points, got {}", r.name, r.min_points
        )))
      }
      Some(_) => {}
    }
    if let Some(w) = ranks.windows(2).find(|w| w[0].min_points >= w[1].min_points) {
      return Err(AppError::InvalidInput(format!(
        "rank '{}' ({}) is not above '{}' ({})", w[1].name, w[1].min_points, w[0].name, w[0].min_points
      )));
    }
    Ok(Self(ranks))
  }

  pub fn ranks(&self) -> &[Rank] { &self.0 }

  pub fn first(&self) -> &Rank { &self.0[0] }
}

impl Default for RankTable {
  /// Built-in table; its ordering is covered by the seed tests.
  fn default() -> Self { Self(crate::seeds::seed_ranks()) }
}

/// Highest tier whose threshold is `<= points`.
pub fn resolve_rank(points: u64, table: &RankTable) -> &Rank {
  table.0.iter().rev().find(|r| r.min_points <= points).unwrap_or_else(|| table.first())
}

/// Lowest tier strictly above `points`, or `None` at the top rank.
pub fn next_rank(points: u64, table: &RankTable) -> Option<&Rank> {
  table.0.iter().find(|r| r.min_points > points)
}
