//! Use cases behind the HTTP handlers.
//!
//! This includes:
//!   - Registering a user (zero-valued progress document)
//!   - Serving the next scenario of an exercise, persisting cycle resets
//!   - Scoring submissions (AI feedback, Likert, client-scored) and recording them
//!   - Practice time, progress snapshots and the raw feedback proxy

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ExerciseKind, ScenarioId, ScenarioItem, ScenarioPool, UserProgress};
use crate::error::{AppError, PersistenceError};
use crate::llm::FeedbackRequest;
use crate::progress::{summarize, ProgressSummary};
use crate::protocol::GenerateIn;
use crate::scoring::{apply_cycle_reset, points_from_feedback, record_completion, score_likert};
use crate::seeds::placeholder_item;
use crate::state::AppState;
use crate::store::ProgressPatch;
use crate::tracker::{covers_pool, select_next};
use crate::util::{fill_template, trunc_for_log};

const MAX_USER_ID_LEN: usize = 128;
const MAX_SESSION_MINUTES: u64 = 24 * 60;
const MAX_RESET_ATTEMPTS: u32 = 3;

#[derive(Debug)]
pub struct NextScenario {
  pub item: ScenarioItem,
  pub did_reset: bool,
  pub placeholder: bool,
}

#[derive(Debug)]
pub struct Evaluation {
  pub feedback: String,
  pub points_earned: u64,
  pub progress: UserProgress,
}

#[derive(Debug)]
pub struct Completion {
  pub points_earned: u64,
  pub progress: UserProgress,
}

#[instrument(level = "info", skip(state))]
pub async fn register_user(state: &AppState, requested: Option<String>) -> Result<(String, UserProgress), AppError> {
  let user = match requested.map(|s| s.trim().to_string()) {
    Some(id) if id.is_empty() || id.len() > MAX_USER_ID_LEN => {
      return Err(AppError::InvalidInput(format!("user id must be 1..={} bytes", MAX_USER_ID_LEN)));
    }
    Some(id) => id,
    None => Uuid::new_v4().to_string(),
  };
  let doc = UserProgress::new(&state.ranks().first().name);
  state.store.create(&user, doc.clone()).await?;
  info!(target: "progress", %user, "User registered");
  Ok((user, doc))
}

async fn load_progress(state: &AppState, user: &str) -> Result<UserProgress, AppError> {
  state
    .store
    .get(user)
    .await?
    .ok_or_else(|| AppError::Persistence(PersistenceError::Missing { user: user.to_string() }))
}

fn scenario_of<'a>(pool: &'a ScenarioPool, scenario: &ScenarioId) -> Result<&'a ScenarioItem, AppError> {
  pool.get(scenario).ok_or_else(|| AppError::UnknownScenario {
    exercise: pool.exercise.clone(),
    scenario: scenario.clone(),
  })
}

fn require_kind(pool: &ScenarioPool, kind: ExerciseKind) -> Result<(), AppError> {
  if pool.kind != kind {
    return Err(AppError::InvalidInput(format!(
      "exercise '{}' is scored as {:?}, not {:?}", pool.exercise, pool.kind, kind
    )));
  }
  Ok(())
}

/// Pick the next scenario. An exhausted pool is reset in storage before the pick
/// is returned; an empty pool yields the placeholder item.
///
/// The reset transaction re-checks exhaustion on the committed document: if a
/// concurrent session completed something since our read, nothing is cleared and
/// the pick is redone from that document.
#[instrument(level = "info", skip(state), fields(%user, %exercise))]
pub async fn next_scenario(state: &AppState, user: &str, exercise: &str) -> Result<NextScenario, AppError> {
  let pool = state.catalog.pool(exercise)?;
  let mut progress = load_progress(state, user).await?;

  for attempt in 1..=MAX_RESET_ATTEMPTS {
    let selection = {
      let mut rng = rand::thread_rng();
      select_next(pool, progress.completed(exercise), &mut rng).map(|s| (s.item.clone(), s.did_reset))
    };

    let (item, did_reset) = match selection {
      Ok(pick) => pick,
      Err(AppError::ContentExhaustedButEmpty { .. }) => {
        warn!(target: "progress", %exercise, "Empty pool; serving placeholder");
        return Ok(NextScenario { item: placeholder_item(), did_reset: false, placeholder: true });
      }
      Err(e) => return Err(e),
    };
    if !did_reset {
      return Ok(NextScenario { item, did_reset, placeholder: false });
    }

    let cleared = AtomicBool::new(false);
    let tx = |p: &UserProgress| {
      let exhausted = covers_pool(pool, p.completed(exercise));
      cleared.store(exhausted, Ordering::SeqCst);
      if exhausted { apply_cycle_reset(p, exercise) } else { p.clone() }
    };
    let committed = state.store.run_transaction(user, &tx).await?;
    if cleared.load(Ordering::SeqCst) {
      info!(target: "progress", %user, %exercise, "Cycle reset persisted");
      return Ok(NextScenario { item, did_reset, placeholder: false });
    }
    debug!(target: "progress", %user, %exercise, attempt, "Pool no longer exhausted; reselecting");
    progress = committed;
  }

  Err(AppError::Persistence(PersistenceError::Conflict { attempts: MAX_RESET_ATTEMPTS }))
}

/// Free-text answer -> feedback service -> points -> recorded completion.
/// A feedback failure records nothing.
#[instrument(level = "info", skip(state, answer), fields(%user, %exercise, %scenario, answer_len = answer.len()))]
pub async fn submit_answer(
  state: &AppState,
  user: &str,
  exercise: &str,
  scenario: &ScenarioId,
  answer: &str,
) -> Result<Evaluation, AppError> {
  let pool = state.catalog.pool(exercise)?;
  require_kind(pool, ExerciseKind::AiFeedback)?;
  let item = scenario_of(pool, scenario)?;
  let answer = answer.trim();
  if answer.is_empty() {
    return Err(AppError::InvalidInput("answer is empty".into()));
  }
  load_progress(state, user).await?;
  let feedback = state.feedback.as_ref().ok_or(AppError::FeedbackUnavailable)?;

  let scenario_text = format!("{}\n{}", item.title, item.body);
  let user_content = fill_template(
    &state.prompts.evaluation_user_template,
    &[("exercise", pool.title.as_str()), ("scenario", scenario_text.as_str()), ("answer", answer)],
  );
  debug!(target: "feedback", prompt = %trunc_for_log(&user_content, 120), "Evaluation prompt");

  let reply = feedback
    .generate(&FeedbackRequest {
      system_instruction: Some(state.prompts.evaluation_system.clone()),
      user_content,
      structured: true,
    })
    .await?;

  let points_earned = points_from_feedback(reply.score, &reply.text);
  let progress = record_completion(
    state.store.as_ref(),
    user,
    exercise,
    scenario,
    i64::try_from(points_earned).unwrap_or(i64::MAX),
    state.ranks(),
  )
  .await?;
  Ok(Evaluation { feedback: reply.text, points_earned, progress })
}

#[instrument(level = "info", skip(state, answers), fields(%user, %exercise, %scenario, answers = answers.len()))]
pub async fn submit_likert(
  state: &AppState,
  user: &str,
  exercise: &str,
  scenario: &ScenarioId,
  answers: &[u8],
) -> Result<Completion, AppError> {
  let pool = state.catalog.pool(exercise)?;
  require_kind(pool, ExerciseKind::Likert)?;
  let item = scenario_of(pool, scenario)?;
  let points_earned = score_likert(&item.questions, answers)?;
  let progress =
    record_completion(state.store.as_ref(), user, exercise, scenario, points_earned as i64, state.ranks()).await?;
  Ok(Completion { points_earned, progress })
}

/// Classification and diagram tasks compute their own points client-side.
#[instrument(level = "info", skip(state), fields(%user, %exercise, %scenario))]
pub async fn complete_scenario(
  state: &AppState,
  user: &str,
  exercise: &str,
  scenario: &ScenarioId,
  points_earned: i64,
) -> Result<Completion, AppError> {
  let pool = state.catalog.pool(exercise)?;
  require_kind(pool, ExerciseKind::ClientScored)?;
  scenario_of(pool, scenario)?;
  let progress =
    record_completion(state.store.as_ref(), user, exercise, scenario, points_earned, state.ranks()).await?;
  Ok(Completion { points_earned: points_earned.max(0) as u64, progress })
}

#[instrument(level = "info", skip(state), fields(%user))]
pub async fn record_practice_time(state: &AppState, user: &str, minutes: u64) -> Result<UserProgress, AppError> {
  if minutes == 0 || minutes > MAX_SESSION_MINUTES {
    return Err(AppError::InvalidInput(format!("minutes must be 1..={}", MAX_SESSION_MINUTES)));
  }
  Ok(state.store.update(user, ProgressPatch { add_practice_time: minutes }).await?)
}

#[instrument(level = "info", skip(state), fields(%user))]
pub async fn progress_snapshot(state: &AppState, user: &str) -> Result<ProgressSummary, AppError> {
  let progress = load_progress(state, user).await?;
  Ok(summarize(&progress, &state.catalog))
}

/// Raw pass-through used by the exercise UIs that build their own prompts.
#[instrument(level = "info", skip(state, input))]
pub async fn proxy_generate(state: &AppState, input: GenerateIn) -> Result<String, AppError> {
  let req = match input {
    GenerateIn::Prompt { prompt } => FeedbackRequest {
      system_instruction: state.prompts.proxy_system.clone(),
      user_content: prompt,
      structured: false,
    },
    GenerateIn::Chat { system_instruction, user_content } => FeedbackRequest {
      system_instruction: Some(system_instruction).filter(|s| !s.trim().is_empty()),
      user_content,
      structured: false,
    },
  };
  if req.user_content.trim().is_empty() {
    return Err(AppError::InvalidInput("prompt is empty".into()));
  }
  let feedback = state.feedback.as_ref().ok_or(AppError::FeedbackUnavailable)?;
  Ok(feedback.generate(&req).await?.text)
}
