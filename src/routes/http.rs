//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures become `AppError` responses.

use std::sync::Arc;
use axum::{extract::{FromRequest, Path, State}, http::StatusCode, Json};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::logic::*;
use crate::progress::ProgressSummary;
use crate::protocol::*;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, AppError>;

/// `Json` body whose rejections go through `AppError`, so clients always get `{ "error" }`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> Json<HealthOut> {
  Json(HealthOut { ok: true, feedback: state.feedback.is_some() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_exercises(State(state): State<Arc<AppState>>) -> Json<Vec<ExerciseOut>> {
  let out = state
    .catalog
    .pools
    .values()
    .map(|p| ExerciseOut { id: p.exercise.clone(), title: p.title.clone(), kind: p.kind, pool_size: p.len() })
    .collect();
  Json(out)
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  body: Option<ApiJson<RegisterIn>>,
) -> Result<(StatusCode, Json<RegisterOut>), AppError> {
  let requested = body.and_then(|ApiJson(b)| b.user_id);
  let (user_id, progress) = register_user(&state, requested).await?;
  Ok((StatusCode::CREATED, Json(RegisterOut { user_id, progress })))
}

#[instrument(level = "info", skip(state))]
pub async fn http_register_as(
  State(state): State<Arc<AppState>>,
  Path(user): Path<String>,
) -> Result<(StatusCode, Json<RegisterOut>), AppError> {
  let (user_id, progress) = register_user(&state, Some(user)).await?;
  Ok((StatusCode::CREATED, Json(RegisterOut { user_id, progress })))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Path(user): Path<String>,
) -> ApiResult<ProgressSummary> {
  Ok(Json(progress_snapshot(&state, &user).await?))
}

#[instrument(level = "info", skip(state, body), fields(minutes = body.minutes))]
pub async fn http_post_practice_time(
  State(state): State<Arc<AppState>>,
  Path(user): Path<String>,
  ApiJson(body): ApiJson<PracticeTimeIn>,
) -> ApiResult<ProgressSummary> {
  record_practice_time(&state, &user, body.minutes).await?;
  Ok(Json(progress_snapshot(&state, &user).await?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_next(
  State(state): State<Arc<AppState>>,
  Path((user, exercise)): Path<(String, String)>,
) -> ApiResult<NextScenarioOut> {
  let next = next_scenario(&state, &user, &exercise).await?;
  info!(target: "progress", %user, %exercise, scenario = %next.item.id, did_reset = next.did_reset, "HTTP scenario served");
  Ok(Json(NextScenarioOut { exercise, scenario: next.item, did_reset: next.did_reset, placeholder: next.placeholder }))
}

#[instrument(level = "info", skip(state, body), fields(scenario = %body.scenario_id, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path((user, exercise)): Path<(String, String)>,
  ApiJson(body): ApiJson<AnswerIn>,
) -> ApiResult<AnswerOut> {
  let eval = submit_answer(&state, &user, &exercise, &body.scenario_id, &body.answer).await?;
  info!(target: "progress", %user, %exercise, points = eval.points_earned, total = eval.progress.points, "HTTP answer evaluated");
  Ok(Json(AnswerOut { feedback: eval.feedback, points_earned: eval.points_earned, progress: eval.progress }))
}

#[instrument(level = "info", skip(state, body), fields(scenario = %body.scenario_id, answers = body.answers.len()))]
pub async fn http_post_likert(
  State(state): State<Arc<AppState>>,
  Path((user, exercise)): Path<(String, String)>,
  ApiJson(body): ApiJson<LikertIn>,
) -> ApiResult<CompletionOut> {
  let done = submit_likert(&state, &user, &exercise, &body.scenario_id, &body.answers).await?;
  Ok(Json(CompletionOut { points_earned: done.points_earned, progress: done.progress }))
}

#[instrument(level = "info", skip(state, body), fields(scenario = %body.scenario_id, points = body.points_earned))]
pub async fn http_post_complete(
  State(state): State<Arc<AppState>>,
  Path((user, exercise)): Path<(String, String)>,
  ApiJson(body): ApiJson<CompleteIn>,
) -> ApiResult<CompletionOut> {
  let done = complete_scenario(&state, &user, &exercise, &body.scenario_id, body.points_earned).await?;
  Ok(Json(CompletionOut { points_earned: done.points_earned, progress: done.progress }))
}

/// Raw pass-through to the feedback model for UIs that build their own prompts.
#[instrument(level = "info", skip(state, body))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  ApiJson(body): ApiJson<GenerateIn>,
) -> ApiResult<GenerateOut> {
  let feedback = proxy_generate(&state, body).await?;
  Ok(Json(GenerateOut { feedback }))
}
