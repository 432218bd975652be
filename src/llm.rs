//! Feedback service: the port used by exercise evaluation and the HTTP proxy,
//! plus a minimal client for the Gemini generative-language API.
//!
//! We only call `models/{model}:generateContent` and request either plain text
//! or a JSON object. Calls are instrumented and log model name, latency and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key; it travels in a header, not the URL.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::error::AppError;

/// One generation request.
#[derive(Clone, Debug, Default)]
pub struct FeedbackRequest {
  pub system_instruction: Option<String>,
  pub user_content: String,
  /// Ask the model for `{ "feedback": string, "punteggio": number }`.
  pub structured: bool,
}

/// Generated text plus the score, when the model returned one as a field.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedbackReply {
  pub text: String,
  pub score: Option<i64>,
}

#[async_trait]
pub trait FeedbackService: Send + Sync {
  /// Single attempt; failures surface as `AppError::FeedbackService`.
  async fn generate(&self, req: &FeedbackRequest) -> Result<FeedbackReply, AppError>;
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  /// A client build failure is logged here and also yields None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into());
    let timeout = std::env::var("GEMINI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(30);

    let client = match reqwest::Client::builder().timeout(Duration::from_secs(timeout)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "feedback", error = %e, "Failed to build HTTP client; feedback service disabled");
        return None;
      }
    };

    Some(Self { client, api_key, base_url, model })
  }

  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, user_len = user.len()))]
  async fn generate_content(
    &self,
    system: Option<&str>,
    user: &str,
    temperature: f32,
    json: bool,
  ) -> Result<String, String> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let req = GenerateRequest {
      contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: user.into() }] }],
      system_instruction: system.map(|s| Content { role: None, parts: vec![Part { text: s.into() }] }),
      generation_config: GenerationConfig {
        temperature,
        response_mime_type: json.then(|| "application/json".to_string()),
      },
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "counsel-trainer-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      return Err(format!("Gemini HTTP {}: {}", status, msg));
    }

    let body: GenerateResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, elapsed = ?start.elapsed(), "Gemini usage");
    }
    let text: String = body
      .candidates
      .first()
      .and_then(|c| c.content.as_ref())
      .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
      .unwrap_or_default();
    let text = text.trim().to_string();
    if text.is_empty() {
      return Err("Gemini returned no text".into());
    }
    Ok(text)
  }
}

#[async_trait]
impl FeedbackService for Gemini {
  async fn generate(&self, req: &FeedbackRequest) -> Result<FeedbackReply, AppError> {
    let temperature = if req.structured { 0.3 } else { 0.7 };
    let raw = self
      .generate_content(req.system_instruction.as_deref(), &req.user_content, temperature, req.structured)
      .await
      .map_err(|e| {
        error!(target: "feedback", error = %e, "Generation failed");
        AppError::FeedbackService(e)
      })?;

    if !req.structured {
      return Ok(FeedbackReply { text: raw, score: None });
    }
    Ok(parse_structured(&raw).unwrap_or_else(|| {
      warn!(target: "feedback", raw_len = raw.len(), "Structured feedback not parseable; using raw text");
      FeedbackReply { text: raw, score: None }
    }))
  }
}

/// Decode `{ "feedback": ..., "punteggio": ... }`. The score may come back as a float.
pub fn parse_structured(raw: &str) -> Option<FeedbackReply> {
  #[derive(Deserialize)]
  struct Structured {
    feedback: String,
    #[serde(default)] punteggio: Option<f64>,
  }
  let s: Structured = serde_json::from_str(raw.trim()).ok()?;
  Some(FeedbackReply { text: s.feedback, score: s.punteggio.map(|p| p.round() as i64) })
}

// --- Gemini DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
  contents: Vec<Content>,
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  generation_config: GenerationConfig,
}
#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  #[serde(default)]
  parts: Vec<Part>,
}
#[derive(Serialize, Deserialize)]
struct Part { #[serde(default)] text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_mime_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<Content> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn structured_reply_with_integer_score() {
    let r = parse_structured(r#"{"feedback": "Buona riformulazione.", "punteggio": 8}"#).unwrap();
    assert_eq!(r.text, "Buona riformulazione.");
    assert_eq!(r.score, Some(8));
  }

  #[test]
  fn structured_reply_with_float_or_missing_score() {
    assert_eq!(parse_structured(r#"{"feedback": "ok", "punteggio": 6.6}"#).unwrap().score, Some(7));
    assert_eq!(parse_structured(r#"{"feedback": "ok"}"#).unwrap().score, None);
  }

  #[test]
  fn free_text_is_not_structured() {
    assert!(parse_structured("Ottimo.\n**Punteggio:** 9").is_none());
  }

  #[test]
  fn request_serializes_in_api_shape() {
    let req = GenerateRequest {
      contents: vec![Content { role: Some("user".into()), parts: vec![Part { text: "ciao".into() }] }],
      system_instruction: Some(Content { role: None, parts: vec![Part { text: "sys".into() }] }),
      generation_config: GenerationConfig { temperature: 0.5, response_mime_type: Some("application/json".into()) },
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["contents"][0]["parts"][0]["text"], "ciao");
    assert_eq!(v["systemInstruction"]["parts"][0]["text"], "sys");
    assert!(v["systemInstruction"].get("role").is_none());
    assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
  }

  #[test]
  fn response_text_parts_are_decoded() {
    let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Ciao "},{"text":"mondo"}]}}],"usageMetadata":{"totalTokenCount":12}}"#;
    let r: GenerateResponse = serde_json::from_str(body).unwrap();
    let parts = &r.candidates[0].content.as_ref().unwrap().parts;
    assert_eq!(parts.len(), 2);
    assert_eq!(r.usage_metadata.unwrap().total_token_count, Some(12));
  }

  #[test]
  fn api_error_message_is_extracted() {
    let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
    assert_eq!(extract_api_error(body).as_deref(), Some("API key not valid"));
    assert!(extract_api_error("<html>").is_none());
  }
}
