//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ExerciseKind, ScenarioId, ScenarioItem, UserProgress};

/// Body of the feedback proxy: plain prompt or chat-style pair.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GenerateIn {
    Chat {
        #[serde(rename = "systemInstruction")]
        system_instruction: String,
        #[serde(rename = "userContent")]
        user_content: String,
    },
    Prompt {
        prompt: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateOut {
    pub feedback: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterIn {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOut {
    pub user_id: String,
    pub progress: UserProgress,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseOut {
    pub id: String,
    pub title: String,
    pub kind: ExerciseKind,
    pub pool_size: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextScenarioOut {
    pub exercise: String,
    pub scenario: ScenarioItem,
    pub did_reset: bool,
    /// True when the pool is empty and `scenario` is the "no content" stand-in.
    pub placeholder: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
    pub scenario_id: ScenarioId,
    pub answer: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOut {
    pub feedback: String,
    pub points_earned: u64,
    pub progress: UserProgress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikertIn {
    pub scenario_id: ScenarioId,
    pub answers: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteIn {
    pub scenario_id: ScenarioId,
    #[serde(default)]
    pub points_earned: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOut {
    pub points_earned: u64,
    pub progress: UserProgress,
}

#[derive(Debug, Deserialize)]
pub struct PracticeTimeIn {
    pub minutes: u64,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub feedback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_in_accepts_both_shapes() {
        let p: GenerateIn = serde_json::from_str(r#"{"prompt":"ciao"}"#).unwrap();
        assert!(matches!(p, GenerateIn::Prompt { ref prompt } if prompt == "ciao"));
        let c: GenerateIn =
            serde_json::from_str(r#"{"systemInstruction":"sys","userContent":"usr"}"#).unwrap();
        assert!(matches!(c, GenerateIn::Chat { .. }));
        assert!(serde_json::from_str::<GenerateIn>(r#"{"text":"x"}"#).is_err());
    }

    #[test]
    fn complete_in_defaults_points() {
        let c: CompleteIn = serde_json::from_str(r#"{"scenarioId":"m-01"}"#).unwrap();
        assert_eq!(c.points_earned, 0);
        assert_eq!(c.scenario_id, ScenarioId::Text("m-01".into()));
    }
}
