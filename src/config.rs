//! Loading app configuration (prompts, extra scenarios, rank table) from TOML.
//!
//! See `AppConfig` and `Prompts` for expected schema.

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{ExerciseId, LikertQuestion, Rank, ScenarioId, ScenarioItem, ScenarioPool};
use crate::ranks::RankTable;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub scenarios: Vec<ScenarioCfg>,
  /// Replaces the built-in table when non-empty and valid.
  #[serde(default)]
  pub ranks: Vec<Rank>,
}

/// Extra scenario appended to a built-in pool.
#[derive(Clone, Debug, Deserialize)]
pub struct ScenarioCfg {
  pub exercise: ExerciseId,
  pub id: ScenarioId,
  pub title: String,
  #[serde(default)] pub body: String,
  #[serde(default)] pub questions: Vec<LikertQuestion>,
}

/// Prompts used by the feedback client. Defaults target Italian counseling practice.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// System instruction for `{ prompt }` proxy calls; none means the prompt goes alone.
  pub proxy_system: Option<String>,
  pub evaluation_system: String,
  pub evaluation_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      proxy_system: None,
      evaluation_system: "Sei un supervisore esperto di counseling. Valuti con gentilezza e precisione le risposte degli studenti, evidenziando punti di forza e aree di miglioramento. Rispondi in italiano.".into(),
      evaluation_user_template: "Esercizio: {exercise}\nScenario: {scenario}\n\nRisposta dello studente:\n{answer}\n\nRestituisci un JSON con i campi \"feedback\" (testo, massimo 150 parole) e \"punteggio\" (intero da 0 a 10). Se non puoi produrre JSON, termina il feedback con la riga \"**Punteggio:** N\".".into(),
    }
  }
}

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "counsel_backend", %path, scenarios = cfg.scenarios.len(), ranks = cfg.ranks.len(), "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "counsel_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "counsel_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

impl AppConfig {
  /// Configured rank table, or `None` when absent or invalid (logged).
  pub fn rank_table(&self) -> Option<RankTable> {
    if self.ranks.is_empty() {
      return None;
    }
    match RankTable::new(self.ranks.clone()) {
      Ok(t) => Some(t),
      Err(e) => {
        error!(target: "counsel_backend", error = %e, "Ignoring configured rank table");
        None
      }
    }
  }

  /// Append configured scenarios to their pools. Unknown exercises and duplicate ids are skipped.
  pub fn apply_scenarios(&self, pools: &mut [ScenarioPool]) {
    for sc in &self.scenarios {
      let Some(pool) = pools.iter_mut().find(|p| p.exercise == sc.exercise) else {
        warn!(target: "counsel_backend", exercise = %sc.exercise, id = %sc.id, "Skipping scenario for unknown exercise");
        continue;
      };
      let item = ScenarioItem {
        id: sc.id.clone(),
        title: sc.title.clone(),
        body: sc.body.clone(),
        questions: sc.questions.clone(),
      };
      if !pool.insert(item) {
        warn!(target: "counsel_backend", exercise = %sc.exercise, id = %sc.id, "Skipping duplicate scenario id");
      }
    }
  }
}
