//! Built-in content: exercise pools, the rank table and the badge catalogue.
//! The app is usable with no config file at all.

use std::collections::BTreeMap;

use crate::domain::{
  Badge, BadgeCategory, BadgeRule, Catalog, ExerciseKind, LikertQuestion, Rank, ScenarioItem, ScenarioPool,
};
use crate::ranks::RankTable;

pub const VISSI_EXPLORER: &str = "vissi-explorer";
pub const ROLE_PLAY: &str = "role-play-ascolto";
pub const DIARIO: &str = "diario-riflessivo";
pub const AUTOCONSAPEVOLEZZA: &str = "quiz-autoconsapevolezza";
pub const CLASSIFICA_EMOZIONI: &str = "classifica-emozioni";
pub const MAPPA_RELAZIONI: &str = "mappa-relazioni";

fn prompt(id: impl Into<crate::domain::ScenarioId>, title: &str, body: &str) -> ScenarioItem {
  ScenarioItem { id: id.into(), title: title.into(), body: body.into(), questions: vec![] }
}

fn likert(id: &str, title: &str, questions: &[(&str, bool)]) -> ScenarioItem {
  ScenarioItem {
    id: id.into(),
    title: title.into(),
    body: "Indica quanto ti riconosci in ogni affermazione (1 = per nulla, 5 = del tutto).".into(),
    questions: questions.iter().map(|(t, r)| LikertQuestion { text: (*t).into(), reverse: *r }).collect(),
  }
}

pub fn seed_pools() -> Vec<ScenarioPool> {
  vec![
    ScenarioPool::new(VISSI_EXPLORER, "Esplorare i vissuti", ExerciseKind::AiFeedback)
      .with(prompt(1i64, "Il trasloco", "Marta racconta di essersi trasferita per lavoro e di non riuscire a dormire. Quali emozioni riconosci nel suo racconto?"))
      .with(prompt(2i64, "L'esame mancato", "Luca ha rinunciato all'ultimo momento a un esame importante. Descrivi il vissuto che potrebbe esserci dietro la sua scelta."))
      .with(prompt(3i64, "La promozione", "Giulia è stata promossa ma si sente in colpa verso i colleghi. Come restituiresti questo vissuto?"))
      .with(prompt(4i64, "Il lutto", "Anna parla della perdita del padre con tono distaccato. Quali ipotesi fai sul suo modo di vivere il dolore?"))
      .with(prompt(5i64, "Il ritorno a casa", "Paolo è tornato a vivere con i genitori dopo dieci anni. Esplora le emozioni contrastanti che potrebbe provare.")),
    ScenarioPool::new(ROLE_PLAY, "Role-play: ascolto attivo", ExerciseKind::AiFeedback)
      .with(prompt("rp-01", "Primo colloquio", "Cliente: \"Non so nemmeno perché sono qui, me l'ha consigliato mia moglie.\" Rispondi come counselor."))
      .with(prompt("rp-02", "Silenzio", "Il cliente resta in silenzio per un lungo momento dopo una tua domanda. Come intervieni?"))
      .with(prompt("rp-03", "Rabbia", "Cliente: \"Tanto nessuno mi ascolta, neanche lei!\" Rispondi riconoscendo l'emozione."))
      .with(prompt("rp-04", "Richiesta di consiglio", "Cliente: \"Lei cosa farebbe al mio posto?\" Rispondi restando nel ruolo.")),
    ScenarioPool::new(DIARIO, "Diario riflessivo", ExerciseKind::AiFeedback)
      .with(prompt("d-01", "Una giornata difficile", "Racconta un momento recente in cui ti sei sentito in difficoltà nell'ascoltare qualcuno."))
      .with(prompt("d-02", "Confini", "Descrivi una situazione in cui hai faticato a mantenere i tuoi confini."))
      .with(prompt("d-03", "Pregiudizi", "Quale pregiudizio hai notato in te questa settimana?"))
      .with(prompt("d-04", "Gratitudine", "Scrivi di una relazione di aiuto che ti ha fatto sentire grato."))
      .with(prompt("d-05", "Il corpo", "Quali segnali del corpo hai notato durante una conversazione intensa?"))
      .with(prompt("d-06", "Il limite", "Racconta un momento in cui hai capito di non poter aiutare qualcuno.")),
    ScenarioPool::new(AUTOCONSAPEVOLEZZA, "Quiz di autoconsapevolezza", ExerciseKind::Likert)
      .with(likert("q-ascolto", "Stile di ascolto", &[
        ("Lascio finire di parlare l'altro prima di rispondere.", false),
        ("Mentre l'altro parla, preparo già la mia risposta.", true),
        ("Riesco a riformulare ciò che ho sentito.", false),
        ("Mi distraggo facilmente durante le conversazioni lunghe.", true),
      ]))
      .with(likert("q-emozioni", "Riconoscere le emozioni", &[
        ("So dare un nome a ciò che provo.", false),
        ("Le emozioni degli altri mi travolgono.", true),
        ("Noto quando il mio umore cambia.", false),
        ("Evito di parlare di ciò che mi fa soffrire.", true),
      ]))
      .with(likert("q-empatia", "Empatia e distanza", &[
        ("Riesco a mettermi nei panni dell'altro senza perdermi.", false),
        ("Porto a casa i problemi delle persone che aiuto.", true),
        ("Accetto punti di vista diversi dal mio.", false),
      ])),
    ScenarioPool::new(CLASSIFICA_EMOZIONI, "Classifica le emozioni", ExerciseKind::ClientScored)
      .with(prompt(101i64, "Emozioni primarie", "Trascina ogni parola nella famiglia emotiva corretta."))
      .with(prompt(102i64, "Emozioni sociali", "Distingui vergogna, colpa, imbarazzo e orgoglio."))
      .with(prompt(103i64, "Intensità", "Ordina le emozioni dalla più lieve alla più intensa."))
      .with(prompt(104i64, "Bisogni", "Associa ogni emozione al bisogno che segnala.")),
    ScenarioPool::new(MAPPA_RELAZIONI, "Mappa delle relazioni", ExerciseKind::ClientScored)
      .with(prompt("m-01", "Genogramma", "Costruisci il genogramma della famiglia descritta nel caso."))
      .with(prompt("m-02", "Rete di supporto", "Disegna la rete di supporto del cliente e segna i legami deboli."))
      .with(prompt("m-03", "Conflitti", "Rappresenta i conflitti tra i membri del gruppo di lavoro.")),
  ]
}

pub fn seed_ranks() -> Vec<Rank> {
  [
    ("Novizio", 0, "Benvenuto! Ogni esercizio è un passo nel tuo percorso."),
    ("Apprendista", 50, "Stai prendendo confidenza con gli strumenti dell'ascolto."),
    ("Praticante", 150, "La pratica costante sta dando i suoi frutti."),
    ("Counselor in formazione", 300, "Sai accogliere e restituire i vissuti con cura."),
    ("Esperto", 500, "Le tue risposte mostrano maturità e consapevolezza."),
    ("Maestro dell'ascolto", 800, "Hai raggiunto il livello più alto. Continua a coltivarlo."),
  ]
  .into_iter()
  .map(|(name, min_points, message)| Rank { name: name.into(), min_points, message: message.into() })
  .collect()
}

/// Rank badges follow the (possibly configured) table; the rest is fixed.
pub fn seed_badges(ranks: &RankTable, pools: &BTreeMap<String, ScenarioPool>) -> Vec<Badge> {
  let mut badges: Vec<Badge> = ranks
    .ranks()
    .iter()
    .skip(1)
    .map(|r| Badge {
      id: format!("rank-{}", slug(&r.name)),
      name: r.name.clone(),
      description: format!("Raggiungi {} punti.", r.min_points),
      category: BadgeCategory::Rank,
      rule: BadgeRule::RankTier { min_points: r.min_points },
    })
    .collect();

  badges.push(Badge {
    id: "primo-passo".into(),
    name: "Primo passo".into(),
    description: "Completa il tuo primo role-play.".into(),
    category: BadgeCategory::Achievement,
    rule: BadgeRule::CountThreshold { exercise: ROLE_PLAY.into(), min: 1 },
  });
  badges.push(Badge {
    id: "diario-costante".into(),
    name: "Diario costante".into(),
    description: "Scrivi almeno 5 pagine di diario.".into(),
    category: BadgeCategory::Achievement,
    rule: BadgeRule::CountThreshold { exercise: DIARIO.into(), min: 5 },
  });

  for pool in pools.values() {
    badges.push(Badge {
      id: format!("mastery-{}", pool.exercise),
      name: format!("Maestria: {}", pool.title),
      description: format!("Completa tutti gli scenari di \"{}\".", pool.title),
      category: BadgeCategory::Mastery,
      rule: BadgeRule::ExerciseMastery { exercise: pool.exercise.clone() },
    });
  }

  badges.push(Badge {
    id: "hub-ascolto".into(),
    name: "Cuore dell'ascolto".into(),
    description: "Padroneggia insieme l'esplorazione dei vissuti e il role-play.".into(),
    category: BadgeCategory::Mastery,
    rule: BadgeRule::AllOf(vec![
      BadgeRule::ExerciseMastery { exercise: VISSI_EXPLORER.into() },
      BadgeRule::ExerciseMastery { exercise: ROLE_PLAY.into() },
    ]),
  });
  badges.push(Badge {
    id: "esploratore-completo".into(),
    name: "Esploratore completo".into(),
    description: "Completa ogni esercizio del catalogo nello stesso ciclo.".into(),
    category: BadgeCategory::Mastery,
    rule: BadgeRule::AllOf(
      pools.keys().map(|e| BadgeRule::ExerciseMastery { exercise: e.clone() }).collect(),
    ),
  });
  badges
}

/// Shown when a pool has no content; never recorded as a completion.
pub fn placeholder_item() -> ScenarioItem {
  ScenarioItem {
    id: "nessun-contenuto".into(),
    title: "Nessun contenuto disponibile".into(),
    body: "Questo esercizio non ha ancora scenari. Riprova più tardi.".into(),
    questions: vec![],
  }
}

pub fn catalog_from(pools: Vec<ScenarioPool>, ranks: RankTable) -> Catalog {
  let pools: BTreeMap<String, ScenarioPool> = pools.into_iter().map(|p| (p.exercise.clone(), p)).collect();
  let badges = seed_badges(&ranks, &pools);
  Catalog { pools, ranks, badges }
}

/// Catalogue with no configuration applied.
pub fn builtin_catalog() -> Catalog {
  catalog_from(seed_pools(), RankTable::default())
}

fn slug(name: &str) -> String {
  name
    .to_lowercase()
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seed_pools_have_unique_exercise_ids() {
    let pools = seed_pools();
    let catalog = builtin_catalog();
    assert_eq!(catalog.pools.len(), pools.len());
    assert_eq!(catalog.pool(VISSI_EXPLORER).unwrap().len(), 5);
  }

  #[test]
  fn seed_ranks_form_a_valid_table() {
    assert!(RankTable::new(seed_ranks()).is_ok());
  }

  #[test]
  fn likert_items_have_questions() {
    let catalog = builtin_catalog();
    let pool = catalog.pool(AUTOCONSAPEVOLEZZA).unwrap();
    assert_eq!(pool.kind, ExerciseKind::Likert);
    assert!(pool.items().iter().all(|i| !i.questions.is_empty()));
  }

  #[test]
  fn badge_ids_are_unique() {
    let catalog = builtin_catalog();
    let mut ids: Vec<&str> = catalog.badges.iter().map(|b| b.id.as_str()).collect();
    ids.sort();
    let before = ids.len();
    ids.dedup();
    assert_eq!(ids.len(), before);
  }

  #[test]
  fn rank_badges_skip_the_entry_rank() {
    let catalog = builtin_catalog();
    let rank_badges = catalog.badges.iter().filter(|b| b.category == BadgeCategory::Rank).count();
    assert_eq!(rank_badges, catalog.ranks.ranks().len() - 1);
    assert!(catalog.badges.iter().any(|b| b.id == "rank-counselor-in-formazione"));
  }

  #[test]
  fn rank_badges_use_their_rank_threshold() {
    let catalog = builtin_catalog();
    for rank in catalog.ranks.ranks().iter().skip(1) {
      let badge = catalog.badges.iter().find(|b| b.id == format!("rank-{}", slug(&rank.name))).unwrap();
      assert_eq!(badge.name, rank.name);
      assert_eq!(badge.rule, BadgeRule::RankTier { min_points: rank.min_points });
    }
  }
}
