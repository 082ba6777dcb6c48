//! Shared fixtures for the integration tests.
//! Every world lives in its own temp dir; characters are seeded directly into the store.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use chatquest::config::GameRules;
use chatquest::game::{
    Character, CharacterStore, GameContent, GameEngine, GameError, Intent, Outcome, Request,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// A fresh level-1 character with full HP and `gold`.
pub fn fresh(gold: u64) -> Character {
    Character::new(gold, 30)
}

/// Build an engine over a temp save file with `characters` already in place.
pub fn world(characters: Vec<(&str, Character)>, seed: u64) -> (TempDir, GameEngine) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let mut store = CharacterStore::empty(tmp.path().join("characters.json"));
    for (id, c) in characters {
        store.create(id, c).expect("seed character");
    }
    let engine = GameEngine::with_seed(store, GameContent::builtin(), GameRules::default(), seed);
    (tmp, engine)
}

pub fn run(
    engine: &mut GameEngine,
    actor: &str,
    intent: Intent,
    args: &[&str],
) -> Result<Outcome, GameError> {
    run_at(engine, actor, intent, args, t0())
}

pub fn run_at(
    engine: &mut GameEngine,
    actor: &str,
    intent: Intent,
    args: &[&str],
    now: DateTime<Utc>,
) -> Result<Outcome, GameError> {
    engine.handle(&Request::new(actor, intent, args.iter().copied(), now))
}
