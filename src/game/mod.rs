//! # Character State & Combat Resolution
//!
//! Everything that makes up the game lives here, leaves first:
//!
//! - [`types`] - the persistent [`Character`] record and its enums
//! - [`content`] / [`seed_loader`] - read-only item, monster, market, race and class tables
//! - [`stats`] - derived HP and damage numbers
//! - [`effects`] - buffs, debuffs, cooldowns and prison against a caller-supplied clock
//! - [`progression`] - XP multipliers and level-ups
//! - [`combat`] - PvE encounters and PvP duels
//! - [`duel`] - outstanding challenges
//! - [`market`] - the rotating black market
//! - [`storage`] - the JSON character store
//! - [`engine`] - request dispatch, returning structured [`Outcome`]s
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatquest::config::GameRules;
//! use chatquest::game::{CharacterStore, GameContent, GameEngine, Intent, Request};
//!
//! let content = GameContent::builtin();
//! let store = CharacterStore::open("data/characters.json", &content);
//! let mut engine = GameEngine::new(store, content, GameRules::default());
//! let outcome = engine.handle(&Request::new("alice", Intent::Start, Vec::<String>::new(), chrono::Utc::now()));
//! println!("{:?}", outcome);
//! ```

pub mod combat;
pub mod content;
pub mod duel;
pub mod effects;
pub mod engine;
pub mod errors;
pub mod market;
pub mod outcome;
pub mod progression;
pub mod seed_loader;
pub mod stats;
pub mod storage;
pub mod types;

pub use content::GameContent;
pub use engine::{GameEngine, Intent, Request};
pub use errors::{GameError, StorageError};
pub use outcome::Outcome;
pub use storage::CharacterStore;
pub use types::{Character, Class, CooldownKey, Race, Slot};
