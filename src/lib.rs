//! # Chatquest - Character State & Combat Resolution for Chat RPGs
//!
//! Chatquest is the game core behind a chat-channel role-playing bot. Players create a
//! character, earn XP and gold, gear up, fight monsters and duel each other; every command is
//! one request resolved to completion against a durable JSON character store.
//!
//! ## Features
//!
//! - **Deterministic Stats**: HP and damage derived from level, equipment and class.
//! - **Turn-Based Combat**: Bounded PvE encounters and coin-flip-initiative PvP duels with stakes.
//! - **Timed Effects**: Buffs, debuffs, cooldowns and prison evaluated against the request time.
//! - **Economy**: Inventory, equipment slots, selling, gifting and a rotating black market.
//! - **Durable Storage**: Backup-then-atomic-rename saves guarded by an `fs2` file lock.
//! - **Data-Driven Content**: Built-in item and monster tables, overridable from JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatquest::config::Config;
//! use chatquest::game::{GameEngine, Intent, Request};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let mut engine = GameEngine::from_config(&config)?;
//!     let req = Request::new("alice", Intent::Fight, ["goblin"], chrono::Utc::now());
//!     println!("{:?}", engine.handle(&req));
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - character model, combat, progression, storage and the request engine
//! - [`config`] - configuration management and validation
//! - [`console`] - stdin/stdout front end used by the `chatquest` binary
//! - [`validation`] - handle normalization and log sanitizing

pub mod config;
pub mod console;
pub mod game;
pub mod validation;
