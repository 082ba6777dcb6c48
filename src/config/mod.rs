//! # Configuration Management Module
//!
//! Chatquest reads a single TOML file with three sections:
//!
//! - [`GameRules`] - costs, durations, cooldowns and combat limits
//! - [`StorageConfig`] - where the character save file and optional content overrides live
//! - [`LoggingConfig`] - log level and optional log file
//!
//! Every field has a default, so a file only needs the values it changes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chatquest::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Fight cooldown: {}s", config.game.fight_cooldown_secs);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [game]
//! starting_gold = 25
//! fight_cooldown_secs = 60
//!
//! [storage]
//! data_dir = "./data"
//! save_file = "characters.json"
//!
//! [logging]
//! level = "info"
//! file = "chatquest.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::game::effects::MAX_EFFECT_SECS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameRules,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tunable game constants. Durations are in seconds, chances in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub starting_gold: u64,
    pub xp_command_amount: u64,
    pub xp_cooldown_secs: i64,
    pub fight_cooldown_secs: i64,
    pub pvp_cooldown_secs: i64,
    pub steal_cooldown_secs: i64,
    pub prison_secs: i64,
    pub bribe_cost: u64,
    pub tavern_cost: u64,
    pub tavern_buff_secs: i64,
    pub carouse_cost: u64,
    pub carouse_buff_secs: i64,
    pub carouse_penalty_pct: u32,
    pub cure_cost: u64,
    pub rest_cost: u64,
    pub steal_base_pct: u32,
    /// Chance that each rare monster joins a random draw.
    pub rare_monster_pct: u32,
    pub market_refresh_secs: i64,
    pub market_size: usize,
    pub leaderboard_size: usize,
    /// Upper bound on rounds for both PvE fights and duels.
    pub max_combat_rounds: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            starting_gold: 0,
            xp_command_amount: 50,
            xp_cooldown_secs: 300,
            fight_cooldown_secs: 90,
            pvp_cooldown_secs: 60,
            steal_cooldown_secs: 300,
            prison_secs: 300,
            bribe_cost: 50,
            tavern_cost: 50,
            tavern_buff_secs: 1800,
            carouse_cost: 100,
            carouse_buff_secs: 1800,
            carouse_penalty_pct: 25,
            cure_cost: 50,
            rest_cost: 5,
            steal_base_pct: 10,
            rare_monster_pct: 10,
            market_refresh_secs: 600,
            market_size: 3,
            leaderboard_size: 10,
            max_combat_rounds: 1000,
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_save_file() -> String {
    "characters.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_save_file")]
    pub save_file: String,
    /// Directory holding JSON overrides for the built-in content tables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_dir: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            save_file: default_save_file(),
            content_dir: None,
        }
    }
}

impl StorageConfig {
    pub fn save_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.save_file)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: Some("chatquest.log".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values that would make the game misbehave.
    pub fn validate(&self) -> Result<()> {
        let g = &self.game;
        if g.max_combat_rounds == 0 {
            return Err(anyhow!("game.max_combat_rounds must be at least 1"));
        }
        for (name, pct) in [
            ("carouse_penalty_pct", g.carouse_penalty_pct),
            ("steal_base_pct", g.steal_base_pct),
            ("rare_monster_pct", g.rare_monster_pct),
        ] {
            if pct > 100 {
                return Err(anyhow!("game.{} must be between 0 and 100, got {}", name, pct));
            }
        }
        for (name, secs) in [
            ("xp_cooldown_secs", g.xp_cooldown_secs),
            ("fight_cooldown_secs", g.fight_cooldown_secs),
            ("pvp_cooldown_secs", g.pvp_cooldown_secs),
            ("steal_cooldown_secs", g.steal_cooldown_secs),
            ("prison_secs", g.prison_secs),
            ("tavern_buff_secs", g.tavern_buff_secs),
            ("carouse_buff_secs", g.carouse_buff_secs),
            ("market_refresh_secs", g.market_refresh_secs),
        ] {
            if !(0..=MAX_EFFECT_SECS).contains(&secs) {
                return Err(anyhow!(
                    "game.{} must be between 0 and {}, got {}",
                    name,
                    MAX_EFFECT_SECS,
                    secs
                ));
            }
        }
        if self.storage.save_file.trim().is_empty() {
            return Err(anyhow!("storage.save_file must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_file_takes_every_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.game, GameRules::default());
        assert_eq!(config.storage.save_file, "characters.json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_game_section_keeps_other_defaults() {
        let config: Config = toml::from_str("[game]\nfight_cooldown_secs = 10\n").unwrap();
        assert_eq!(config.game.fight_cooldown_secs, 10);
        assert_eq!(config.game.xp_cooldown_secs, 300);
        assert_eq!(config.game.max_combat_rounds, 1000);
    }

    #[tokio::test]
    async fn default_file_round_trips_through_disk() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.game, GameRules::default());
        assert_eq!(loaded.storage.save_path(), PathBuf::from("./data/characters.json"));
    }

    #[tokio::test]
    async fn out_of_range_percent_is_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[game]\nsteal_base_pct = 150\n").unwrap();
        let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("steal_base_pct"));
    }

    #[tokio::test]
    async fn negative_or_huge_durations_are_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        for (body, field) in [
            ("[game]\nprison_secs = 100000000000000\n", "prison_secs"),
            ("[game]\ntavern_buff_secs = -1\n", "tavern_buff_secs"),
            ("[game]\nfight_cooldown_secs = 9223372036854775807\n", "fight_cooldown_secs"),
        ] {
            std::fs::write(&path, body).unwrap();
            let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
            assert!(err.to_string().contains(field), "{}", err);
        }

        let mut config = Config::default();
        config.game.prison_secs = MAX_EFFECT_SECS;
        assert!(config.validate().is_ok());
    }
}
