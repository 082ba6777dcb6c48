//! Seed data loaders for data-driven content tables
//!
//! Operators can drop JSON files into a content directory to replace the built-in tables
//! without recompiling:
//!
//! - `items.json`    - `[ItemDef]`
//! - `monsters.json` - `[MonsterTemplate]`
//! - `market.json`   - `[MarketOffer]`
//! - `races.json`    - `{"human": {"xp_bonus_pct": 0}, ...}`
//! - `classes.json`  - `{"warrior": {"attack_bonus": [2, 5], "hp_bonus": 10}, ...}`
//!
//! A missing file keeps the built-in table. A file that exists but fails to parse is an error.

use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::Path;

use crate::game::content::{
    builtin_classes, builtin_items, builtin_market, builtin_monsters, builtin_races, GameContent,
};

fn load_table<T: DeserializeOwned>(dir: &Path, file: &str) -> io::Result<Option<T>> {
    let path = dir.join(file);
    if !path.exists() {
        log::debug!("content: {} not present, using built-in table", path.display());
        return Ok(None);
    }
    let contents = fs::read_to_string(&path)?;
    let table = serde_json::from_str(&contents).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse {}: {}", path.display(), e),
        )
    })?;
    log::info!("content: loaded {}", path.display());
    Ok(Some(table))
}

/// Build [`GameContent`] from `dir`, falling back to built-in tables per missing file.
pub fn load_content_dir<P: AsRef<Path>>(dir: P) -> io::Result<GameContent> {
    let dir = dir.as_ref();
    let items = load_table(dir, "items.json")?.unwrap_or_else(builtin_items);
    let monsters = load_table(dir, "monsters.json")?.unwrap_or_else(builtin_monsters);
    let market = load_table(dir, "market.json")?.unwrap_or_else(builtin_market);
    let races = load_table(dir, "races.json")?.unwrap_or_else(builtin_races);
    let classes = load_table(dir, "classes.json")?.unwrap_or_else(builtin_classes);

    let content = GameContent::new(items, monsters, market, races, classes);
    for offer in &content.market {
        if content.item(&offer.item).is_none() {
            log::warn!(
                "content: market offer '{}' has no item definition; it can be bought but not equipped or used",
                offer.item
            );
        }
    }
    if content.monsters().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "monster table is empty",
        ));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{Class, Race};
    use tempfile::tempdir;

    #[test]
    fn missing_files_fall_back_to_builtin() {
        let tmp = tempdir().unwrap();
        let content = load_content_dir(tmp.path()).unwrap();
        assert_eq!(content.items.len(), builtin_items().len());
        assert!(content.monster("goblin").is_some());
    }

    #[test]
    fn overrides_replace_individual_tables() {
        let tmp = tempdir().unwrap();
        fs::write(
            tmp.path().join("monsters.json"),
            r#"[{"name":"Slime","base_hp":10,"base_attack":1,"xp_reward":[1,2],"gold_reward":[0,1]}]"#,
        )
        .unwrap();
        fs::write(
            tmp.path().join("races.json"),
            r#"{"human":{"xp_bonus_pct":3}}"#,
        )
        .unwrap();
        let content = load_content_dir(tmp.path()).unwrap();
        assert_eq!(content.monsters().len(), 1);
        assert!(content.monster("SLIME").is_some());
        assert!(content.monster("Goblin").is_none());
        assert_eq!(content.race_bonus(Some(Race::Human)).xp_bonus_pct, 3);
        assert_eq!(content.race_bonus(Some(Race::Elf)).xp_bonus_pct, 0);
        // untouched table keeps its defaults
        assert_eq!(content.class_bonus(Some(Class::Warrior)).hp_bonus, 10);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("items.json"), "{not json").unwrap();
        let err = load_content_dir(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
