//! Persistent character record and the small enums it is built from.
//!
//! Records are serialized as JSON by [`crate::game::storage::CharacterStore`]. Fields added
//! after the first release carry `#[serde(default)]` so older save files keep loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    Human,
    Elf,
    Orc,
}

impl Race {
    pub const ALL: [Race; 3] = [Race::Human, Race::Elf, Race::Orc];

    pub fn as_str(self) -> &'static str {
        match self {
            Race::Human => "human",
            Race::Elf => "elf",
            Race::Orc => "orc",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Race {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Race::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown race '{}'", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    Warrior,
    Mage,
    Rogue,
}

impl Class {
    pub const ALL: [Class; 3] = [Class::Warrior, Class::Mage, Class::Rogue];

    pub fn as_str(self) -> &'static str {
        match self {
            Class::Warrior => "warrior",
            Class::Mage => "mage",
            Class::Rogue => "rogue",
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Class {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Class::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown class '{}'", s.trim()))
    }
}

/// Where an item goes. `Consumable` items are used up, `Trinket` loot is only sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Weapon,
    Armor,
    Helmet,
    Pet,
    Amulet,
    Consumable,
    Trinket,
}

impl Slot {
    /// Equipment slots in display order.
    pub const EQUIPPABLE: [Slot; 5] = [Slot::Weapon, Slot::Armor, Slot::Helmet, Slot::Pet, Slot::Amulet];

    pub fn is_equippable(self) -> bool {
        !matches!(self, Slot::Consumable | Slot::Trinket)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Weapon => "weapon",
            Slot::Armor => "armor",
            Slot::Helmet => "helmet",
            Slot::Pet => "pet",
            Slot::Amulet => "amulet",
            Slot::Consumable => "consumable",
            Slot::Trinket => "trinket",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Slot::EQUIPPABLE
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown slot '{}'", s.trim()))
    }
}

/// Independent cooldown namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownKey {
    Xp,
    Fight,
    Pvp,
    Steal,
}

impl fmt::Display for CooldownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CooldownKey::Xp => "xp",
            CooldownKey::Fight => "fight",
            CooldownKey::Pvp => "pvp",
            CooldownKey::Steal => "steal",
        })
    }
}

/// The five worn items. Serializes as `{"weapon": null, "armor": "Chainmail", ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub armor: Option<String>,
    #[serde(default)]
    pub helmet: Option<String>,
    #[serde(default)]
    pub pet: Option<String>,
    #[serde(default)]
    pub amulet: Option<String>,
}

impl Equipment {
    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Weapon => self.weapon.as_deref(),
            Slot::Armor => self.armor.as_deref(),
            Slot::Helmet => self.helmet.as_deref(),
            Slot::Pet => self.pet.as_deref(),
            Slot::Amulet => self.amulet.as_deref(),
            Slot::Consumable | Slot::Trinket => None,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> Option<&mut Option<String>> {
        match slot {
            Slot::Weapon => Some(&mut self.weapon),
            Slot::Armor => Some(&mut self.armor),
            Slot::Helmet => Some(&mut self.helmet),
            Slot::Pet => Some(&mut self.pet),
            Slot::Amulet => Some(&mut self.amulet),
            Slot::Consumable | Slot::Trinket => None,
        }
    }

    /// Put `item` into `slot`, returning whatever was there before.
    pub fn replace(&mut self, slot: Slot, item: String) -> Option<String> {
        self.slot_mut(slot).and_then(|s| s.replace(item))
    }

    pub fn take(&mut self, slot: Slot) -> Option<String> {
        self.slot_mut(slot).and_then(Option::take)
    }

    /// Iterate `(slot, item)` over all five slots in display order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, Option<&str>)> + '_ {
        Slot::EQUIPPABLE.into_iter().map(move |slot| (slot, self.get(slot)))
    }
}

/// Timestamps and flags for buffs, debuffs and imprisonment. An effect is active while `now < until`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEffects {
    #[serde(default)]
    pub xp_buff_until: Option<DateTime<Utc>>,
    /// Halves XP gains until cured; has no expiry.
    #[serde(default)]
    pub xp_penalty: bool,
    #[serde(default)]
    pub attack_buff_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prison_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub imprisoned: bool,
}

fn unset_hp() -> i64 {
    -1
}

/// One player's persistent game state, keyed in the store by lower-cased handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub level: u32,
    pub xp: u64,
    pub gold: u64,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub equipment: Equipment,
    /// Negative means the record predates HP tracking; filled in on load.
    #[serde(default = "unset_hp")]
    pub current_hp: i64,
    #[serde(default)]
    pub race: Option<Race>,
    #[serde(default)]
    pub class: Option<Class>,
    #[serde(default)]
    pub cooldowns: BTreeMap<CooldownKey, DateTime<Utc>>,
    #[serde(default)]
    pub effects: TimedEffects,
    #[serde(default)]
    pub pvp_wins: u32,
    #[serde(default)]
    pub pvp_losses: u32,
}

impl Character {
    /// Fresh level-1 character with `hp` current health.
    pub fn new(gold: u64, hp: i64) -> Self {
        Self {
            level: 1,
            xp: 0,
            gold,
            inventory: Vec::new(),
            equipment: Equipment::default(),
            current_hp: hp,
            race: None,
            class: None,
            cooldowns: BTreeMap::new(),
            effects: TimedEffects::default(),
            pvp_wins: 0,
            pvp_losses: 0,
        }
    }

    /// Position of the first inventory entry matching `name` case-insensitively.
    pub fn find_item(&self, name: &str) -> Option<usize> {
        let needle = name.trim().to_lowercase();
        self.inventory
            .iter()
            .position(|held| held.to_lowercase() == needle)
    }

    pub fn holds(&self, name: &str) -> bool {
        self.find_item(name).is_some()
    }

    /// Remove one matching item and return it with its stored spelling.
    pub fn take_item(&mut self, name: &str) -> Option<String> {
        self.find_item(name).map(|idx| self.inventory.remove(idx))
    }

    pub fn add_item(&mut self, name: impl Into<String>) {
        self.inventory.push(name.into());
    }

    /// Inventory grouped by exact name with counts, in first-acquisition order.
    pub fn item_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for item in &self.inventory {
            match counts.iter_mut().find(|(name, _)| name == item) {
                Some((_, n)) => *n += 1,
                None => counts.push((item.clone(), 1)),
            }
        }
        counts
    }

    /// Distinct held items in first-acquisition order.
    pub fn distinct_items(&self) -> Vec<String> {
        self.item_counts().into_iter().map(|(name, _)| name).collect()
    }

    /// Debit `amount` gold or fail without touching the balance.
    pub fn spend(&mut self, amount: u64) -> Result<(), crate::game::GameError> {
        if self.gold < amount {
            return Err(crate::game::GameError::InsufficientFunds {
                needed: amount,
                available: self.gold,
            });
        }
        self.gold -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_lookup_ignores_case_but_keeps_spelling() {
        let mut c = Character::new(0, 30);
        c.add_item("Health Potion");
        c.add_item("Rusty Sword");
        assert!(c.holds("health potion"));
        assert_eq!(c.take_item("RUSTY SWORD").as_deref(), Some("Rusty Sword"));
        assert_eq!(c.inventory, vec!["Health Potion".to_string()]);
    }

    #[test]
    fn item_counts_follow_first_acquisition() {
        let mut c = Character::new(0, 30);
        for item in ["Goblin Ear", "Health Potion", "Goblin Ear"] {
            c.add_item(item);
        }
        assert_eq!(
            c.item_counts(),
            vec![("Goblin Ear".to_string(), 2), ("Health Potion".to_string(), 1)]
        );
    }

    #[test]
    fn spend_rejects_overdraft() {
        let mut c = Character::new(40, 30);
        assert!(c.spend(50).is_err());
        assert_eq!(c.gold, 40);
        c.spend(15).unwrap();
        assert_eq!(c.gold, 25);
    }

    #[test]
    fn old_records_without_new_fields_deserialize() {
        let json = r#"{"level":2,"xp":10,"gold":5}"#;
        let c: Character = serde_json::from_str(json).unwrap();
        assert_eq!(c.current_hp, -1);
        assert!(c.equipment.weapon.is_none());
        assert!(c.cooldowns.is_empty());
    }

    #[test]
    fn equipment_replace_returns_previous() {
        let mut eq = Equipment::default();
        assert_eq!(eq.replace(Slot::Weapon, "Rusty Sword".into()), None);
        assert_eq!(eq.replace(Slot::Weapon, "Iron Sword".into()).as_deref(), Some("Rusty Sword"));
        assert_eq!(eq.take(Slot::Weapon).as_deref(), Some("Iron Sword"));
        assert_eq!(eq.get(Slot::Weapon), None);
        assert_eq!(eq.replace(Slot::Consumable, "Health Potion".into()), None);
    }
}
