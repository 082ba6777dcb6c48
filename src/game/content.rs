//! Read-only game content: items, monsters, the black-market catalog and race/class bonuses.
//!
//! The engine never mutates content. [`GameContent::builtin`] ships a small default world;
//! operators can override any table from JSON via [`crate::game::seed_loader`].
//!
//! Item and monster names are canonical strings. Lookups go through a lower-cased index
//! built once at construction, so `"health potion"` resolves to `"Health Potion"`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::game::types::{Class, Race, Slot};

/// Special behaviour attached to an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemEffect {
    /// HP restored when a consumable is used.
    #[serde(default)]
    pub heal: Option<i64>,
    /// Extra steal success chance (percentage points) while worn.
    #[serde(default)]
    pub steal_chance_pct: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    pub slot: Slot,
    /// `(min, max)` added to every swing while worn.
    #[serde(default)]
    pub attack_bonus: (i64, i64),
    #[serde(default)]
    pub hp_bonus: i64,
    /// Base value; items without a price cannot be sold.
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub effect: ItemEffect,
    #[serde(default)]
    pub description: String,
}

impl ItemDef {
    fn new(name: &str, slot: Slot) -> Self {
        Self {
            name: name.to_string(),
            slot,
            attack_bonus: (0, 0),
            hp_bonus: 0,
            price: None,
            effect: ItemEffect::default(),
            description: String::new(),
        }
    }

    fn attack(mut self, min: i64, max: i64) -> Self {
        self.attack_bonus = (min, max);
        self
    }

    fn hp(mut self, hp: i64) -> Self {
        self.hp_bonus = hp;
        self
    }

    fn price(mut self, price: u64) -> Self {
        self.price = Some(price);
        self
    }

    fn heal(mut self, amount: i64) -> Self {
        self.effect.heal = Some(amount);
        self
    }

    fn steal_chance(mut self, pct: u32) -> Self {
        self.effect.steal_chance_pct = Some(pct);
        self
    }

    fn describe(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }
}

/// Item definitions with a case-insensitive name index.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: Vec<ItemDef>,
    index: HashMap<String, usize>,
}

impl ItemCatalog {
    pub fn new(items: Vec<ItemDef>) -> Self {
        let index = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.name.to_lowercase(), i))
            .collect();
        Self { items, index }
    }

    pub fn get(&self, name: &str) -> Option<&ItemDef> {
        self.index
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.items[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemDef> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    pub name: String,
    pub base_hp: i64,
    pub base_attack: i64,
    /// Inclusive `(min, max)` XP granted on a win.
    pub xp_reward: (u64, u64),
    pub gold_reward: (u64, u64),
    #[serde(default)]
    pub loot: Vec<String>,
    /// Probability in `[0, 1]` that one loot item drops.
    #[serde(default)]
    pub loot_chance: f64,
    /// Rare monsters only join the random draw with the configured rare chance.
    #[serde(default)]
    pub rare: bool,
}

/// A black-market listing. The price here overrides the catalog price for purchases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOffer {
    pub item: String,
    pub price: u64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceBonus {
    /// Added to the XP multiplier, in percent (10 = +10%).
    #[serde(default)]
    pub xp_bonus_pct: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassBonus {
    #[serde(default)]
    pub attack_bonus: (i64, i64),
    #[serde(default)]
    pub hp_bonus: i64,
    #[serde(default)]
    pub xp_bonus_pct: i64,
    #[serde(default)]
    pub steal_chance_pct: u32,
}

/// Every static table the engine consults.
#[derive(Debug, Clone)]
pub struct GameContent {
    pub items: ItemCatalog,
    monsters: Vec<MonsterTemplate>,
    monster_index: HashMap<String, usize>,
    pub market: Vec<MarketOffer>,
    pub races: BTreeMap<Race, RaceBonus>,
    pub classes: BTreeMap<Class, ClassBonus>,
}

impl GameContent {
    pub fn new(
        items: Vec<ItemDef>,
        monsters: Vec<MonsterTemplate>,
        market: Vec<MarketOffer>,
        races: BTreeMap<Race, RaceBonus>,
        classes: BTreeMap<Class, ClassBonus>,
    ) -> Self {
        let monster_index = monsters
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.to_lowercase(), i))
            .collect();
        Self {
            items: ItemCatalog::new(items),
            monsters,
            monster_index,
            market,
            races,
            classes,
        }
    }

    pub fn item(&self, name: &str) -> Option<&ItemDef> {
        self.items.get(name)
    }

    pub fn monster(&self, name: &str) -> Option<&MonsterTemplate> {
        self.monster_index
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.monsters[i])
    }

    pub fn monsters(&self) -> &[MonsterTemplate] {
        &self.monsters
    }

    pub fn race_bonus(&self, race: Option<Race>) -> RaceBonus {
        race.and_then(|r| self.races.get(&r).copied()).unwrap_or_default()
    }

    pub fn class_bonus(&self, class: Option<Class>) -> ClassBonus {
        class.and_then(|c| self.classes.get(&c).copied()).unwrap_or_default()
    }

    /// Description for an item: catalog text first, then any market listing text.
    pub fn describe(&self, name: &str) -> Option<&str> {
        if let Some(item) = self.item(name).filter(|i| !i.description.is_empty()) {
            return Some(&item.description);
        }
        let needle = name.trim().to_lowercase();
        self.market
            .iter()
            .find(|o| o.item.to_lowercase() == needle && !o.description.is_empty())
            .map(|o| o.description.as_str())
    }

    pub fn builtin() -> Self {
        Self::new(
            builtin_items(),
            builtin_monsters(),
            builtin_market(),
            builtin_races(),
            builtin_classes(),
        )
    }
}

impl Default for GameContent {
    fn default() -> Self {
        Self::builtin()
    }
}

pub fn builtin_items() -> Vec<ItemDef> {
    vec![
        ItemDef::new("Rusty Sword", Slot::Weapon)
            .attack(1, 3)
            .price(20)
            .describe("A pitted blade. Better than bare fists."),
        ItemDef::new("Iron Sword", Slot::Weapon)
            .attack(3, 6)
            .price(60)
            .describe("Standard issue for the town guard."),
        ItemDef::new("Shadow Dagger", Slot::Weapon)
            .attack(4, 9)
            .price(150)
            .describe("Light, quiet, and sharp enough to split a hair."),
        ItemDef::new("Leather Armor", Slot::Armor)
            .hp(10)
            .price(40)
            .describe("Boiled leather stitched over padding."),
        ItemDef::new("Chainmail", Slot::Armor)
            .hp(20)
            .price(90)
            .describe("Heavy rings that turn most blades."),
        ItemDef::new("Iron Helmet", Slot::Helmet)
            .hp(5)
            .price(30)
            .describe("Dented but dependable."),
        ItemDef::new("Dragonscale Helm", Slot::Helmet)
            .attack(1, 1)
            .hp(15)
            .price(200)
            .describe("Warm to the touch. Still smells of smoke."),
        ItemDef::new("Wolf Pup", Slot::Pet)
            .attack(1, 2)
            .hp(5)
            .price(120)
            .describe("Loyal, hungry, bites ankles."),
        ItemDef::new("Raven Familiar", Slot::Pet)
            .attack(2, 3)
            .price(180)
            .describe("Pecks at eyes and steals shiny things."),
        ItemDef::new("Amulet of Luck", Slot::Amulet)
            .steal_chance(10)
            .price(150)
            .describe("Fingers feel lighter while it is worn. +10% steal chance."),
        ItemDef::new("Amulet of Vigor", Slot::Amulet)
            .hp(15)
            .price(140)
            .describe("Keeps the heart beating through hard blows."),
        ItemDef::new("Health Potion", Slot::Consumable)
            .heal(20)
            .price(10)
            .describe("Restores 20 HP."),
        ItemDef::new("Elixir of Life", Slot::Consumable)
            .heal(100)
            .price(60)
            .describe("Restores 100 HP."),
        ItemDef::new("Goblin Ear", Slot::Trinket)
            .price(4)
            .describe("Proof of a goblin slain. Some collectors pay for these."),
        ItemDef::new("Wolf Pelt", Slot::Trinket)
            .price(12)
            .describe("Thick grey fur."),
        ItemDef::new("Troll Tooth", Slot::Trinket)
            .price(40)
            .describe("Large enough to use as a doorstop."),
    ]
}

#[allow(clippy::too_many_arguments)]
fn monster(
    name: &str,
    base_hp: i64,
    base_attack: i64,
    xp_reward: (u64, u64),
    gold_reward: (u64, u64),
    loot: &[&str],
    loot_chance: f64,
    rare: bool,
) -> MonsterTemplate {
    MonsterTemplate {
        name: name.to_string(),
        base_hp,
        base_attack,
        xp_reward,
        gold_reward,
        loot: loot.iter().map(|s| s.to_string()).collect(),
        loot_chance,
        rare,
    }
}

pub fn builtin_monsters() -> Vec<MonsterTemplate> {
    vec![
        monster("Rat", 12, 2, (5, 10), (1, 4), &["Health Potion"], 0.2, false),
        monster("Goblin", 20, 5, (10, 20), (5, 12), &["Goblin Ear", "Rusty Sword"], 0.3, false),
        monster("Wolf", 26, 6, (15, 25), (3, 8), &["Wolf Pelt", "Wolf Pup"], 0.25, false),
        monster("Skeleton", 32, 7, (20, 35), (8, 18), &["Iron Helmet", "Iron Sword"], 0.2, false),
        monster("Bandit", 28, 6, (15, 30), (15, 30), &["Leather Armor", "Health Potion"], 0.3, false),
        monster("Troll", 70, 11, (60, 100), (40, 80), &["Troll Tooth", "Chainmail", "Amulet of Vigor"], 0.5, true),
        monster("Dragon", 140, 18, (150, 250), (100, 200), &["Dragonscale Helm", "Elixir of Life"], 0.6, true),
    ]
}

pub fn builtin_market() -> Vec<MarketOffer> {
    let offer = |item: &str, price: u64, description: &str| MarketOffer {
        item: item.to_string(),
        price,
        description: description.to_string(),
    };
    vec![
        offer("Shadow Dagger", 150, "+4-9 attack"),
        offer("Raven Familiar", 180, "pet, +2-3 attack"),
        offer("Amulet of Luck", 150, "+10% steal chance"),
        offer("Amulet of Vigor", 140, "+15 HP"),
        offer("Dragonscale Helm", 200, "+15 HP, +1 attack"),
        offer("Elixir of Life", 60, "restores 100 HP"),
    ]
}

pub fn builtin_races() -> BTreeMap<Race, RaceBonus> {
    BTreeMap::from([
        (Race::Human, RaceBonus { xp_bonus_pct: 0 }),
        (Race::Elf, RaceBonus { xp_bonus_pct: 10 }),
        (Race::Orc, RaceBonus { xp_bonus_pct: -5 }),
    ])
}

pub fn builtin_classes() -> BTreeMap<Class, ClassBonus> {
    BTreeMap::from([
        (
            Class::Warrior,
            ClassBonus {
                attack_bonus: (2, 5),
                hp_bonus: 10,
                ..ClassBonus::default()
            },
        ),
        (
            Class::Mage,
            ClassBonus {
                attack_bonus: (0, 3),
                xp_bonus_pct: 10,
                ..ClassBonus::default()
            },
        ),
        (
            Class::Rogue,
            ClassBonus {
                attack_bonus: (1, 4),
                steal_chance_pct: 5,
                ..ClassBonus::default()
            },
        ),
    ])
}
