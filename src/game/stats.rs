//! Stat calculator: pure functions that derive combat numbers from a character snapshot.
//!
//! Formulas:
//! - base max HP: `30 + (level - 1) * 5`
//! - per-swing damage: uniform in `[5 + 2*level, 10 + 3*level]`
//! - bonuses: the five equipment slots plus the chosen class, summed as `(min, max, hp)`
//!
//! Race only affects XP and is handled by [`crate::game::progression`].

use rand::Rng;

use crate::game::content::GameContent;
use crate::game::types::Character;

pub const BASE_HP: i64 = 30;
pub const HP_PER_LEVEL: i64 = 5;

/// Summed attack and HP bonuses from equipment and class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bonuses {
    pub min_attack: i64,
    pub max_attack: i64,
    pub hp: i64,
}

pub fn base_max_hp(level: u32) -> i64 {
    BASE_HP + (i64::from(level.max(1)) - 1) * HP_PER_LEVEL
}

/// Unmodified damage bounds for `level`, inclusive.
pub fn base_damage_range(level: u32) -> (i64, i64) {
    let level = i64::from(level);
    (5 + level * 2, 10 + level * 3)
}

/// One random swing before bonuses and multipliers.
pub fn damage_roll<R: Rng + ?Sized>(level: u32, rng: &mut R) -> i64 {
    let (lo, hi) = base_damage_range(level);
    rng.gen_range(lo..=hi)
}

pub fn equipment_bonuses(character: &Character, content: &GameContent) -> Bonuses {
    let mut bonuses = Bonuses::default();
    for (_, item) in character.equipment.iter() {
        let Some(def) = item.and_then(|name| content.item(name)) else {
            continue;
        };
        bonuses.min_attack += def.attack_bonus.0;
        bonuses.max_attack += def.attack_bonus.1;
        bonuses.hp += def.hp_bonus;
    }
    let class = content.class_bonus(character.class);
    bonuses.min_attack += class.attack_bonus.0;
    bonuses.max_attack += class.attack_bonus.1;
    bonuses.hp += class.hp_bonus;
    bonuses
}

pub fn max_hp(character: &Character, content: &GameContent) -> i64 {
    base_max_hp(character.level) + equipment_bonuses(character, content).hp
}

/// Displayed damage range: base range plus bonuses. Multipliers are not applied.
pub fn damage_range(character: &Character, content: &GameContent) -> (i64, i64) {
    let (lo, hi) = base_damage_range(character.level);
    let b = equipment_bonuses(character, content);
    (lo + b.min_attack, hi + b.max_attack)
}

/// Clamp `current_hp` into `[0, max_hp]`. Returns the max used.
pub fn clamp_hp(character: &mut Character, content: &GameContent) -> i64 {
    let max = max_hp(character, content);
    character.current_hp = character.current_hp.clamp(0, max);
    max
}

/// Set `current_hp` to the full maximum. Returns the max used.
pub fn heal_full(character: &mut Character, content: &GameContent) -> i64 {
    let max = max_hp(character, content);
    character.current_hp = max;
    max
}

/// Repair a record read from disk: unset HP becomes full, anything else is clamped.
pub fn settle_loaded(character: &mut Character, content: &GameContent) {
    character.level = character.level.max(1);
    if character.current_hp < 0 {
        heal_full(character, content);
    } else {
        clamp_hp(character, content);
    }
}
