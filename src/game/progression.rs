//! Progression ledger: XP gains with buff/penalty/race/class multipliers, and level-ups.
//!
//! XP arithmetic is done in integer percent so the floor is exact:
//! `raw * buff * penalty * (100 + race + class) / 100^3`.

use crate::game::content::GameContent;
use crate::game::effects::{EffectClock, XP_BUFF_PCT, XP_PENALTY_PCT};
use crate::game::stats;
use crate::game::types::Character;

/// XP needed to leave `level`.
pub fn xp_threshold(level: u32) -> u64 {
    u64::from(level) * 100
}

/// XP actually granted for `raw` after every multiplier, floored.
pub fn scaled_xp(
    raw: u64,
    race_bonus_pct: i64,
    class_bonus_pct: i64,
    clock: &EffectClock,
    character: &Character,
) -> u64 {
    let buff = if clock.has_xp_buff(character) { XP_BUFF_PCT } else { 100 };
    let penalty = if clock.has_xp_penalty(character) { XP_PENALTY_PCT } else { 100 };
    let affinity = (100 + race_bonus_pct + class_bonus_pct).max(0);
    let numerator = i128::from(raw) * i128::from(buff) * i128::from(penalty) * i128::from(affinity);
    (numerator / 1_000_000).max(0) as u64
}

/// Add multiplied XP to `character`. Returns the amount granted; call [`try_level_up`] after.
pub fn apply_xp(
    character: &mut Character,
    raw: u64,
    race_bonus_pct: i64,
    class_bonus_pct: i64,
    clock: &EffectClock,
) -> u64 {
    let gained = scaled_xp(raw, race_bonus_pct, class_bonus_pct, clock, character);
    character.xp = character.xp.saturating_add(gained);
    gained
}

/// Level up while the threshold is met. Each level gained heals to the new maximum.
///
/// Returns `true` if at least one level was gained.
pub fn try_level_up(character: &mut Character, content: &GameContent) -> bool {
    let mut leveled = false;
    while character.xp >= xp_threshold(character.level) {
        character.xp -= xp_threshold(character.level);
        character.level += 1;
        stats::heal_full(character, content);
        leveled = true;
    }
    if leveled {
        log::debug!("level up -> {} (xp {})", character.level, character.xp);
    }
    leveled
}

/// Lose a tenth of current XP (floored). Returns the amount lost.
pub fn apply_defeat_penalty(character: &mut Character) -> u64 {
    let loss = character.xp / 10;
    character.xp -= loss;
    loss
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn clock() -> EffectClock {
        EffectClock::at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn multipliers_stack_multiplicatively() {
        let clock = clock();
        let mut c = Character::new(0, 30);
        assert_eq!(scaled_xp(50, 0, 0, &clock, &c), 50);
        assert_eq!(scaled_xp(50, 10, 10, &clock, &c), 60);
        assert_eq!(scaled_xp(100, -5, 0, &clock, &c), 95);

        clock.grant_xp_buff(&mut c, 1800);
        assert_eq!(scaled_xp(50, 0, 0, &clock, &c), 75);
        c.effects.xp_penalty = true;
        // 50 * 1.5 * 0.5 * 1.1 = 41.25
        assert_eq!(scaled_xp(50, 10, 0, &clock, &c), 41);

        let expired = EffectClock::at(clock.now() + Duration::seconds(1800));
        assert_eq!(scaled_xp(50, 0, 0, &expired, &c), 25);
    }

    #[test]
    fn level_up_consumes_threshold_and_heals() {
        let content = GameContent::builtin();
        let mut c = Character::new(0, 3);
        c.xp = 350;
        assert!(try_level_up(&mut c, &content));
        // 350 - 100 (L1) - 200 (L2) = 50 at level 3
        assert_eq!(c.level, 3);
        assert_eq!(c.xp, 50);
        assert_eq!(c.current_hp, stats::base_max_hp(3));
        assert!(!try_level_up(&mut c, &content));
    }

    #[test]
    fn xp_stays_below_threshold_after_any_gain() {
        let content = GameContent::builtin();
        let clock = clock();
        let mut c = Character::new(0, 30);
        for raw in [0u64, 1, 99, 100, 250, 1_000, 12_345, 99_999] {
            apply_xp(&mut c, raw, 10, 10, &clock);
            try_level_up(&mut c, &content);
            assert!(c.xp < xp_threshold(c.level), "xp {} level {}", c.xp, c.level);
        }
    }

    #[test]
    fn defeat_penalty_floors_and_never_underflows() {
        let mut c = Character::new(0, 30);
        c.xp = 19;
        assert_eq!(apply_defeat_penalty(&mut c), 1);
        assert_eq!(c.xp, 18);
        c.xp = 0;
        assert_eq!(apply_defeat_penalty(&mut c), 0);
        assert_eq!(c.xp, 0);
    }
}
