//! Effect clock: evaluates buffs, debuffs, imprisonment and cooldowns against one `now`.
//!
//! The clock never reads the system time. Callers pass the request timestamp in, so a
//! whole request sees a single instant and tests can pin time exactly. Expired effects are
//! not cleared; a stale timestamp in the past simply reads as inactive.

use chrono::{DateTime, Duration, Utc};

use crate::game::errors::GameError;
use crate::game::types::{Character, CooldownKey};

/// Attack multiplier in percent while the tavern buff is active.
pub const ATTACK_BUFF_PCT: i64 = 110;
/// XP multiplier in percent while the XP buff is active.
pub const XP_BUFF_PCT: i64 = 150;
/// XP multiplier in percent while the XP penalty is flagged.
pub const XP_PENALTY_PCT: i64 = 50;
/// Longest window any effect or cooldown may run, ten years in seconds.
pub const MAX_EFFECT_SECS: i64 = 10 * 365 * 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectClock {
    now: DateTime<Utc>,
}

fn secs_until(now: DateTime<Utc>, until: Option<DateTime<Utc>>) -> i64 {
    until
        .map(|t| t.signed_duration_since(now).num_seconds())
        .unwrap_or(0)
        .max(0)
}

fn active(now: DateTime<Utc>, until: Option<DateTime<Utc>>) -> bool {
    until.is_some_and(|t| now < t)
}

impl EffectClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn is_imprisoned(&self, c: &Character) -> bool {
        c.effects.imprisoned && active(self.now, c.effects.prison_until)
    }

    pub fn prison_remaining(&self, c: &Character) -> i64 {
        if self.is_imprisoned(c) {
            secs_until(self.now, c.effects.prison_until)
        } else {
            0
        }
    }

    pub fn has_xp_buff(&self, c: &Character) -> bool {
        active(self.now, c.effects.xp_buff_until)
    }

    pub fn xp_buff_remaining(&self, c: &Character) -> i64 {
        secs_until(self.now, c.effects.xp_buff_until)
    }

    pub fn has_xp_penalty(&self, c: &Character) -> bool {
        c.effects.xp_penalty
    }

    pub fn has_attack_buff(&self, c: &Character) -> bool {
        active(self.now, c.effects.attack_buff_until)
    }

    pub fn attack_buff_remaining(&self, c: &Character) -> i64 {
        secs_until(self.now, c.effects.attack_buff_until)
    }

    /// Damage multiplier in percent: 110 with the attack buff, else 100.
    pub fn attack_multiplier_pct(&self, c: &Character) -> i64 {
        if self.has_attack_buff(c) {
            ATTACK_BUFF_PCT
        } else {
            100
        }
    }

    /// Fail with [`GameError::Imprisoned`] while the prison window is open.
    pub fn ensure_free(&self, c: &Character) -> Result<(), GameError> {
        if self.is_imprisoned(c) {
            return Err(GameError::Imprisoned {
                remaining_secs: self.prison_remaining(c),
            });
        }
        Ok(())
    }

    /// Seconds left before `action` may run again; `<= 0` means permitted.
    pub fn cooldown_remaining(&self, c: &Character, action: CooldownKey, cooldown_secs: i64) -> i64 {
        match c.cooldowns.get(&action) {
            Some(last) => {
                cooldown_secs.saturating_sub(self.now.signed_duration_since(*last).num_seconds())
            }
            None => 0,
        }
    }

    /// Check the cooldown and stamp `now` on success.
    ///
    /// The stamp is taken at check time even if the caller fails afterwards.
    pub fn consume_cooldown(
        &self,
        c: &mut Character,
        action: CooldownKey,
        cooldown_secs: i64,
    ) -> Result<(), GameError> {
        let remaining = self.cooldown_remaining(c, action, cooldown_secs);
        if remaining > 0 {
            return Err(GameError::CooldownActive {
                action,
                remaining_secs: remaining,
            });
        }
        c.cooldowns.insert(action, self.now);
        Ok(())
    }

    /// `now + secs`, with `secs` clamped to `0..=MAX_EFFECT_SECS` and saturating at the
    /// latest representable instant.
    fn until(&self, secs: i64) -> DateTime<Utc> {
        let secs = secs.clamp(0, MAX_EFFECT_SECS);
        self.now
            .checked_add_signed(Duration::seconds(secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn imprison(&self, c: &mut Character, secs: i64) {
        c.effects.imprisoned = true;
        c.effects.prison_until = Some(self.until(secs));
    }

    pub fn release(&self, c: &mut Character) {
        c.effects.imprisoned = false;
        c.effects.prison_until = None;
    }

    pub fn grant_xp_buff(&self, c: &mut Character, secs: i64) {
        c.effects.xp_buff_until = Some(self.until(secs));
    }

    pub fn grant_attack_buff(&self, c: &mut Character, secs: i64) {
        c.effects.attack_buff_until = Some(self.until(secs));
    }
}
