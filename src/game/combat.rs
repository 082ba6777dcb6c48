//! Combat engine: PvE encounters and PvP duels.
//!
//! Both loops are plain state machines advanced one step at a time, so tests can drive them
//! round by round. [`fight_monster`] and [`fight_duel`] run a loop to completion and apply the
//! outcome to the characters involved. Neither touches storage or cooldowns; the engine does
//! that around them.
//!
//! Every loop is bounded by a round ceiling. A PvE fight that reaches it is a loss; a duel that
//! reaches it goes to the side with more HP left, or to the side that struck second on a tie.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::game::content::{GameContent, MonsterTemplate};
use crate::game::effects::EffectClock;
use crate::game::progression;
use crate::game::stats;
use crate::game::types::Character;

/// Everything needed to roll one swing for a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackProfile {
    pub level: u32,
    pub min_bonus: i64,
    pub max_bonus: i64,
    pub multiplier_pct: i64,
}

impl AttackProfile {
    pub fn of(character: &Character, content: &GameContent, clock: &EffectClock) -> Self {
        let bonuses = stats::equipment_bonuses(character, content);
        Self {
            level: character.level,
            min_bonus: bonuses.min_attack,
            max_bonus: bonuses.max_attack,
            multiplier_pct: clock.attack_multiplier_pct(character),
        }
    }

    /// `floor((damage_roll + uniform(min_bonus, max_bonus)) * multiplier)`.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        let base = stats::damage_roll(self.level, rng);
        let bonus = if self.max_bonus > self.min_bonus {
            rng.gen_range(self.min_bonus..=self.max_bonus)
        } else {
            self.min_bonus
        };
        ((base + bonus) * self.multiplier_pct).div_euclid(100)
    }
}

/// Pick the monster for a fight.
///
/// A name that matches the roster (case-insensitively) is used as is. Otherwise every common
/// monster is eligible and each rare one joins with probability `rare_chance`; the pick is
/// uniform over the eligible set, or over the whole roster if nothing qualified.
pub fn select_monster<'a, R: Rng + ?Sized>(
    content: &'a GameContent,
    requested: Option<&str>,
    rare_chance: f64,
    rng: &mut R,
) -> Option<&'a MonsterTemplate> {
    if let Some(found) = requested.and_then(|name| content.monster(name)) {
        return Some(found);
    }
    let rare_chance = rare_chance.clamp(0.0, 1.0);
    let eligible: Vec<&MonsterTemplate> = content
        .monsters()
        .iter()
        .filter(|m| !m.rare || rng.gen_bool(rare_chance))
        .collect();
    if eligible.is_empty() {
        return content.monsters().choose(rng);
    }
    eligible.choose(rng).copied()
}

/// A monster template scaled to the player's level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaledMonster {
    pub name: String,
    pub hp: i64,
    pub attack: i64,
}

impl ScaledMonster {
    /// Scale by `1 + (level - 1) * 0.25`, truncated.
    pub fn scale(template: &MonsterTemplate, level: u32) -> Self {
        let factor = 3 + i64::from(level.max(1));
        Self {
            name: template.name.clone(),
            hp: template.base_hp * factor / 4,
            attack: template.base_attack * factor / 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterState {
    InProgress,
    Won,
    Lost,
}

/// One PvE fight in progress.
#[derive(Debug, Clone)]
pub struct Encounter {
    attack: AttackProfile,
    monster: ScaledMonster,
    monster_hp: i64,
    player_hp: i64,
    rounds: u32,
    state: EncounterState,
}

impl Encounter {
    pub fn begin(attack: AttackProfile, player_hp: i64, monster: ScaledMonster) -> Self {
        let state = if player_hp <= 0 {
            EncounterState::Lost
        } else {
            EncounterState::InProgress
        };
        Self {
            attack,
            monster_hp: monster.hp,
            monster,
            player_hp,
            rounds: 0,
            state,
        }
    }

    pub fn state(&self) -> EncounterState {
        self.state
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn player_hp(&self) -> i64 {
        self.player_hp
    }

    pub fn monster_hp(&self) -> i64 {
        self.monster_hp
    }

    /// Player swings; if the monster survives it hits back.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> EncounterState {
        if self.state != EncounterState::InProgress {
            return self.state;
        }
        self.rounds += 1;
        self.monster_hp -= self.attack.roll(rng);
        if self.monster_hp <= 0 {
            self.state = EncounterState::Won;
            return self.state;
        }
        self.player_hp -= self.monster.attack;
        if self.player_hp <= 0 {
            self.state = EncounterState::Lost;
        }
        self.state
    }

    /// Step until the fight ends or `max_rounds` is reached; the ceiling counts as a loss.
    pub fn run<R: Rng + ?Sized>(&mut self, max_rounds: u32, rng: &mut R) -> EncounterState {
        while self.state == EncounterState::InProgress {
            if self.rounds >= max_rounds {
                log::debug!(
                    "encounter with {} hit the {} round ceiling",
                    self.monster.name,
                    max_rounds
                );
                self.state = EncounterState::Lost;
                break;
            }
            self.step(rng);
        }
        self.state
    }
}

/// What happened in a PvE fight, after rewards or penalties were applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FightReport {
    pub monster: ScaledMonster,
    pub won: bool,
    pub rounds: u32,
    pub xp_gained: u64,
    pub gold_gained: u64,
    pub loot: Option<String>,
    pub xp_lost: u64,
    pub leveled_up: bool,
    pub level: u32,
    pub hp: i64,
    pub max_hp: i64,
}

fn roll_range<R: Rng + ?Sized>((lo, hi): (u64, u64), rng: &mut R) -> u64 {
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        lo
    }
}

/// Run a PvE encounter against `template` and settle the result on `character`.
pub fn fight_monster<R: Rng + ?Sized>(
    character: &mut Character,
    template: &MonsterTemplate,
    content: &GameContent,
    clock: &EffectClock,
    max_rounds: u32,
    rng: &mut R,
) -> FightReport {
    let monster = ScaledMonster::scale(template, character.level);
    let attack = AttackProfile::of(character, content, clock);
    let mut encounter = Encounter::begin(attack, character.current_hp, monster.clone());
    let state = encounter.run(max_rounds, rng);
    let max_hp = stats::max_hp(character, content);

    let mut report = FightReport {
        monster,
        won: state == EncounterState::Won,
        rounds: encounter.rounds(),
        xp_gained: 0,
        gold_gained: 0,
        loot: None,
        xp_lost: 0,
        leveled_up: false,
        level: character.level,
        hp: 0,
        max_hp,
    };

    if report.won {
        report.xp_gained = roll_range(template.xp_reward, rng);
        report.gold_gained = roll_range(template.gold_reward, rng);
        character.xp = character.xp.saturating_add(report.xp_gained);
        character.gold = character.gold.saturating_add(report.gold_gained);
        if !template.loot.is_empty() && rng.gen_bool(template.loot_chance.clamp(0.0, 1.0)) {
            report.loot = template.loot.choose(rng).cloned();
        }
        if let Some(item) = &report.loot {
            character.add_item(item.clone());
        }
        character.current_hp = (encounter.player_hp() + max_hp / 2).min(max_hp);
        report.leveled_up = progression::try_level_up(character, content);
    } else {
        report.xp_lost = progression::apply_defeat_penalty(character);
        character.current_hp = max_hp / 2;
    }

    report.level = character.level;
    report.hp = character.current_hp;
    report.max_hp = stats::max_hp(character, content);
    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Challenger,
    Defender,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Challenger => Side::Defender,
            Side::Defender => Side::Challenger,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Challenger => 0,
            Side::Defender => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuelVerdict {
    pub winner: Side,
    pub by_ceiling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelState {
    Resolving,
    Resolved(DuelVerdict),
}

/// A duel between two characters, one strike per step, strictly alternating.
#[derive(Debug, Clone)]
pub struct Duel {
    attack: [AttackProfile; 2],
    hp: [i64; 2],
    first: Side,
    next: Side,
    strikes: u32,
    state: DuelState,
}

impl Duel {
    pub fn begin(
        challenger: (AttackProfile, i64),
        defender: (AttackProfile, i64),
        first: Side,
    ) -> Self {
        Self {
            attack: [challenger.0, defender.0],
            hp: [challenger.1, defender.1],
            first,
            next: first,
            strikes: 0,
            state: DuelState::Resolving,
        }
    }

    pub fn state(&self) -> DuelState {
        self.state
    }

    pub fn hp(&self, side: Side) -> i64 {
        self.hp[side.index()]
    }

    pub fn first_striker(&self) -> Side {
        self.first
    }

    /// Full rounds started so far; a round is one strike from each side.
    pub fn rounds(&self) -> u32 {
        self.strikes.div_ceil(2)
    }

    pub fn strike<R: Rng + ?Sized>(&mut self, rng: &mut R) -> DuelState {
        if self.state != DuelState::Resolving {
            return self.state;
        }
        let attacker = self.next;
        let target = attacker.other();
        let damage = self.attack[attacker.index()].roll(rng);
        self.hp[target.index()] -= damage;
        self.strikes += 1;
        self.next = target;
        if self.hp[target.index()] <= 0 {
            self.state = DuelState::Resolved(DuelVerdict {
                winner: attacker,
                by_ceiling: false,
            });
        }
        self.state
    }

    /// Strike until someone drops or `max_rounds` full rounds have passed.
    pub fn run<R: Rng + ?Sized>(&mut self, max_rounds: u32, rng: &mut R) -> DuelVerdict {
        let limit = max_rounds.saturating_mul(2);
        loop {
            if let DuelState::Resolved(verdict) = self.state {
                return verdict;
            }
            if self.strikes >= limit {
                let (c, d) = (self.hp[0], self.hp[1]);
                let winner = if c > d {
                    Side::Challenger
                } else if d > c {
                    Side::Defender
                } else {
                    self.first.other()
                };
                self.state = DuelState::Resolved(DuelVerdict {
                    winner,
                    by_ceiling: true,
                });
                continue;
            }
            self.strike(rng);
        }
    }
}

/// One participant handed to [`fight_duel`].
pub struct Duelist<'a> {
    pub id: &'a str,
    pub character: &'a mut Character,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuelReport {
    pub winner: String,
    pub loser: String,
    pub first_striker: String,
    pub rounds: u32,
    pub decided_by_ceiling: bool,
    pub stake: u64,
    pub xp_awarded: u64,
    pub gold_awarded: u64,
    pub winner_leveled_up: bool,
    pub winner_hp: i64,
    pub loser_hp: i64,
}

/// Run a duel to completion and settle it on both characters.
///
/// The stake must already be escrowed from both sides; the winner is paid twice the stake.
pub fn fight_duel<R: Rng + ?Sized>(
    challenger: Duelist<'_>,
    defender: Duelist<'_>,
    stake: u64,
    content: &GameContent,
    clock: &EffectClock,
    max_rounds: u32,
    rng: &mut R,
) -> DuelReport {
    let first = if rng.gen_bool(0.5) {
        Side::Challenger
    } else {
        Side::Defender
    };
    let mut duel = Duel::begin(
        (
            AttackProfile::of(challenger.character, content, clock),
            challenger.character.current_hp,
        ),
        (
            AttackProfile::of(defender.character, content, clock),
            defender.character.current_hp,
        ),
        first,
    );
    let DuelVerdict { winner: side, by_ceiling } = duel.run(max_rounds, rng);

    let first_striker = match first {
        Side::Challenger => challenger.id,
        Side::Defender => defender.id,
    }
    .to_string();
    let remaining = duel.hp(side);
    let (winner, loser) = match side {
        Side::Challenger => (challenger, defender),
        Side::Defender => (defender, challenger),
    };

    let winner_max = stats::max_hp(winner.character, content);
    winner.character.current_hp = remaining.max(1).min(winner_max);
    let loser_max = stats::max_hp(loser.character, content);
    loser.character.current_hp = loser_max / 2;

    let xp_awarded = 10 * u64::from(loser.character.level);
    let gold_awarded = stake.saturating_mul(2);
    winner.character.xp = winner.character.xp.saturating_add(xp_awarded);
    winner.character.gold = winner.character.gold.saturating_add(gold_awarded);
    winner.character.pvp_wins += 1;
    loser.character.pvp_losses += 1;
    let winner_leveled_up = progression::try_level_up(winner.character, content);

    DuelReport {
        winner: winner.id.to_string(),
        loser: loser.id.to_string(),
        first_striker,
        rounds: duel.rounds(),
        decided_by_ceiling: by_ceiling,
        stake,
        xp_awarded,
        gold_awarded,
        winner_leveled_up,
        winner_hp: winner.character.current_hp,
        loser_hp: loser.character.current_hp,
    }
}
