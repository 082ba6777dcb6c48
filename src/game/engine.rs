//! Request dispatcher: one [`Request`] in, one [`Outcome`] (or [`GameError`]) out.
//!
//! `GameEngine` owns every piece of mutable game state: the character store, the duel
//! registry and the black-market stock. `handle` takes `&mut self`, so requests are
//! serialized by construction. After any request that changes a character the store is
//! saved before the outcome is returned.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

use crate::config::{Config, GameRules};
use crate::game::combat::{self, Duelist};
use crate::game::content::GameContent;
use crate::game::duel::{DuelChallenge, DuelRegistry};
use crate::game::effects::EffectClock;
use crate::game::errors::GameError;
use crate::game::market::BlackMarket;
use crate::game::outcome::{ActiveEffects, Gift, LeaderboardEntry, Outcome, StatusView};
use crate::game::progression;
use crate::game::seed_loader;
use crate::game::stats;
use crate::game::storage::CharacterStore;
use crate::game::types::{Character, Class, CooldownKey, Race, Slot};
use crate::validation::{join_args, log_safe, normalize_handle, parse_amount};

/// Everything a player can ask the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Start,
    Status,
    Inventory,
    Equipment,
    Xp,
    Equip,
    Unequip,
    Use,
    Fight,
    Top,
    Duel,
    Accept,
    Cancel,
    Pvp,
    Describe,
    Carouse,
    Cure,
    Sell,
    Appraise,
    Steal,
    Bribe,
    Tavern,
    Race,
    Class,
    Rest,
    Gift,
    Market,
    Buy,
}

impl Intent {
    pub const ALL: [Intent; 28] = [
        Intent::Start,
        Intent::Status,
        Intent::Inventory,
        Intent::Equipment,
        Intent::Xp,
        Intent::Equip,
        Intent::Unequip,
        Intent::Use,
        Intent::Fight,
        Intent::Top,
        Intent::Duel,
        Intent::Accept,
        Intent::Cancel,
        Intent::Pvp,
        Intent::Describe,
        Intent::Carouse,
        Intent::Cure,
        Intent::Sell,
        Intent::Appraise,
        Intent::Steal,
        Intent::Bribe,
        Intent::Tavern,
        Intent::Race,
        Intent::Class,
        Intent::Rest,
        Intent::Gift,
        Intent::Market,
        Intent::Buy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Start => "start",
            Intent::Status => "status",
            Intent::Inventory => "inventory",
            Intent::Equipment => "equipment",
            Intent::Xp => "xp",
            Intent::Equip => "equip",
            Intent::Unequip => "unequip",
            Intent::Use => "use",
            Intent::Fight => "fight",
            Intent::Top => "top",
            Intent::Duel => "duel",
            Intent::Accept => "accept",
            Intent::Cancel => "cancel",
            Intent::Pvp => "pvp",
            Intent::Describe => "describe",
            Intent::Carouse => "carouse",
            Intent::Cure => "cure",
            Intent::Sell => "sell",
            Intent::Appraise => "appraise",
            Intent::Steal => "steal",
            Intent::Bribe => "bribe",
            Intent::Tavern => "tavern",
            Intent::Race => "race",
            Intent::Class => "class",
            Intent::Rest => "rest",
            Intent::Gift => "gift",
            Intent::Market => "market",
            Intent::Buy => "buy",
        }
    }

    /// Whether a successful request changes persisted character state.
    pub fn persists(self) -> bool {
        !matches!(
            self,
            Intent::Status
                | Intent::Inventory
                | Intent::Equipment
                | Intent::Top
                | Intent::Duel
                | Intent::Cancel
                | Intent::Pvp
                | Intent::Describe
                | Intent::Appraise
                | Intent::Market
        )
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_lowercase();
        let intent = match word.as_str() {
            "inv" | "bag" => Intent::Inventory,
            "gear" | "eq" => Intent::Equipment,
            "stats" => Intent::Status,
            "hunt" => Intent::Fight,
            "leaderboard" => Intent::Top,
            "challenge" => Intent::Duel,
            "info" | "look" => Intent::Describe,
            "brothel" => Intent::Carouse,
            "prison" => Intent::Bribe,
            "heal" => Intent::Rest,
            "blackmarket" | "shop" => Intent::Market,
            other => {
                return Intent::ALL
                    .into_iter()
                    .find(|i| i.as_str() == other)
                    .ok_or_else(|| format!("unknown command '{}'", log_safe(s.trim())))
            }
        };
        Ok(intent)
    }
}

/// A parsed player request. `now` is supplied by the caller and used for every time check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub actor: String,
    pub intent: Intent,
    pub args: Vec<String>,
    pub now: DateTime<Utc>,
}

impl Request {
    pub fn new<A, I, S>(actor: A, intent: Intent, args: I, now: DateTime<Utc>) -> Self
    where
        A: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actor: actor.into(),
            intent,
            args: args.into_iter().map(Into::into).collect(),
            now,
        }
    }
}

fn arg(args: &[String], index: usize) -> Option<&str> {
    args.get(index).map(String::as_str)
}

fn required<'a>(args: &'a [String], index: usize, what: &str) -> Result<&'a str, GameError> {
    arg(args, index).ok_or_else(|| GameError::InvalidArgument(format!("missing {}", what)))
}

fn required_rest(args: &[String], from: usize, what: &str) -> Result<String, GameError> {
    join_args(args.get(from..).unwrap_or_default())
        .ok_or_else(|| GameError::InvalidArgument(format!("missing {}", what)))
}

fn status_view(id: &str, c: &Character, content: &GameContent, clock: &EffectClock) -> StatusView {
    let active = |secs: i64| (secs > 0).then_some(secs);
    StatusView {
        id: id.to_string(),
        level: c.level,
        xp: c.xp,
        xp_to_next: progression::xp_threshold(c.level),
        gold: c.gold,
        hp: c.current_hp,
        max_hp: stats::max_hp(c, content),
        damage: stats::damage_range(c, content),
        race: c.race,
        class: c.class,
        effects: ActiveEffects {
            xp_buff_secs: active(clock.xp_buff_remaining(c)),
            xp_penalty: clock.has_xp_penalty(c),
            attack_buff_secs: active(clock.attack_buff_remaining(c)),
            prison_secs: active(clock.prison_remaining(c)),
        },
    }
}

pub struct GameEngine {
    store: CharacterStore,
    duels: DuelRegistry,
    market: BlackMarket,
    content: GameContent,
    rules: GameRules,
    rng: StdRng,
    /// Set when a failed request still changed a record (an eagerly stamped cooldown).
    dirty: bool,
}

impl GameEngine {
    pub fn new(store: CharacterStore, content: GameContent, rules: GameRules) -> Self {
        Self::with_rng(store, content, rules, StdRng::from_entropy())
    }

    /// Deterministic engine for tests and replays.
    pub fn with_seed(store: CharacterStore, content: GameContent, rules: GameRules, seed: u64) -> Self {
        Self::with_rng(store, content, rules, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: CharacterStore, content: GameContent, rules: GameRules, rng: StdRng) -> Self {
        Self {
            store,
            duels: DuelRegistry::new(),
            market: BlackMarket::new(),
            content,
            rules,
            rng,
            dirty: false,
        }
    }

    /// Load content and characters as described by `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let content = match &config.storage.content_dir {
            Some(dir) => seed_loader::load_content_dir(dir)
                .map_err(|e| anyhow::anyhow!("Failed to load content from {}: {}", dir, e))?,
            None => GameContent::builtin(),
        };
        let store = CharacterStore::open(config.storage.save_path(), &content);
        Ok(Self::new(store, content, config.game.clone()))
    }

    pub fn store(&self) -> &CharacterStore {
        &self.store
    }

    pub fn duels(&self) -> &DuelRegistry {
        &self.duels
    }

    pub fn content(&self) -> &GameContent {
        &self.content
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn save(&self) -> Result<(), GameError> {
        self.store.save().map_err(|e| {
            log::error!("Failed to save characters to {}: {}", self.store.path().display(), e);
            GameError::StorageFailure(e)
        })
    }

    /// Process one request to completion.
    pub fn handle(&mut self, req: &Request) -> Result<Outcome, GameError> {
        let actor = normalize_handle(&req.actor)?;
        let clock = EffectClock::at(req.now);
        log::trace!("{} -> {} {:?}", actor, req.intent, req.args);

        self.dirty = false;
        let result = self.dispatch(&actor, req.intent, &req.args, &clock);

        let changed = match &result {
            Ok(_) => req.intent.persists(),
            Err(_) => self.dirty,
        };
        if changed {
            if let Err(e) = self.save() {
                if result.is_ok() {
                    return Err(e);
                }
            }
        }
        if let Err(e) = &result {
            log::debug!("{} {} rejected: {}", actor, req.intent, e);
        }
        result
    }

    fn dispatch(
        &mut self,
        actor: &str,
        intent: Intent,
        args: &[String],
        clock: &EffectClock,
    ) -> Result<Outcome, GameError> {
        match intent {
            Intent::Start => self.start(actor, clock),
            Intent::Status => self.status(actor, args, clock),
            Intent::Inventory => self.inventory(actor),
            Intent::Equipment => self.equipment(actor),
            Intent::Xp => self.gain_xp(actor, clock),
            Intent::Equip => self.equip(actor, args),
            Intent::Unequip => self.unequip(actor, args),
            Intent::Use => self.use_item(actor, args),
            Intent::Fight => self.fight(actor, args, clock),
            Intent::Top => Ok(self.top()),
            Intent::Duel => self.challenge(actor, args, clock),
            Intent::Accept => self.accept(actor, clock),
            Intent::Cancel => Ok(self.cancel(actor)),
            Intent::Pvp => self.pvp(actor),
            Intent::Describe => self.describe(actor, args),
            Intent::Carouse => self.carouse(actor, clock),
            Intent::Cure => self.cure(actor),
            Intent::Sell => self.sell(actor, args),
            Intent::Appraise => self.appraise(actor, args),
            Intent::Steal => self.steal(actor, args, clock),
            Intent::Bribe => self.bribe(actor, clock),
            Intent::Tavern => self.tavern(actor, clock),
            Intent::Race => self.choose_race(actor, args),
            Intent::Class => self.choose_class(actor, args),
            Intent::Rest => self.rest(actor),
            Intent::Gift => self.gift(actor, args),
            Intent::Market => Ok(self.show_market(clock)),
            Intent::Buy => self.buy(actor, args),
        }
    }

    fn character(&self, id: &str) -> Result<&Character, GameError> {
        self.store
            .get(id)
            .ok_or_else(|| GameError::NotFound(id.to_string()))
    }

    fn character_mut(&mut self, id: &str) -> Result<&mut Character, GameError> {
        self.store
            .get_mut(id)
            .ok_or_else(|| GameError::NotFound(id.to_string()))
    }

    fn cooldown_secs(&self, key: CooldownKey) -> i64 {
        match key {
            CooldownKey::Xp => self.rules.xp_cooldown_secs,
            CooldownKey::Fight => self.rules.fight_cooldown_secs,
            CooldownKey::Pvp => self.rules.pvp_cooldown_secs,
            CooldownKey::Steal => self.rules.steal_cooldown_secs,
        }
    }

    fn start(&mut self, actor: &str, clock: &EffectClock) -> Result<Outcome, GameError> {
        let character = Character::new(self.rules.starting_gold, stats::base_max_hp(1));
        let created = self.store.create(actor, character)?;
        let status = status_view(actor, created, &self.content, clock);
        log::info!("Created character for {}", actor);
        Ok(Outcome::Created {
            id: actor.to_string(),
            status,
        })
    }

    fn status(&self, actor: &str, args: &[String], clock: &EffectClock) -> Result<Outcome, GameError> {
        let id = match arg(args, 0) {
            Some(target) => normalize_handle(target)?,
            None => actor.to_string(),
        };
        let c = self.character(&id)?;
        Ok(Outcome::Status(status_view(&id, c, &self.content, clock)))
    }

    fn inventory(&self, actor: &str) -> Result<Outcome, GameError> {
        let c = self.character(actor)?;
        Ok(Outcome::Inventory {
            items: c.item_counts(),
        })
    }

    fn equipment(&self, actor: &str) -> Result<Outcome, GameError> {
        let c = self.character(actor)?;
        Ok(Outcome::Equipment {
            slots: c
                .equipment
                .iter()
                .map(|(slot, item)| (slot, item.map(str::to_string)))
                .collect(),
        })
    }

    fn gain_xp(&mut self, actor: &str, clock: &EffectClock) -> Result<Outcome, GameError> {
        let cooldown = self.cooldown_secs(CooldownKey::Xp);
        let raw = self.rules.xp_command_amount;
        let content = &self.content;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        clock.consume_cooldown(c, CooldownKey::Xp, cooldown)?;
        let race = content.race_bonus(c.race).xp_bonus_pct;
        let class = content.class_bonus(c.class).xp_bonus_pct;
        let gained = progression::apply_xp(c, raw, race, class, clock);
        let leveled_up = progression::try_level_up(c, content);
        log::info!("{} gained {} XP (level {})", actor, gained, c.level);
        Ok(Outcome::XpGained {
            gained,
            leveled_up,
            level: c.level,
            xp: c.xp,
        })
    }

    fn equip(&mut self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let wanted = required_rest(args, 0, "item name")?;
        let content = &self.content;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        if !c.holds(&wanted) {
            return Err(GameError::InsufficientQuantity(wanted));
        }
        let def = content
            .item(&wanted)
            .filter(|d| d.slot.is_equippable())
            .ok_or_else(|| GameError::NotApplicable(format!("{} cannot be equipped", wanted)))?;
        if c.equipment.get(def.slot) == Some(def.name.as_str()) {
            return Err(GameError::NotApplicable(format!("{} is already equipped", def.name)));
        }
        c.take_item(&wanted);
        let replaced = c.equipment.replace(def.slot, def.name.clone());
        if let Some(previous) = &replaced {
            c.add_item(previous.clone());
        }
        let max_hp = stats::clamp_hp(c, content);
        log::info!("{} equipped {} in {}", actor, def.name, def.slot);
        Ok(Outcome::Equipped {
            item: def.name.clone(),
            slot: def.slot,
            replaced,
            hp: c.current_hp,
            max_hp,
        })
    }

    fn unequip(&mut self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let slot: Slot = required(args, 0, "slot")?
            .parse()
            .map_err(GameError::InvalidArgument)?;
        let content = &self.content;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        let item = c
            .equipment
            .take(slot)
            .ok_or_else(|| GameError::NotApplicable(format!("nothing equipped in {}", slot)))?;
        c.add_item(item.clone());
        let max_hp = stats::clamp_hp(c, content);
        log::info!("{} unequipped {} from {}", actor, item, slot);
        Ok(Outcome::Unequipped {
            item,
            slot,
            hp: c.current_hp,
            max_hp,
        })
    }

    fn use_item(&mut self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let wanted = required_rest(args, 0, "item name")?;
        let content = &self.content;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        if !c.holds(&wanted) {
            return Err(GameError::InsufficientQuantity(wanted));
        }
        let (name, heal) = content
            .item(&wanted)
            .filter(|d| d.slot == Slot::Consumable)
            .and_then(|d| d.effect.heal.map(|h| (d.name.clone(), h)))
            .ok_or_else(|| GameError::NotApplicable(format!("{} cannot be used", wanted)))?;
        let max_hp = stats::max_hp(c, content);
        let before = c.current_hp;
        c.current_hp = (c.current_hp + heal).min(max_hp);
        c.take_item(&wanted);
        let healed = c.current_hp - before;
        log::info!("{} used {} (+{} HP)", actor, name, healed);
        Ok(Outcome::ItemUsed {
            item: name,
            healed,
            hp: c.current_hp,
            max_hp,
        })
    }

    fn fight(&mut self, actor: &str, args: &[String], clock: &EffectClock) -> Result<Outcome, GameError> {
        let cooldown = self.cooldown_secs(CooldownKey::Fight);
        let rare_chance = f64::from(self.rules.rare_monster_pct) / 100.0;
        let max_rounds = self.rules.max_combat_rounds;
        let requested = join_args(args);
        let content = &self.content;
        let rng = &mut self.rng;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        clock.ensure_free(c)?;
        clock.consume_cooldown(c, CooldownKey::Fight, cooldown)?;
        self.dirty = true;

        let template = combat::select_monster(content, requested.as_deref(), rare_chance, rng)
            .ok_or_else(|| GameError::NotFound("monster".to_string()))?;
        let report = combat::fight_monster(c, template, content, clock, max_rounds, rng);
        if report.won {
            log::info!(
                "{} defeated {} in {} rounds: +{} XP, +{} gold, loot {:?}",
                actor,
                report.monster.name,
                report.rounds,
                report.xp_gained,
                report.gold_gained,
                report.loot
            );
        } else {
            log::info!(
                "{} lost to {} after {} rounds, -{} XP",
                actor,
                report.monster.name,
                report.rounds,
                report.xp_lost
            );
        }
        Ok(Outcome::Fight(report))
    }

    fn top(&self) -> Outcome {
        let entries = self
            .store
            .leaderboard(self.rules.leaderboard_size)
            .into_iter()
            .enumerate()
            .map(|(i, (id, c))| LeaderboardEntry {
                rank: i + 1,
                id: id.to_string(),
                level: c.level,
                xp: c.xp,
            })
            .collect();
        Outcome::Leaderboard { entries }
    }

    fn challenge(&mut self, actor: &str, args: &[String], clock: &EffectClock) -> Result<Outcome, GameError> {
        let defender = normalize_handle(required(args, 0, "opponent")?)?;
        let stake = match arg(args, 1) {
            Some(raw) => parse_amount(raw)?,
            None => 0,
        };
        if defender == actor {
            return Err(GameError::InvalidTarget("cannot duel yourself".to_string()));
        }
        let challenger = self.character(actor)?;
        self.character(&defender)?;
        if challenger.gold < stake {
            return Err(GameError::InsufficientFunds {
                needed: stake,
                available: challenger.gold,
            });
        }
        let challenge = self
            .duels
            .challenge(DuelChallenge {
                challenger: actor.to_string(),
                defender,
                stake,
                created_at: clock.now(),
            })?
            .clone();
        log::info!(
            "{} challenged {} (stake {})",
            challenge.challenger,
            challenge.defender,
            challenge.stake
        );
        Ok(Outcome::DuelChallenged(challenge))
    }

    fn accept(&mut self, actor: &str, clock: &EffectClock) -> Result<Outcome, GameError> {
        clock.ensure_free(self.character(actor)?)?;
        let challenge = self.duels.accept(actor)?;
        if !self.store.contains(&challenge.challenger) {
            log::warn!(
                "Dropping duel from {}: challenger no longer exists",
                challenge.challenger
            );
            return Err(GameError::NotFound(challenge.challenger));
        }

        let cooldown = self.cooldown_secs(CooldownKey::Pvp);
        let max_rounds = self.rules.max_combat_rounds;
        let stake = challenge.stake;
        let content = &self.content;
        let rng = &mut self.rng;
        let dirty = &mut self.dirty;
        let result = self.store.mutate_pair(
            &challenge.challenger,
            &challenge.defender,
            |challenger, defender| {
                clock.consume_cooldown(challenger, CooldownKey::Pvp, cooldown)?;
                *dirty = true;
                clock.consume_cooldown(defender, CooldownKey::Pvp, cooldown)?;
                if stake > 0 {
                    for side in [&*challenger, &*defender] {
                        if side.gold < stake {
                            return Err(GameError::InsufficientFunds {
                                needed: stake,
                                available: side.gold,
                            });
                        }
                    }
                    challenger.spend(stake)?;
                    defender.spend(stake)?;
                }
                Ok(combat::fight_duel(
                    Duelist {
                        id: &challenge.challenger,
                        character: challenger,
                    },
                    Duelist {
                        id: &challenge.defender,
                        character: defender,
                    },
                    stake,
                    content,
                    clock,
                    max_rounds,
                    rng,
                ))
            },
        );

        match result {
            Ok(report) => {
                log::info!(
                    "Duel: {} beat {} in {} rounds (+{} XP, +{} gold)",
                    report.winner,
                    report.loser,
                    report.rounds,
                    report.xp_awarded,
                    report.gold_awarded
                );
                Ok(Outcome::DuelResolved(report))
            }
            Err(e) => {
                log::info!(
                    "Duel {} vs {} aborted ({}); challenge restored",
                    challenge.challenger,
                    challenge.defender,
                    e
                );
                self.duels.restore(challenge);
                Err(e)
            }
        }
    }

    fn cancel(&mut self, actor: &str) -> Outcome {
        match self.duels.withdraw(actor) {
            Some((challenge, role)) => {
                log::info!(
                    "{} cancelled duel {} -> {}",
                    actor,
                    challenge.challenger,
                    challenge.defender
                );
                Outcome::DuelCancelled { challenge, role }
            }
            None => Outcome::NothingToCancel,
        }
    }

    fn pvp(&self, actor: &str) -> Result<Outcome, GameError> {
        let c = self.character(actor)?;
        let total = c.pvp_wins + c.pvp_losses;
        let win_rate_pct = if total == 0 { 0 } else { c.pvp_wins * 100 / total };
        Ok(Outcome::PvpRecord {
            wins: c.pvp_wins,
            losses: c.pvp_losses,
            win_rate_pct,
        })
    }

    fn describe(&self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let name = match join_args(args) {
            Some(name) => name,
            None => {
                let mut held = self.character(actor)?.distinct_items();
                match held.len() {
                    0 => return Err(GameError::NotApplicable("inventory is empty".to_string())),
                    1 => held.remove(0),
                    _ => return Ok(Outcome::DescribeChoices { items: held }),
                }
            }
        };
        let description = self
            .content
            .describe(&name)
            .ok_or_else(|| GameError::NotFound(name.clone()))?;
        let item = self
            .content
            .item(&name)
            .map(|d| d.name.clone())
            .unwrap_or(name);
        Ok(Outcome::ItemDescription {
            item,
            description: description.to_string(),
        })
    }

    fn carouse(&mut self, actor: &str, clock: &EffectClock) -> Result<Outcome, GameError> {
        let cost = self.rules.carouse_cost;
        let buff_secs = self.rules.carouse_buff_secs;
        let penalty_pct = self.rules.carouse_penalty_pct;
        let rng = &mut self.rng;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        if c.gold < cost {
            return Err(GameError::InsufficientFunds {
                needed: cost,
                available: c.gold,
            });
        }
        if clock.has_xp_buff(c) {
            return Err(GameError::EffectActive("xp buff"));
        }
        c.spend(cost)?;
        let penalized = rng.gen_range(0..100) < penalty_pct;
        if penalized {
            c.effects.xp_penalty = true;
            log::info!("{} caroused and caught an XP penalty", actor);
        } else {
            clock.grant_xp_buff(c, buff_secs);
            log::info!("{} caroused and gained an XP buff", actor);
        }
        Ok(Outcome::Caroused {
            cost,
            penalized,
            buff_secs: if penalized { 0 } else { buff_secs },
        })
    }

    fn cure(&mut self, actor: &str) -> Result<Outcome, GameError> {
        let cost = self.rules.cure_cost;
        let c = self.character_mut(actor)?;
        if !c.effects.xp_penalty {
            return Err(GameError::NotApplicable("no XP penalty to cure".to_string()));
        }
        c.spend(cost)?;
        c.effects.xp_penalty = false;
        log::info!("{} cured the XP penalty", actor);
        Ok(Outcome::Cured { cost })
    }

    fn sell(&mut self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let wanted = required_rest(args, 0, "item name")?;
        let content = &self.content;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        if !c.holds(&wanted) {
            return Err(GameError::InsufficientQuantity(wanted));
        }
        let price = content
            .item(&wanted)
            .and_then(|d| d.price)
            .ok_or_else(|| GameError::NotApplicable(format!("{} cannot be sold", wanted)))?
            / 2;
        let item = c.take_item(&wanted).unwrap_or(wanted);
        c.gold = c.gold.saturating_add(price);
        log::info!("{} sold {} for {}", actor, item, price);
        Ok(Outcome::Sold {
            item,
            price,
            gold: c.gold,
        })
    }

    fn appraise(&self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let wanted = required_rest(args, 0, "item name")?;
        let c = self.character(actor)?;
        if !c.holds(&wanted) {
            return Err(GameError::InsufficientQuantity(wanted));
        }
        let def = self
            .content
            .item(&wanted)
            .ok_or_else(|| GameError::NotApplicable(format!("{} has no market value", wanted)))?;
        Ok(Outcome::Appraised {
            item: def.name.clone(),
            value: (def.price.unwrap_or(0) / 2).max(1),
        })
    }

    fn steal(&mut self, actor: &str, args: &[String], clock: &EffectClock) -> Result<Outcome, GameError> {
        let target = normalize_handle(required(args, 0, "target")?)?;
        let wanted = required_rest(args, 1, "item name")?;
        if target == actor {
            return Err(GameError::InvalidTarget("cannot steal from yourself".to_string()));
        }
        let cooldown = self.cooldown_secs(CooldownKey::Steal);
        let prison_secs = self.rules.prison_secs;
        let base_pct = self.rules.steal_base_pct;
        let content = &self.content;
        let rng = &mut self.rng;
        let dirty = &mut self.dirty;

        self.store.mutate_pair(actor, &target, |thief, victim| {
            clock.ensure_free(thief)?;
            clock.consume_cooldown(thief, CooldownKey::Steal, cooldown)?;
            *dirty = true;
            if !victim.holds(&wanted) {
                return Err(GameError::InsufficientQuantity(format!(
                    "{} does not have {}",
                    target, wanted
                )));
            }
            let amulet_pct = thief
                .equipment
                .get(Slot::Amulet)
                .and_then(|name| content.item(name))
                .and_then(|d| d.effect.steal_chance_pct)
                .unwrap_or(0);
            let chance = base_pct + content.class_bonus(thief.class).steal_chance_pct + amulet_pct;
            if rng.gen_range(0..100) < chance {
                let item = victim.take_item(&wanted).unwrap_or(wanted);
                thief.add_item(item.clone());
                log::info!("{} stole {} from {}", actor, item, target);
                Ok(Outcome::Stolen {
                    item,
                    from: target.clone(),
                })
            } else {
                clock.imprison(thief, prison_secs);
                log::info!("{} was caught stealing from {} and jailed", actor, target);
                Ok(Outcome::CaughtStealing {
                    target: target.clone(),
                    prison_secs,
                })
            }
        })
    }

    fn bribe(&mut self, actor: &str, clock: &EffectClock) -> Result<Outcome, GameError> {
        let cost = self.rules.bribe_cost;
        let c = self.character_mut(actor)?;
        if !clock.is_imprisoned(c) {
            return Err(GameError::NotApplicable("not in prison".to_string()));
        }
        c.spend(cost)?;
        clock.release(c);
        log::info!("{} bribed their way out of prison", actor);
        Ok(Outcome::Bribed { cost })
    }

    fn tavern(&mut self, actor: &str, clock: &EffectClock) -> Result<Outcome, GameError> {
        let cost = self.rules.tavern_cost;
        let buff_secs = self.rules.tavern_buff_secs;
        let c = self.character_mut(actor)?;
        if clock.has_attack_buff(c) {
            return Err(GameError::EffectActive("attack buff"));
        }
        c.spend(cost)?;
        clock.grant_attack_buff(c, buff_secs);
        log::info!("{} bought an attack buff at the tavern", actor);
        Ok(Outcome::TavernBuff { cost, buff_secs })
    }

    fn choose_race(&mut self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let options = || Race::ALL.map(Race::as_str).join(", ");
        let race: Race = arg(args, 0)
            .ok_or_else(|| GameError::InvalidArgument(format!("choose a race: {}", options())))?
            .parse()
            .map_err(|e| GameError::InvalidArgument(format!("{}; choose from {}", e, options())))?;
        let content = &self.content;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        if let Some(current) = c.race {
            return Err(GameError::AlreadyChosen {
                what: "race",
                current: current.to_string(),
            });
        }
        c.race = Some(race);
        let max_hp = stats::heal_full(c, content);
        log::info!("{} chose race {}", actor, race);
        Ok(Outcome::RaceChosen {
            race,
            hp: c.current_hp,
            max_hp,
        })
    }

    fn choose_class(&mut self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let options = || Class::ALL.map(Class::as_str).join(", ");
        let class: Class = arg(args, 0)
            .ok_or_else(|| GameError::InvalidArgument(format!("choose a class: {}", options())))?
            .parse()
            .map_err(|e| GameError::InvalidArgument(format!("{}; choose from {}", e, options())))?;
        let content = &self.content;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        if let Some(current) = c.class {
            return Err(GameError::AlreadyChosen {
                what: "class",
                current: current.to_string(),
            });
        }
        c.class = Some(class);
        let max_hp = stats::heal_full(c, content);
        log::info!("{} chose class {}", actor, class);
        Ok(Outcome::ClassChosen {
            class,
            hp: c.current_hp,
            max_hp,
        })
    }

    fn rest(&mut self, actor: &str) -> Result<Outcome, GameError> {
        let cost = self.rules.rest_cost;
        let content = &self.content;
        let c = self
            .store
            .get_mut(actor)
            .ok_or_else(|| GameError::NotFound(actor.to_string()))?;
        if c.current_hp >= stats::max_hp(c, content) {
            return Err(GameError::NotApplicable("already at full health".to_string()));
        }
        c.spend(cost)?;
        let hp = stats::heal_full(c, content);
        log::info!("{} rested to full health", actor);
        Ok(Outcome::Rested { cost, hp })
    }

    fn gift(&mut self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let target = normalize_handle(required(args, 0, "recipient")?)?;
        if target == actor {
            return Err(GameError::InvalidTarget("cannot gift to yourself".to_string()));
        }
        // `gold` only names currency when an amount follows; "Gold Ring" is an item
        let amount = match (arg(args, 1), arg(args, 2)) {
            (Some(word), Some(raw)) if word.eq_ignore_ascii_case("gold") => parse_amount(raw).ok(),
            _ => None,
        };
        let gift = match amount {
            Some(0) => {
                return Err(GameError::InvalidArgument("amount must be positive".to_string()));
            }
            Some(amount) => Gift::Gold(amount),
            None => Gift::Item(required_rest(args, 1, "item name or 'gold <amount>'")?),
        };

        self.store.mutate_pair(actor, &target, |giver, receiver| {
            let gift = match gift {
                Gift::Gold(amount) => {
                    giver.spend(amount)?;
                    receiver.gold = receiver.gold.saturating_add(amount);
                    Gift::Gold(amount)
                }
                Gift::Item(wanted) => {
                    let item = giver
                        .take_item(&wanted)
                        .ok_or(GameError::InsufficientQuantity(wanted))?;
                    receiver.add_item(item.clone());
                    Gift::Item(item)
                }
            };
            log::info!("{} gifted {:?} to {}", actor, gift, target);
            Ok(Outcome::Gifted {
                to: target.clone(),
                gift,
            })
        })
    }

    fn show_market(&mut self, clock: &EffectClock) -> Outcome {
        self.market.refresh_if_stale(
            &self.content.market,
            self.rules.market_size,
            self.rules.market_refresh_secs,
            clock.now(),
            &mut self.rng,
        );
        Outcome::Market {
            offers: self.market.offers().to_vec(),
        }
    }

    fn buy(&mut self, actor: &str, args: &[String]) -> Result<Outcome, GameError> {
        let raw = required(args, 0, "offer number")?;
        let position: usize = raw
            .trim()
            .parse()
            .map_err(|_| GameError::InvalidArgument(format!("'{}' is not an offer number", log_safe(raw))))?;
        let offer = self
            .market
            .offer(position)
            .cloned()
            .ok_or_else(|| GameError::NotFound(format!("market offer {}", position)))?;
        let c = self.character_mut(actor)?;
        c.spend(offer.price)?;
        c.add_item(offer.item.clone());
        log::info!("{} bought {} for {}", actor, offer.item, offer.price);
        Ok(Outcome::Bought {
            item: offer.item,
            price: offer.price,
            gold: c.gold,
        })
    }
}
