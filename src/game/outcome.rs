//! Structured results returned by [`crate::game::GameEngine::handle`].
//!
//! Outcomes carry data only. Rendering them for a chat channel is up to the front end; the
//! bundled console prints them as JSON.

use serde::Serialize;

use crate::game::combat::{DuelReport, FightReport};
use crate::game::content::MarketOffer;
use crate::game::duel::{ChallengeRole, DuelChallenge};
use crate::game::types::{Class, Race, Slot};

/// Timed effects still running, with seconds remaining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveEffects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp_buff_secs: Option<i64>,
    pub xp_penalty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_buff_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prison_secs: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub id: String,
    pub level: u32,
    pub xp: u64,
    pub xp_to_next: u64,
    pub gold: u64,
    pub hp: i64,
    pub max_hp: i64,
    pub damage: (i64, i64),
    pub race: Option<Race>,
    pub class: Option<Class>,
    pub effects: ActiveEffects,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub id: String,
    pub level: u32,
    pub xp: u64,
}

/// What a `gift` moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gift {
    Gold(u64),
    Item(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Created {
        id: String,
        status: StatusView,
    },
    Status(StatusView),
    Inventory {
        items: Vec<(String, usize)>,
    },
    Equipment {
        slots: Vec<(Slot, Option<String>)>,
    },
    XpGained {
        gained: u64,
        leveled_up: bool,
        level: u32,
        xp: u64,
    },
    Equipped {
        item: String,
        slot: Slot,
        replaced: Option<String>,
        hp: i64,
        max_hp: i64,
    },
    Unequipped {
        item: String,
        slot: Slot,
        hp: i64,
        max_hp: i64,
    },
    ItemUsed {
        item: String,
        healed: i64,
        hp: i64,
        max_hp: i64,
    },
    Fight(FightReport),
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    DuelChallenged(DuelChallenge),
    DuelResolved(DuelReport),
    DuelCancelled {
        challenge: DuelChallenge,
        role: ChallengeRole,
    },
    NothingToCancel,
    PvpRecord {
        wins: u32,
        losses: u32,
        win_rate_pct: u32,
    },
    ItemDescription {
        item: String,
        description: String,
    },
    DescribeChoices {
        items: Vec<String>,
    },
    Caroused {
        cost: u64,
        penalized: bool,
        buff_secs: i64,
    },
    Cured {
        cost: u64,
    },
    Sold {
        item: String,
        price: u64,
        gold: u64,
    },
    Appraised {
        item: String,
        value: u64,
    },
    Stolen {
        item: String,
        from: String,
    },
    CaughtStealing {
        target: String,
        prison_secs: i64,
    },
    Bribed {
        cost: u64,
    },
    TavernBuff {
        cost: u64,
        buff_secs: i64,
    },
    RaceChosen {
        race: Race,
        hp: i64,
        max_hp: i64,
    },
    ClassChosen {
        class: Class,
        hp: i64,
        max_hp: i64,
    },
    Rested {
        cost: u64,
        hp: i64,
    },
    Gifted {
        to: String,
        gift: Gift,
    },
    Market {
        offers: Vec<MarketOffer>,
    },
    Bought {
        item: String,
        price: u64,
        gold: u64,
    },
}
