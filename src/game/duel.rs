//! Outstanding duel challenges, at most one per defender.
//!
//! Challenges never expire on their own; they are consumed by `accept` or removed by either
//! party with `withdraw`. An acceptance that aborts before the fight is put back with
//! [`DuelRegistry::restore`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::game::errors::GameError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuelChallenge {
    pub challenger: String,
    pub defender: String,
    pub stake: u64,
    pub created_at: DateTime<Utc>,
}

/// Which end of a withdrawn challenge the caller was on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeRole {
    Incoming,
    Outgoing,
}

#[derive(Debug, Default)]
pub struct DuelRegistry {
    by_defender: BTreeMap<String, DuelChallenge>,
}

impl DuelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_defender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_defender.is_empty()
    }

    pub fn incoming(&self, defender: &str) -> Option<&DuelChallenge> {
        self.by_defender.get(defender)
    }

    /// Register a challenge. Fails with `DefenderBusy` if the defender already has one.
    pub fn challenge(&mut self, challenge: DuelChallenge) -> Result<&DuelChallenge, GameError> {
        if self.by_defender.contains_key(&challenge.defender) {
            return Err(GameError::DefenderBusy(challenge.defender));
        }
        let key = challenge.defender.clone();
        Ok(self.by_defender.entry(key).or_insert(challenge))
    }

    /// Remove a challenge involving `user`: incoming first, then the first outgoing one
    /// by defender order. `None` means there was nothing to cancel.
    pub fn withdraw(&mut self, user: &str) -> Option<(DuelChallenge, ChallengeRole)> {
        if let Some(c) = self.by_defender.remove(user) {
            return Some((c, ChallengeRole::Incoming));
        }
        let defender = self
            .by_defender
            .iter()
            .find(|(_, c)| c.challenger == user)
            .map(|(d, _)| d.clone())?;
        self.by_defender
            .remove(&defender)
            .map(|c| (c, ChallengeRole::Outgoing))
    }

    /// Take the challenge addressed to `defender`.
    pub fn accept(&mut self, defender: &str) -> Result<DuelChallenge, GameError> {
        self.by_defender
            .remove(defender)
            .ok_or_else(|| GameError::NoChallenge(defender.to_string()))
    }

    /// Put back a challenge whose acceptance was aborted.
    pub fn restore(&mut self, challenge: DuelChallenge) {
        self.by_defender
            .entry(challenge.defender.clone())
            .or_insert(challenge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ch(challenger: &str, defender: &str, stake: u64) -> DuelChallenge {
        DuelChallenge {
            challenger: challenger.into(),
            defender: defender.into(),
            stake,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn one_challenge_per_defender() {
        let mut reg = DuelRegistry::new();
        reg.challenge(ch("alice", "bob", 10)).unwrap();
        assert!(matches!(
            reg.challenge(ch("carol", "bob", 0)),
            Err(GameError::DefenderBusy(d)) if d == "bob"
        ));
        assert_eq!(reg.incoming("bob").unwrap().challenger, "alice");
    }

    #[test]
    fn withdraw_prefers_incoming_then_first_outgoing() {
        let mut reg = DuelRegistry::new();
        reg.challenge(ch("alice", "zed", 0)).unwrap();
        reg.challenge(ch("alice", "mia", 0)).unwrap();
        reg.challenge(ch("bob", "alice", 5)).unwrap();

        let (c, role) = reg.withdraw("alice").unwrap();
        assert_eq!((c.challenger.as_str(), role), ("bob", ChallengeRole::Incoming));
        let (c, role) = reg.withdraw("alice").unwrap();
        assert_eq!((c.defender.as_str(), role), ("mia", ChallengeRole::Outgoing));
        assert_eq!(reg.withdraw("alice").unwrap().0.defender, "zed");
        assert!(reg.withdraw("alice").is_none());
    }

    #[test]
    fn accept_consumes_and_restore_reinstates() {
        let mut reg = DuelRegistry::new();
        assert!(matches!(reg.accept("bob"), Err(GameError::NoChallenge(_))));
        reg.challenge(ch("alice", "bob", 10)).unwrap();
        let taken = reg.accept("bob").unwrap();
        assert!(reg.is_empty());
        reg.restore(taken.clone());
        assert_eq!(reg.incoming("bob"), Some(&taken));
    }
}
