use chrono::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;

use chatquest::game::combat::{self, DuelReport, Duelist};
use chatquest::game::duel::ChallengeRole;
use chatquest::game::effects::EffectClock;
use chatquest::game::{CooldownKey, GameContent, GameError, Intent, Outcome};

mod common;
use common::{fresh, run, t0, world};

fn resolved(outcome: Outcome) -> DuelReport {
    match outcome {
        Outcome::DuelResolved(report) => report,
        other => panic!("expected a resolved duel, got {:?}", other),
    }
}

#[test]
fn staked_duel_pays_the_winner_double() {
    let (_tmp, mut engine) = world(vec![("alice", fresh(50)), ("bob", fresh(50))], 21);
    let out = run(&mut engine, "alice", Intent::Duel, &["@Bob", "20"]).unwrap();
    assert!(matches!(out, Outcome::DuelChallenged(ref c) if c.defender == "bob" && c.stake == 20));
    assert!(engine.duels().incoming("bob").is_some());

    let report = resolved(run(&mut engine, "bob", Intent::Accept, &[]).unwrap());
    assert!(engine.duels().is_empty());
    assert_eq!(report.stake, 20);
    assert_eq!(report.gold_awarded, 40);
    assert_eq!(report.xp_awarded, 10);

    let winner = engine.store().get(&report.winner).unwrap();
    let loser = engine.store().get(&report.loser).unwrap();
    assert_eq!(winner.gold, 70);
    assert_eq!(loser.gold, 30);
    assert_eq!(winner.xp, 10);
    assert_eq!((winner.pvp_wins, loser.pvp_losses), (1, 1));
    assert_eq!(loser.current_hp, 15);
    assert!(winner.current_hp >= 1 && winner.current_hp <= 30);
    for id in ["alice", "bob"] {
        let c = engine.store().get(id).unwrap();
        assert_eq!(c.cooldowns.get(&CooldownKey::Pvp), Some(&t0()));
    }
}

#[test]
fn challenge_validation_order() {
    let (_tmp, mut engine) = world(
        vec![("alice", fresh(10)), ("bob", fresh(0)), ("carol", fresh(0))],
        1,
    );
    assert!(matches!(
        run(&mut engine, "alice", Intent::Duel, &["ALICE"]),
        Err(GameError::InvalidTarget(_))
    ));
    assert!(matches!(
        run(&mut engine, "alice", Intent::Duel, &["ghost"]),
        Err(GameError::NotFound(id)) if id == "ghost"
    ));
    assert!(matches!(
        run(&mut engine, "alice", Intent::Duel, &["bob", "11"]),
        Err(GameError::InsufficientFunds { needed: 11, available: 10 })
    ));
    assert!(matches!(
        run(&mut engine, "alice", Intent::Duel, &["bob", "lots"]),
        Err(GameError::InvalidArgument(_))
    ));
    run(&mut engine, "alice", Intent::Duel, &["bob"]).unwrap();
    assert!(matches!(
        run(&mut engine, "carol", Intent::Duel, &["bob"]),
        Err(GameError::DefenderBusy(id)) if id == "bob"
    ));
    assert!(matches!(
        run(&mut engine, "carol", Intent::Accept, &[]),
        Err(GameError::NoChallenge(_))
    ));
}

#[test]
fn defender_on_cooldown_keeps_the_challenge() {
    let mut bob = fresh(0);
    bob.cooldowns.insert(CooldownKey::Pvp, t0() - Duration::seconds(10));
    let (_tmp, mut engine) = world(vec![("alice", fresh(0)), ("bob", bob)], 3);

    run(&mut engine, "alice", Intent::Duel, &["bob"]).unwrap();
    let err = run(&mut engine, "bob", Intent::Accept, &[]).unwrap_err();
    assert!(matches!(
        err,
        GameError::CooldownActive { action: CooldownKey::Pvp, remaining_secs: 50 }
    ));
    let pending = engine.duels().incoming("bob").expect("challenge restored");
    assert_eq!(pending.challenger, "alice");
    assert_eq!(engine.store().get("alice").unwrap().pvp_wins, 0);
    assert_eq!(engine.store().get("bob").unwrap().pvp_losses, 0);
}

#[test]
fn stake_no_longer_covered_restores_the_challenge() {
    let (_tmp, mut engine) = world(vec![("alice", fresh(20)), ("bob", fresh(30))], 8);
    run(&mut engine, "alice", Intent::Duel, &["bob", "20"]).unwrap();
    run(&mut engine, "alice", Intent::Gift, &["bob", "gold", "15"]).unwrap();

    let err = run(&mut engine, "bob", Intent::Accept, &[]).unwrap_err();
    assert!(matches!(err, GameError::InsufficientFunds { needed: 20, available: 5 }));
    assert!(engine.duels().incoming("bob").is_some());
    assert_eq!(engine.store().get("alice").unwrap().gold, 5);
    assert_eq!(engine.store().get("bob").unwrap().gold, 45);
}

#[test]
fn imprisoned_defender_cannot_accept() {
    let mut bob = fresh(0);
    EffectClock::at(t0()).imprison(&mut bob, 120);
    let (_tmp, mut engine) = world(vec![("alice", fresh(0)), ("bob", bob)], 3);
    run(&mut engine, "alice", Intent::Duel, &["bob"]).unwrap();
    assert!(matches!(
        run(&mut engine, "bob", Intent::Accept, &[]),
        Err(GameError::Imprisoned { remaining_secs: 120 })
    ));
    assert!(engine.duels().incoming("bob").is_some());
}

#[test]
fn cancel_prefers_incoming_then_outgoing() {
    let (_tmp, mut engine) = world(
        vec![("alice", fresh(0)), ("bob", fresh(0)), ("carol", fresh(0))],
        1,
    );
    run(&mut engine, "alice", Intent::Duel, &["bob"]).unwrap();
    run(&mut engine, "carol", Intent::Duel, &["alice"]).unwrap();

    match run(&mut engine, "alice", Intent::Cancel, &[]).unwrap() {
        Outcome::DuelCancelled { challenge, role } => {
            assert_eq!(role, ChallengeRole::Incoming);
            assert_eq!(challenge.challenger, "carol");
        }
        other => panic!("unexpected {:?}", other),
    }
    match run(&mut engine, "alice", Intent::Cancel, &[]).unwrap() {
        Outcome::DuelCancelled { challenge, role } => {
            assert_eq!(role, ChallengeRole::Outgoing);
            assert_eq!(challenge.defender, "bob");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        run(&mut engine, "alice", Intent::Cancel, &[]).unwrap(),
        Outcome::NothingToCancel
    );
}

#[test]
fn pending_challenges_do_not_survive_a_restart() {
    let (tmp, mut engine) = world(vec![("alice", fresh(0)), ("bob", fresh(0))], 1);
    run(&mut engine, "alice", Intent::Duel, &["bob"]).unwrap();
    drop(engine);

    let store = chatquest::game::CharacterStore::open(
        tmp.path().join("characters.json"),
        &GameContent::builtin(),
    );
    let mut engine = chatquest::game::GameEngine::with_seed(
        store,
        GameContent::builtin(),
        Default::default(),
        1,
    );
    assert!(matches!(
        run(&mut engine, "bob", Intent::Accept, &[]),
        Err(GameError::NoChallenge(_))
    ));
}

#[test]
fn evenly_matched_duels_split_near_half() {
    let content = GameContent::builtin();
    let clock = EffectClock::at(t0());
    let mut rng = StdRng::seed_from_u64(2024);
    let mut challenger_wins = 0;
    let mut ceiling_hits = 0;
    for _ in 0..1000 {
        let mut a = fresh(0);
        let mut b = fresh(0);
        let report = combat::fight_duel(
            Duelist { id: "a", character: &mut a },
            Duelist { id: "b", character: &mut b },
            0,
            &content,
            &clock,
            1000,
            &mut rng,
        );
        if report.winner == "a" {
            challenger_wins += 1;
        }
        if report.decided_by_ceiling {
            ceiling_hits += 1;
        }
        assert_eq!(report.gold_awarded, 0);
    }
    assert_eq!(ceiling_hits, 0);
    assert!(
        (430..=570).contains(&challenger_wins),
        "challenger won {} of 1000",
        challenger_wins
    );
}
