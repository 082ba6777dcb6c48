use chrono::Duration;

use chatquest::game::effects::EffectClock;
use chatquest::game::{Class, GameError, Intent, Outcome, Race, Slot};

mod common;
use common::{fresh, run, run_at, t0, world};

fn xp_gained(outcome: Outcome) -> (u64, bool, u32) {
    match outcome {
        Outcome::XpGained {
            gained,
            leveled_up,
            level,
            ..
        } => (gained, leveled_up, level),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn xp_command_levels_up_and_heals() {
    let mut alice = fresh(0);
    alice.current_hp = 9;
    let (_tmp, mut engine) = world(vec![("alice", alice)], 1);

    assert_eq!(xp_gained(run(&mut engine, "alice", Intent::Xp, &[]).unwrap()), (50, false, 1));
    let later = t0() + Duration::seconds(300);
    assert_eq!(
        xp_gained(run_at(&mut engine, "alice", Intent::Xp, &[], later).unwrap()),
        (50, true, 2)
    );

    match run_at(&mut engine, "alice", Intent::Status, &[], later).unwrap() {
        Outcome::Status(view) => {
            assert_eq!((view.level, view.xp, view.xp_to_next), (2, 0, 200));
            assert_eq!((view.hp, view.max_hp), (35, 35));
            assert_eq!(view.damage, (9, 16));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn race_and_class_shape_xp_gains() {
    let cases = [
        (Race::Human, Class::Warrior, 50),
        (Race::Elf, Class::Mage, 60),
        (Race::Orc, Class::Rogue, 47),
        (Race::Orc, Class::Mage, 52),
    ];
    for (race, class, expected) in cases {
        let mut c = fresh(0);
        c.race = Some(race);
        c.class = Some(class);
        let (_tmp, mut engine) = world(vec![("alice", c)], 1);
        let (gained, _, _) = xp_gained(run(&mut engine, "alice", Intent::Xp, &[]).unwrap());
        assert_eq!(gained, expected, "{} {}", race, class);
    }
}

#[test]
fn xp_buff_and_penalty_stack() {
    let mut alice = fresh(0);
    EffectClock::at(t0()).grant_xp_buff(&mut alice, 60);
    alice.effects.xp_penalty = true;
    let (_tmp, mut engine) = world(vec![("alice", alice)], 1);

    // 50 * 1.5 * 0.5
    let (gained, _, _) = xp_gained(run(&mut engine, "alice", Intent::Xp, &[]).unwrap());
    assert_eq!(gained, 37);

    // The buff ran out, the penalty did not
    let later = t0() + Duration::seconds(300);
    let (gained, _, _) = xp_gained(run_at(&mut engine, "alice", Intent::Xp, &[], later).unwrap());
    assert_eq!(gained, 25);
}

#[test]
fn class_bonuses_feed_hp_and_damage() {
    let (_tmp, mut engine) = world(vec![("alice", fresh(0))], 1);
    run(&mut engine, "alice", Intent::Class, &["warrior"]).unwrap();
    match run(&mut engine, "alice", Intent::Status, &[]).unwrap() {
        Outcome::Status(view) => {
            assert_eq!((view.hp, view.max_hp), (40, 40));
            assert_eq!(view.damage, (9, 18));
            assert_eq!(view.class, Some(Class::Warrior));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn armor_raises_max_hp_and_unequipping_clamps() {
    let mut alice = fresh(0);
    alice.add_item("Chainmail");
    let mut bob = fresh(0);
    bob.equipment.replace(Slot::Armor, "Chainmail".into());
    bob.current_hp = 50;
    let (_tmp, mut engine) = world(vec![("alice", alice), ("bob", bob)], 1);

    let out = run(&mut engine, "alice", Intent::Equip, &["chainmail"]).unwrap();
    assert!(matches!(out, Outcome::Equipped { hp: 30, max_hp: 50, slot: Slot::Armor, .. }));

    let out = run(&mut engine, "bob", Intent::Unequip, &["ARMOR"]).unwrap();
    assert!(matches!(out, Outcome::Unequipped { hp: 30, max_hp: 30, .. }));
    assert_eq!(engine.store().get("bob").unwrap().inventory, vec!["Chainmail".to_string()]);
    assert!(matches!(
        run(&mut engine, "bob", Intent::Unequip, &["armor"]),
        Err(GameError::NotApplicable(_))
    ));
    assert!(matches!(
        run(&mut engine, "bob", Intent::Unequip, &["boots"]),
        Err(GameError::InvalidArgument(_))
    ));
}

#[test]
fn status_reports_other_players_and_prison_time() {
    let mut bob = fresh(0);
    EffectClock::at(t0()).imprison(&mut bob, 300);
    let (_tmp, mut engine) = world(vec![("alice", fresh(0)), ("bob", bob)], 1);

    let later = t0() + Duration::seconds(100);
    match run_at(&mut engine, "alice", Intent::Status, &["@Bob"], later).unwrap() {
        Outcome::Status(view) => {
            assert_eq!(view.id, "bob");
            assert_eq!(view.effects.prison_secs, Some(200));
            assert_eq!(view.effects.attack_buff_secs, None);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        run(&mut engine, "alice", Intent::Status, &["carol"]),
        Err(GameError::NotFound(_))
    ));
}

#[test]
fn pvp_record_reports_win_rate() {
    let mut alice = fresh(0);
    alice.pvp_wins = 2;
    alice.pvp_losses = 1;
    let (_tmp, mut engine) = world(vec![("alice", alice), ("bob", fresh(0))], 1);
    assert_eq!(
        run(&mut engine, "alice", Intent::Pvp, &[]).unwrap(),
        Outcome::PvpRecord { wins: 2, losses: 1, win_rate_pct: 66 }
    );
    assert_eq!(
        run(&mut engine, "bob", Intent::Pvp, &[]).unwrap(),
        Outcome::PvpRecord { wins: 0, losses: 0, win_rate_pct: 0 }
    );
}

#[test]
fn describe_handles_named_and_empty_cases() {
    let (_tmp, mut engine) = world(vec![("alice", fresh(0))], 1);
    assert!(matches!(
        run(&mut engine, "alice", Intent::Describe, &[]),
        Err(GameError::NotApplicable(_))
    ));
    let out = run(&mut engine, "nobody", Intent::Describe, &["iron", "sword"]).unwrap();
    assert!(matches!(out, Outcome::ItemDescription { ref item, .. } if item == "Iron Sword"));
    assert!(matches!(
        run(&mut engine, "alice", Intent::Describe, &["dragon", "egg"]),
        Err(GameError::NotFound(_))
    ));
}
