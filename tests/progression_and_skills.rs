//! Leveling, skill unlocks, and the work/break loop, exercised together the
//! way a real shift plays out.

mod common;

use common::*;
use gowork::game::{self, GameError, Role};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn bonus_xp_rolls_levels_and_funds_skills() {
    let (_dir, store) = open_store();
    register_as(&store, "mgr", Role::Manager);
    register(&store, "maria");

    // 100 + 200 thresholds consumed, 50 carried into level 3.
    let out = game::give_bonus(&store, "mgr", "maria", 0, 350).unwrap();
    assert_eq!(out.xp_granted, 350);
    assert_eq!(out.levels_gained, 2);
    assert_eq!(out.account.level, 3);
    assert_eq!(out.account.current_xp, 50);
    assert_eq!(out.account.skill_points, 2);

    // Two points cover barista mastery and iron lungs; iron lungs lands
    // its HP bonus immediately.
    game::unlock_skill(&store, "maria", "skill_barista_mastery").unwrap();
    let view = game::unlock_skill(&store, "maria", "skill_iron_lungs").unwrap();
    assert_eq!(view.skill_points, 0);
    assert_eq!(view.total_hp, 140);

    let err = game::unlock_skill(&store, "maria", "skill_charisma").unwrap_err();
    assert!(matches!(err, GameError::InsufficientSkillPoints { .. }));
}

#[test]
fn fast_learner_boosts_every_xp_source() {
    let (_dir, store) = open_store();
    register_as(&store, "mgr", Role::Manager);
    register(&store, "maria");
    register(&store, "control");

    // Level 8 costs 100+200+...+700 = 2800 XP and banks 7 skill points.
    game::give_bonus(&store, "mgr", "maria", 0, 2800).unwrap();
    let view = game::unlock_skill(&store, "maria", "skill_fast_learner").unwrap();
    assert_eq!(view.level, 8);
    assert_eq!(view.skill_points, 4);

    // Critical hit at 08:00 with a fresh streak pays 10 + 5 + 50 = 65;
    // fast learner floors 65 * 1.1 down to 71.
    let plain = game::clock_in(&store, "control", monday_at(8, 0), false).unwrap();
    let boosted = game::clock_in(&store, "maria", monday_at(8, 0), false).unwrap();
    assert_eq!(plain.xp_awarded, 65);
    assert_eq!(boosted.xp_awarded, 71);
}

#[test]
fn working_a_shift_costs_hp_and_pays_out() {
    let (_dir, store) = open_store();
    register(&store, "maria");
    let mut rng = StdRng::seed_from_u64(7);

    let err = game::perform_work(&store, "maria", monday_at(10, 0), &mut rng).unwrap_err();
    assert!(matches!(err, GameError::ShiftNotActive));

    game::clock_in(&store, "maria", monday_at(8, 5), false).unwrap();
    let out = game::perform_work(&store, "maria", monday_at(10, 0), &mut rng).unwrap();
    assert!((1..=3).contains(&out.gold_earned));
    assert_eq!(out.xp_earned, 5);
    assert_eq!(out.hp_spent, 2);
    assert_eq!(out.account.shifts_worked, 1);
}

#[test]
fn exhaustion_blocks_work_until_a_break() {
    let (_dir, store) = open_store();
    register_as(&store, "mgr", Role::Manager);
    register(&store, "maria");
    let mut rng = StdRng::seed_from_u64(7);

    game::clock_in(&store, "maria", monday_at(8, 5), false).unwrap();
    // Drain to a single HP; sunny work costs 2.
    game::punish_user(&store, "mgr", "maria", 0, 0, 99).unwrap();
    let err = game::perform_work(&store, "maria", monday_at(10, 0), &mut rng).unwrap_err();
    assert!(matches!(err, GameError::TooTired));

    let rest = game::take_break(&store, "maria", monday_at(10, 15)).unwrap();
    assert_eq!(rest.hp_recovered, 15);
    assert_eq!(rest.current_hp, 16);
    game::perform_work(&store, "maria", monday_at(10, 30), &mut rng).unwrap();
}

#[test]
fn fifty_shifts_make_a_workaholic() {
    let (_dir, store) = open_store();
    register(&store, "maria");
    let mut rng = StdRng::seed_from_u64(42);

    game::clock_in(&store, "maria", monday_at(8, 5), false).unwrap();
    let mut earned_it = false;
    for _ in 0..50 {
        let out = game::perform_work(&store, "maria", monday_at(12, 0), &mut rng).unwrap();
        earned_it |= out.new_achievements.iter().any(|a| a == "ach_hard_worker");
    }
    assert!(earned_it, "50th work action should award the achievement");

    let account = store.get_account("maria").unwrap();
    assert_eq!(account.shifts_worked, 50);
    // 250 base XP crosses the level 2 threshold along the way.
    assert!(account.level >= 2);
}
