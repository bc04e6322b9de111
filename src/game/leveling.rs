//! XP growth, level roll-over, and achievement awards.
//!
//! Leveling is deliberately simple: the threshold for level `n` is
//! `n * 100` XP. Excess XP carries over, so a single large grant can
//! clear several levels at once. Every level grants one skill point,
//! raises max HP by 10, and refills current HP.

use crate::game::catalog::{
    find_achievement, HARD_WORKER_THRESHOLD, RICH_THRESHOLD, STREAK_ACHIEVEMENT_AT,
};
use crate::game::types::Account;

/// Apply a multiplier to an amount, flooring the result. Reward pipelines
/// call this once per multiplier so rounding happens at every step.
pub fn scale(amount: u64, multiplier: f64) -> u64 {
    (amount as f64 * multiplier).floor() as u64
}

/// Consume XP past the current threshold until the account is stable.
/// Returns the number of levels gained.
pub fn apply_level_ups(account: &mut Account) -> u32 {
    let mut gained = 0;
    loop {
        let threshold = u64::from(account.level) * 100;
        if account.current_xp < threshold {
            break;
        }
        account.current_xp -= threshold;
        account.level += 1;
        account.skill_points += 1;
        account.total_hp += 10;
        // Leveling up is a full heal.
        account.current_hp = account.total_hp;
        gained += 1;
    }
    gained
}

/// Add XP and settle any resulting level-ups in one call.
pub fn grant_xp(account: &mut Account, amount: u64) -> u32 {
    account.current_xp = account.current_xp.saturating_add(amount);
    apply_level_ups(account)
}

/// Record an achievement once. Unknown ids and repeats are ignored;
/// returns whether the achievement was newly earned.
pub fn award_achievement(account: &mut Account, id: &str) -> bool {
    if find_achievement(id).is_none() {
        return false;
    }
    if account.has_achievement(id) {
        return false;
    }
    account.achievements.push(id.to_string());
    true
}

/// Sweep the threshold-based achievements against the account's current
/// stats. Called after every reward-granting operation; returns the ids
/// earned by this sweep.
pub fn check_achievements(account: &mut Account) -> Vec<&'static str> {
    let mut earned = Vec::new();
    if account.streak >= STREAK_ACHIEVEMENT_AT && award_achievement(account, "ach_streak_3") {
        earned.push("ach_streak_3");
    }
    if account.current_gold >= RICH_THRESHOLD && award_achievement(account, "ach_rich") {
        earned.push("ach_rich");
    }
    if account.shifts_worked >= HARD_WORKER_THRESHOLD && award_achievement(account, "ach_hard_worker")
    {
        earned.push("ach_hard_worker");
    }
    earned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Role;

    fn fresh() -> Account {
        Account::new("maria", "Maria", Role::Employee)
    }

    #[test]
    fn level_up_at_exact_threshold() {
        let mut acct = fresh();
        let gained = grant_xp(&mut acct, 100);
        assert_eq!(gained, 1);
        assert_eq!(acct.level, 2);
        assert_eq!(acct.current_xp, 0);
        assert_eq!(acct.skill_points, 1);
        assert_eq!(acct.total_hp, 110);
        assert_eq!(acct.current_hp, 110);
    }

    #[test]
    fn one_below_threshold_does_not_level() {
        let mut acct = fresh();
        assert_eq!(grant_xp(&mut acct, 99), 0);
        assert_eq!(acct.level, 1);
        assert_eq!(acct.current_xp, 99);
    }

    #[test]
    fn large_grant_clears_multiple_levels() {
        let mut acct = fresh();
        // 100 + 200 = 300 consumed, 50 carried into level 3.
        let gained = grant_xp(&mut acct, 350);
        assert_eq!(gained, 2);
        assert_eq!(acct.level, 3);
        assert_eq!(acct.current_xp, 50);
        assert_eq!(acct.skill_points, 2);
        assert_eq!(acct.total_hp, 120);
    }

    #[test]
    fn level_up_refills_damaged_hp() {
        let mut acct = fresh();
        acct.current_hp = 3;
        grant_xp(&mut acct, 100);
        assert_eq!(acct.current_hp, acct.total_hp);
    }

    #[test]
    fn scale_floors_at_each_step() {
        assert_eq!(scale(15, 1.1), 16);
        assert_eq!(scale(16, 1.1), 17);
        assert_eq!(scale(5, 1.5), 7);
        assert_eq!(scale(10, 1.0), 10);
        assert_eq!(scale(3, 0.0), 0);
    }

    #[test]
    fn achievements_award_once() {
        let mut acct = fresh();
        assert!(award_achievement(&mut acct, "ach_early_bird"));
        assert!(!award_achievement(&mut acct, "ach_early_bird"));
        assert!(!award_achievement(&mut acct, "ach_no_such_thing"));
        assert_eq!(acct.achievements.len(), 1);
    }

    #[test]
    fn threshold_sweep_catches_rich_and_streak() {
        let mut acct = fresh();
        acct.current_gold = 1000;
        acct.streak = 3;
        let earned = check_achievements(&mut acct);
        assert!(earned.contains(&"ach_rich"));
        assert!(earned.contains(&"ach_streak_3"));
        // Second sweep is a no-op.
        assert!(check_achievements(&mut acct).is_empty());
    }
}
