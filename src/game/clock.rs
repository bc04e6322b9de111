//! Clock-in and clock-out: the daily attendance loop that anchors every
//! other reward system.
//!
//! Clock-in time decides the attendance status:
//! - 07:45 to 07:59 is an early bird bonus (+20 XP and an achievement)
//! - exactly 08:00 is a critical hit (+50 XP)
//! - after 08:15 is late (flat 5 XP and a 10 HP penalty)
//! - anything else is plain on-time
//!
//! Base XP is `10 + streak * 5`, then multipliers apply in a fixed order
//! with flooring at each step: overdrive doubling, rainy-day +10%, skill
//! XP boosts, and the global event multiplier.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::game::boss;
use crate::game::errors::GameError;
use crate::game::leveling::{award_achievement, check_achievements, grant_xp, scale};
use crate::game::skills::{skill_multiplier, SkillBonus};
use crate::game::types::{
    date_key, parse_date_key, AccountView, AttendanceRecord, AttendanceStatus, AuditKind,
    WeatherKind,
};
use crate::storage::{unpoison, GameStore};

/// Everything a client needs to render the clock-in moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockInOutcome {
    pub record: AttendanceRecord,
    pub status: AttendanceStatus,
    pub xp_awarded: u64,
    pub hp_penalty: u32,
    pub streak: u32,
    pub levels_gained: u32,
    pub new_achievements: Vec<String>,
    pub boss_message: Option<String>,
    pub already_clocked_in: bool,
    pub account: AccountView,
}

/// Classify a clock-in by wall-clock hour and minute.
pub fn classify_clock_in(hour: u32, minute: u32) -> AttendanceStatus {
    if hour == 7 && minute >= 45 {
        AttendanceStatus::EarlyBird
    } else if hour == 8 && minute == 0 {
        AttendanceStatus::CriticalHit
    } else if hour > 8 || (hour == 8 && minute > 15) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Ontime
    }
}

/// Next streak value given the previous clock-in date. Exactly one
/// calendar day of gap extends the streak; anything else restarts it.
pub fn next_streak(last_login_date: &str, today: NaiveDate, current: u32) -> u32 {
    match parse_date_key(last_login_date) {
        Some(prev) => {
            let gap = (today - prev).num_days();
            if gap == 1 {
                current.saturating_add(1)
            } else {
                1
            }
        }
        None => 1,
    }
}

/// Open today's shift. Idempotent: a second clock-in on the same date
/// returns the existing record without touching anything.
pub fn clock_in(
    store: &GameStore,
    username: &str,
    now: DateTime<Utc>,
    overdrive: bool,
) -> Result<ClockInOutcome, GameError> {
    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let today = date_key(now);
    let mut account = store.get_account(username)?;
    if let Some(existing) = store.get_attendance(username, &today)? {
        return Ok(ClockInOutcome {
            status: existing.status,
            record: existing,
            xp_awarded: 0,
            hp_penalty: 0,
            streak: account.streak,
            levels_gained: 0,
            new_achievements: Vec::new(),
            boss_message: None,
            already_clocked_in: true,
            account: AccountView::from(&account),
        });
    }

    if account.last_login_date != today {
        account.streak = next_streak(&account.last_login_date, now.date_naive(), account.streak);
        account.last_login_date = today.clone();
    }

    let status = classify_clock_in(now.hour(), now.minute());
    let mut xp: u64 = 10 + u64::from(account.streak) * 5;
    let mut hp_penalty: u32 = 0;
    let mut new_achievements = Vec::new();
    match status {
        AttendanceStatus::EarlyBird => {
            xp += 20;
            if award_achievement(&mut account, "ach_early_bird") {
                new_achievements.push("ach_early_bird".to_string());
            }
        }
        AttendanceStatus::CriticalHit => xp += 50,
        AttendanceStatus::Late => {
            xp = 5;
            hp_penalty = 10;
        }
        AttendanceStatus::Ontime => {}
    }

    if overdrive {
        xp *= 2;
    }
    if store.weather()? == WeatherKind::Rainy {
        xp = scale(xp, 1.1);
    }
    xp = scale(xp, skill_multiplier(&account, SkillBonus::Xp));
    xp = scale(xp, store.modifiers()?.xp_multiplier);

    account.current_hp = account.current_hp.saturating_sub(hp_penalty);
    let levels_gained = grant_xp(&mut account, xp);
    let boss_message = boss::damage_with(store, &mut account, 10, now)?;
    for id in check_achievements(&mut account) {
        new_achievements.push(id.to_string());
    }
    let streak = account.streak;
    let view = AccountView::from(&account);
    store.put_account(account)?;

    let record = AttendanceRecord::open(username, &today, now, status, xp);
    store.put_attendance(record.clone())?;
    store.append_audit(
        username,
        AuditKind::Clock,
        &format!("Clocked in {} (+{} XP, streak {})", status.name(), xp, streak),
    )?;

    Ok(ClockInOutcome {
        record,
        status,
        xp_awarded: xp,
        hp_penalty,
        streak,
        levels_gained,
        new_achievements,
        boss_message,
        already_clocked_in: false,
        account: view,
    })
}

/// Close today's shift. Fails with `ShiftNotActive` when there is no
/// open record for the current date; a closed record stays closed.
pub fn clock_out(
    store: &GameStore,
    username: &str,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, GameError> {
    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let today = date_key(now);
    let mut record = store
        .get_attendance(username, &today)?
        .ok_or(GameError::ShiftNotActive)?;
    if !record.is_open() {
        return Err(GameError::ShiftNotActive);
    }
    record.time_out = Some(now);
    store.put_attendance(record.clone())?;

    let minutes = (now - record.time_in).num_minutes();
    store.append_audit(
        username,
        AuditKind::Clock,
        &format!("Clocked out after {} minutes", minutes),
    )?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Role;
    use crate::storage::GameStoreBuilder;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path().join("db"))
            .with_argon2_params(8, 1, 1)
            .open()
            .expect("open store");
        (dir, store)
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 11, h, m, 0).unwrap()
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify_clock_in(7, 44), AttendanceStatus::Ontime);
        assert_eq!(classify_clock_in(7, 45), AttendanceStatus::EarlyBird);
        assert_eq!(classify_clock_in(7, 59), AttendanceStatus::EarlyBird);
        assert_eq!(classify_clock_in(8, 0), AttendanceStatus::CriticalHit);
        assert_eq!(classify_clock_in(8, 1), AttendanceStatus::Ontime);
        assert_eq!(classify_clock_in(8, 15), AttendanceStatus::Ontime);
        assert_eq!(classify_clock_in(8, 16), AttendanceStatus::Late);
        assert_eq!(classify_clock_in(9, 0), AttendanceStatus::Late);
        assert_eq!(classify_clock_in(6, 30), AttendanceStatus::Ontime);
    }

    #[test]
    fn streak_extends_only_on_consecutive_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        assert_eq!(next_streak("", today, 0), 1);
        assert_eq!(next_streak("2024-03-10", today, 4), 5);
        assert_eq!(next_streak("2024-03-09", today, 4), 1);
        assert_eq!(next_streak("garbage", today, 4), 1);
    }

    #[test]
    fn first_clock_in_pays_base_plus_streak() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();

        let out = clock_in(&store, "maria", at(10, 30), false).unwrap();
        // Late: flat 5 XP and a 10 HP dent.
        assert_eq!(out.status, AttendanceStatus::Late);
        assert_eq!(out.xp_awarded, 5);
        assert_eq!(out.hp_penalty, 10);
        assert_eq!(out.account.current_hp, 90);
        assert_eq!(out.streak, 1);
    }

    #[test]
    fn on_time_clock_in_includes_streak_bonus() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();

        let out = clock_in(&store, "maria", at(8, 5), false).unwrap();
        assert_eq!(out.status, AttendanceStatus::Ontime);
        // New streak of 1: 10 + 1 * 5.
        assert_eq!(out.xp_awarded, 15);
    }

    #[test]
    fn critical_hit_stacks_with_overdrive() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();

        let out = clock_in(&store, "maria", at(8, 0), true).unwrap();
        assert_eq!(out.status, AttendanceStatus::CriticalHit);
        // (10 + 5 + 50) * 2.
        assert_eq!(out.xp_awarded, 130);
        assert_eq!(out.levels_gained, 1);
    }

    #[test]
    fn early_bird_awards_achievement_once() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();

        let out = clock_in(&store, "maria", at(7, 50), false).unwrap();
        assert_eq!(out.status, AttendanceStatus::EarlyBird);
        assert!(out.new_achievements.contains(&"ach_early_bird".to_string()));
        assert_eq!(out.xp_awarded, 35);
    }

    #[test]
    fn second_clock_in_same_day_is_a_no_op() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();

        let first = clock_in(&store, "maria", at(8, 5), false).unwrap();
        let again = clock_in(&store, "maria", at(11, 0), false).unwrap();
        assert!(again.already_clocked_in);
        assert_eq!(again.record.id, first.record.id);
        assert_eq!(again.xp_awarded, 0);
        // Account state did not move.
        assert_eq!(again.account.current_xp, first.account.current_xp);
    }

    #[test]
    fn clock_in_chips_the_boss() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();

        let hp_before = store.boss().unwrap().current_hp;
        clock_in(&store, "maria", at(8, 5), false).unwrap();
        assert_eq!(store.boss().unwrap().current_hp, hp_before - 10);
    }

    #[test]
    fn rainy_weather_boosts_clock_in_xp() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();
        store.put_weather(WeatherKind::Rainy).unwrap();

        let out = clock_in(&store, "maria", at(8, 5), false).unwrap();
        // floor(15 * 1.1) = 16.
        assert_eq!(out.xp_awarded, 16);
    }

    #[test]
    fn clock_out_closes_the_shift_once() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();

        assert!(matches!(
            clock_out(&store, "maria", at(17, 0)),
            Err(GameError::ShiftNotActive)
        ));

        clock_in(&store, "maria", at(8, 5), false).unwrap();
        let closed = clock_out(&store, "maria", at(17, 0)).unwrap();
        assert!(closed.time_out.is_some());

        assert!(matches!(
            clock_out(&store, "maria", at(18, 0)),
            Err(GameError::ShiftNotActive)
        ));
    }
}
