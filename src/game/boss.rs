//! The shared team boss. Every clock-in, work action, and approved quest
//! chips away at a single server-wide HP pool; whoever lands the killing
//! blow collects a gold bounty and the Boss Slayer achievement.
//!
//! Respawning is lazy: a kill stamps `respawn_at`, and the next read or
//! hit past that moment revives the boss at full HP. This survives
//! restarts without any timer state.

use chrono::{DateTime, Duration, Utc};
use log::info;

use crate::game::catalog::BOSS_KILL_GOLD;
use crate::game::errors::GameError;
use crate::game::leveling::award_achievement;
use crate::game::types::{Account, AuditKind, BossState};
use crate::storage::{unpoison, GameStore};

/// Revive the boss in place if its respawn time has passed. Returns
/// whether a respawn happened.
pub fn ensure_respawned(boss: &mut BossState, now: DateTime<Utc>) -> bool {
    if boss.active {
        return false;
    }
    match boss.respawn_at {
        Some(at) if now >= at => {
            boss.current_hp = boss.max_hp;
            boss.active = true;
            boss.respawn_at = None;
            true
        }
        _ => false,
    }
}

/// Current boss state, applying any due respawn first.
pub fn boss_state(store: &GameStore, now: DateTime<Utc>) -> Result<BossState, GameError> {
    let lock = store.globals_lock();
    let _guard = unpoison(lock.lock());

    let mut boss = store.boss()?;
    if ensure_respawned(&mut boss, now) {
        store.put_boss(&boss)?;
        store.append_audit(
            "server",
            AuditKind::System,
            &format!("{} respawned at full strength", boss.name),
        )?;
        info!("boss respawned: {}", boss.name);
    }
    Ok(boss)
}

/// Apply damage on behalf of an account the caller has already locked
/// and loaded. Killing-blow rewards are written into `account`; the
/// caller persists it. Returns a broadcast-worthy message when the blow
/// kills the boss, `None` otherwise.
///
/// Lock order is account first, then globals. Never call this while
/// holding the globals lock.
pub fn damage_with(
    store: &GameStore,
    account: &mut Account,
    amount: u64,
    now: DateTime<Utc>,
) -> Result<Option<String>, GameError> {
    let lock = store.globals_lock();
    let _guard = unpoison(lock.lock());

    let mut boss = store.boss()?;
    ensure_respawned(&mut boss, now);
    if !boss.active {
        // Down and waiting to respawn; hits in this window are lost.
        return Ok(None);
    }

    boss.current_hp = boss.current_hp.saturating_sub(amount);
    let message = if boss.current_hp == 0 {
        boss.active = false;
        boss.respawn_at = Some(now + Duration::seconds(boss.respawn_delay_secs));
        account.current_gold = account.current_gold.saturating_add(BOSS_KILL_GOLD);
        award_achievement(account, "ach_boss_killer");
        store.append_audit(
            &account.username,
            AuditKind::System,
            &format!(
                "Landed the killing blow on {} (+{} gold)",
                boss.name, BOSS_KILL_GOLD
            ),
        )?;
        info!("boss defeated: {} by {}", boss.name, account.username);
        Some(format!(
            "{} defeated! {} lands the killing blow and pockets {} gold!",
            boss.name, account.display_name, BOSS_KILL_GOLD
        ))
    } else {
        None
    };
    store.put_boss(&boss)?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Role;
    use crate::storage::GameStoreBuilder;
    use tempfile::TempDir;

    fn store() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path().join("db"))
            .with_argon2_params(8, 1, 1)
            .open()
            .expect("open store");
        (dir, store)
    }

    #[test]
    fn damage_reduces_hp_and_saturates() {
        let (_dir, store) = store();
        let mut acct = store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();
        let now = Utc::now();

        let msg = damage_with(&store, &mut acct, 10, now).unwrap();
        assert!(msg.is_none());
        assert_eq!(store.boss().unwrap().current_hp, 990);
    }

    #[test]
    fn killing_blow_pays_bounty_and_schedules_respawn() {
        let (_dir, store) = store();
        let mut acct = store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();
        let now = Utc::now();

        let mut boss = store.boss().unwrap();
        boss.current_hp = 5;
        store.put_boss(&boss).unwrap();

        let gold_before = acct.current_gold;
        let msg = damage_with(&store, &mut acct, 10, now).unwrap();
        assert!(msg.unwrap().contains("killing blow"));
        assert_eq!(acct.current_gold, gold_before + BOSS_KILL_GOLD);
        assert!(acct.has_achievement("ach_boss_killer"));

        let boss = store.boss().unwrap();
        assert!(!boss.active);
        assert_eq!(boss.current_hp, 0);
        assert!(boss.respawn_at.is_some());
    }

    #[test]
    fn hits_while_down_are_lost() {
        let (_dir, store) = store();
        let mut acct = store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();
        let now = Utc::now();

        let mut boss = store.boss().unwrap();
        boss.current_hp = 1;
        store.put_boss(&boss).unwrap();
        damage_with(&store, &mut acct, 1, now).unwrap();

        // Boss is down; further damage does nothing and pays nothing.
        let gold = acct.current_gold;
        let msg = damage_with(&store, &mut acct, 100, now).unwrap();
        assert!(msg.is_none());
        assert_eq!(acct.current_gold, gold);
    }

    #[test]
    fn respawn_is_lazy_and_full_hp() {
        let (_dir, store) = store();
        let mut acct = store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();
        let killed_at = Utc::now();

        let mut boss = store.boss().unwrap();
        boss.current_hp = 1;
        store.put_boss(&boss).unwrap();
        damage_with(&store, &mut acct, 1, killed_at).unwrap();

        // Still down one second before the respawn moment.
        let early = killed_at + Duration::seconds(9);
        assert!(!boss_state(&store, early).unwrap().active);

        let later = killed_at + Duration::seconds(11);
        let revived = boss_state(&store, later).unwrap();
        assert!(revived.active);
        assert_eq!(revived.current_hp, revived.max_hp);
        assert!(revived.respawn_at.is_none());
    }
}
