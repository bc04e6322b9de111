//! Team-facing reads and the one social write: the leaderboard, the
//! dashboard stat block, kudos, and the attendance export.

use chrono::{DateTime, Utc};

use crate::game::admin::require_role;
use crate::game::catalog::KUDOS_XP;
use crate::game::errors::GameError;
use crate::game::leveling::grant_xp;
use crate::game::types::{date_key, Account, AccountView, AuditKind, Role, TeamStats};
use crate::storage::{unpoison, GameStore};

const MAX_LEADERBOARD: usize = 100;

/// Top accounts by level, then XP into the current level, then username
/// for a stable order.
pub fn leaderboard(store: &GameStore, limit: usize) -> Result<Vec<AccountView>, GameError> {
    let limit = limit.clamp(1, MAX_LEADERBOARD);
    let mut accounts = store.list_accounts()?;
    accounts.sort_by(|a, b| {
        b.level
            .cmp(&a.level)
            .then(b.current_xp.cmp(&a.current_xp))
            .then(a.username.cmp(&b.username))
    });
    Ok(accounts.iter().take(limit).map(AccountView::from).collect())
}

fn best_by<F: Fn(&Account) -> u64>(accounts: &[Account], key: F) -> Option<String> {
    let mut best: Option<(&Account, u64)> = None;
    for account in accounts {
        let value = key(account);
        // Strictly greater, so ties go to the earliest entry.
        if best.map(|(_, v)| value > v).unwrap_or(true) {
            best = Some((account, value));
        }
    }
    best.map(|(a, _)| a.username.clone())
}

/// Aggregate snapshot for the team dashboard.
pub fn team_stats(store: &GameStore, now: DateTime<Utc>) -> Result<TeamStats, GameError> {
    let accounts = store.list_accounts()?;
    let today = date_key(now);

    let mut active_shifts = 0;
    for account in &accounts {
        if let Some(record) = store.get_attendance(&account.username, &today)? {
            if record.is_open() {
                active_shifts += 1;
            }
        }
    }

    let total_gold: u64 = accounts.iter().map(|a| a.current_gold).sum();
    let total_xp: u64 = accounts.iter().map(|a| a.lifetime_xp()).sum();
    let avg_hp = if accounts.is_empty() {
        0
    } else {
        let sum: u64 = accounts.iter().map(|a| u64::from(a.current_hp)).sum();
        (sum / accounts.len() as u64) as u32
    };

    Ok(TeamStats {
        total_users: accounts.len(),
        active_shifts,
        total_gold_in_circulation: total_gold,
        total_xp_generated: total_xp,
        avg_hp,
        top_earner: best_by(&accounts, |a| a.current_gold),
        highest_level: best_by(&accounts, |a| {
            // Level dominates; XP into the level breaks ties.
            u64::from(a.level) * 1_000_000 + a.current_xp.min(999_999)
        }),
        most_kudos: best_by(&accounts, |a| u64::from(a.kudos_received)),
    })
}

/// Send kudos to a teammate: +1 on their counter plus a 10 XP thank-you,
/// leveled like any other grant. Free and unlimited; the only rule is
/// that you cannot send them to yourself.
pub fn send_kudos(store: &GameStore, from: &str, to: &str) -> Result<u32, GameError> {
    if from.eq_ignore_ascii_case(to) {
        return Err(GameError::SelfKudos);
    }
    // Sender must be a real account before the receiver is touched.
    store.get_account(from)?;

    let lock = store.account_lock(to);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(to)?;
    account.kudos_received = account.kudos_received.saturating_add(1);
    let total = account.kudos_received;
    grant_xp(&mut account, KUDOS_XP);
    store.put_account(account)?;
    store.append_audit(
        to,
        AuditKind::System,
        &format!("Received kudos from {} (+{} XP)", from, KUDOS_XP),
    )?;
    Ok(total)
}

/// Full attendance history as CSV, ordered by date then username. Open
/// shifts export `Active` in the Time Out column. Usernames are validated
/// to a charset with no commas or quotes, so no field ever needs escaping.
/// Moderators and managers only.
pub fn export_attendance_csv(store: &GameStore, actor: &str) -> Result<String, GameError> {
    require_role(store, actor, Role::Moderator)?;

    let mut records = store.list_attendance_all()?;
    records.sort_by(|a, b| a.date.cmp(&b.date).then(a.username.cmp(&b.username)));

    let mut csv = String::from("Log ID,User ID,Date,Time In,Time Out,Status,XP Earned\n");
    for record in records {
        let time_out = record
            .time_out
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "Active".to_string());
        csv.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            record.id,
            record.username,
            record.date,
            record.time_in.to_rfc3339(),
            time_out,
            record.status.name(),
            record.xp_earned
        ));
    }
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::clock::{clock_in, clock_out};
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

    fn employee(store: &GameStore, name: &str, level: u32, xp: u64) {
        store
            .register_account(name, "", "password123", Role::Employee)
            .unwrap();
        let mut acct = store.get_account(name).unwrap();
        acct.level = level;
        acct.current_xp = xp;
        store.put_account(acct).unwrap();
    }

    #[test]
    fn leaderboard_orders_by_level_then_xp() {
        let (_dir, store) = store();
        employee(&store, "ana", 3, 10);
        employee(&store, "ben", 5, 0);
        employee(&store, "cal", 3, 90);
        employee(&store, "dee", 1, 99);

        let board = leaderboard(&store, 10).unwrap();
        let names: Vec<_> = board.iter().map(|v| v.username.as_str()).collect();
        assert_eq!(names, vec!["ben", "cal", "ana", "dee"]);

        let top_two = leaderboard(&store, 2).unwrap();
        assert_eq!(top_two.len(), 2);
    }

    #[test]
    fn leaderboard_never_exposes_hashes() {
        let (_dir, store) = store();
        employee(&store, "ana", 1, 0);
        let board = leaderboard(&store, 10).unwrap();
        let json = serde_json::to_string(&board).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn team_stats_counts_open_shifts_only() {
        let (_dir, store) = store();
        employee(&store, "ana", 1, 0);
        employee(&store, "ben", 1, 0);
        employee(&store, "cal", 1, 0);

        clock_in(&store, "ana", at(8, 5), false).unwrap();
        clock_in(&store, "ben", at(8, 10), false).unwrap();
        clock_out(&store, "ben", at(16, 0)).unwrap();

        let stats = team_stats(&store, at(17, 0)).unwrap();
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.active_shifts, 1);
        assert!(stats.total_gold_in_circulation >= 300);
    }

    #[test]
    fn stat_superlatives_pick_strict_maxima() {
        let (_dir, store) = store();
        employee(&store, "ana", 2, 0);
        employee(&store, "ben", 9, 5);
        let mut rich = store.get_account("ana").unwrap();
        rich.current_gold = 5000;
        rich.kudos_received = 7;
        store.put_account(rich).unwrap();

        let stats = team_stats(&store, at(9, 0)).unwrap();
        assert_eq!(stats.top_earner.as_deref(), Some("ana"));
        assert_eq!(stats.highest_level.as_deref(), Some("ben"));
        assert_eq!(stats.most_kudos.as_deref(), Some("ana"));
    }

    #[test]
    fn kudos_increment_the_receiver() {
        let (_dir, store) = store();
        employee(&store, "ana", 1, 0);
        employee(&store, "ben", 1, 0);

        assert_eq!(send_kudos(&store, "ana", "ben").unwrap(), 1);
        assert_eq!(send_kudos(&store, "ana", "ben").unwrap(), 2);
        let ben = store.get_account("ben").unwrap();
        assert_eq!(ben.kudos_received, 2);
        // Each kudos is worth 10 XP to the receiver.
        assert_eq!(ben.current_xp, 20);
        // Sender gains nothing.
        let ana = store.get_account("ana").unwrap();
        assert_eq!(ana.kudos_received, 0);
        assert_eq!(ana.current_xp, 0);
    }

    #[test]
    fn kudos_xp_levels_the_receiver() {
        let (_dir, store) = store();
        employee(&store, "ana", 1, 0);
        employee(&store, "ben", 1, 95);

        send_kudos(&store, "ana", "ben").unwrap();
        let ben = store.get_account("ben").unwrap();
        assert_eq!(ben.level, 2);
        assert_eq!(ben.current_xp, 5);
        assert_eq!(ben.skill_points, 1);
    }

    #[test]
    fn self_kudos_are_refused() {
        let (_dir, store) = store();
        employee(&store, "ana", 1, 0);
        assert!(matches!(
            send_kudos(&store, "ana", "ana"),
            Err(GameError::SelfKudos)
        ));
        assert!(matches!(
            send_kudos(&store, "ana", "ANA"),
            Err(GameError::SelfKudos)
        ));
    }

    #[test]
    fn kudos_require_both_accounts() {
        let (_dir, store) = store();
        employee(&store, "ana", 1, 0);
        assert!(matches!(
            send_kudos(&store, "ghost", "ana"),
            Err(GameError::AccountNotFound(_))
        ));
        assert!(matches!(
            send_kudos(&store, "ana", "ghost"),
            Err(GameError::AccountNotFound(_))
        ));
    }

    #[test]
    fn csv_export_is_gated_and_well_formed() {
        let (_dir, store) = store();
        employee(&store, "ana", 1, 0);
        let mut actor = store.get_account("ana").unwrap();
        actor.role = Role::Moderator;
        store.put_account(actor).unwrap();
        employee(&store, "ben", 1, 0);

        clock_in(&store, "ben", at(8, 5), false).unwrap();
        clock_out(&store, "ben", at(16, 0)).unwrap();

        assert!(matches!(
            export_attendance_csv(&store, "ben"),
            Err(GameError::PermissionDenied(_))
        ));

        let csv = export_attendance_csv(&store, "ana").unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Log ID,User ID,Date,Time In,Time Out,Status,XP Earned")
        );
        let row = lines.next().unwrap();
        assert!(row.contains(",ben,2024-03-11,"));
        assert_eq!(row.split(',').count(), 7);
        assert!(!row.contains("Active"));

        // An open shift exports Active in the Time Out column.
        clock_in(&store, "ana", at(8, 5), false).unwrap();
        let csv = export_attendance_csv(&store, "ana").unwrap();
        let open_row = csv.lines().find(|l| l.contains(",ana,")).unwrap();
        assert!(open_row.contains(",Active,"));
    }
}
