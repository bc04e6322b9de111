//! Test utilities & fixtures.
//! Every suite opens its own throwaway store; argon2 runs with minimal cost
//! parameters so account setup stays fast.

use chrono::{DateTime, TimeZone, Utc};
use gowork::game::Role;
use gowork::storage::{GameStore, GameStoreBuilder};
use tempfile::TempDir;

/// Open a fresh seeded store under a temp dir. Keep the `TempDir` alive for
/// the whole test or sled loses its backing files.
pub fn open_store() -> (TempDir, GameStore) {
    let dir = TempDir::new().expect("tempdir");
    let store = GameStoreBuilder::new(dir.path().join("db"))
        .with_argon2_params(8, 1, 1)
        .open()
        .expect("open store");
    (dir, store)
}

/// Register an employee with the standard test password.
#[allow(dead_code)]
pub fn register(store: &GameStore, username: &str) {
    store
        .register_account(username, username, "password123", Role::Employee)
        .expect("register");
}

/// Register with an explicit role (for manager and moderator actors).
#[allow(dead_code)] // Not every suite needs a privileged actor.
pub fn register_as(store: &GameStore, username: &str, role: Role) {
    store
        .register_account(username, username, "password123", role)
        .expect("register");
}

/// A fixed weekday morning: Monday 2024-03-11 at the given time.
#[allow(dead_code)]
pub fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 11, hour, minute, 0).unwrap()
}

/// `days` days after [`monday_at`], same time of day.
#[allow(dead_code)]
pub fn days_later(days: i64, hour: u32, minute: u32) -> DateTime<Utc> {
    monday_at(hour, minute) + chrono::Duration::days(days)
}
