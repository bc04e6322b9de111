//! # Storage Layer
//!
//! Sled-backed persistence for the gOwOrk progression engine.
//!
//! One embedded database per data directory, split into named trees:
//!
//! - `accounts` — one bincode record per user, keyed `accounts:{username}`
//! - `attendance` — one record per user per calendar date
//! - `quests` — the shared active quest pool
//! - `submissions` — pending/approved quest completion claims
//! - `audit` — append-only log, keyed by zero-padded timestamp for
//!   chronological iteration
//! - `globals` — boss, weather, global modifiers, and motd singletons
//!
//! Records carry a `schema_version` byte that is checked on read; a
//! mismatch is surfaced as an error instead of silently reinterpreting
//! bytes. The store also owns the Argon2id credential handling (register,
//! verify, reset) and the per-account and globals mutexes that give every
//! mutating engine operation a serialized read-modify-write window.
//!
//! A `gowork.lock` file in the data directory is held with an exclusive
//! advisory lock for the lifetime of the store so a second server process
//! pointed at the same directory fails fast with a readable error.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use argon2::{Algorithm, Argon2, Params, Version};
use chrono::Utc;
use fs2::FileExt;
use log::info;
use password_hash::{PasswordHasher, PasswordVerifier};
use sled::IVec;

use crate::game::catalog::{initial_boss, DEFAULT_MOTD};
use crate::game::errors::GameError;
use crate::game::types::{
    Account, AttendanceRecord, AuditEntry, AuditKind, BossState, GlobalModifiers, PendingSubmission,
    QuestRecord, QuestSubmission, Role, SubmissionStatus, WeatherKind, ACCOUNT_SCHEMA_VERSION,
    ATTENDANCE_SCHEMA_VERSION, QUEST_SCHEMA_VERSION,
};
use crate::validation::validate_username;

const TREE_ACCOUNTS: &str = "accounts";
const TREE_ATTENDANCE: &str = "attendance";
const TREE_QUESTS: &str = "quests";
const TREE_SUBMISSIONS: &str = "submissions";
const TREE_AUDIT: &str = "audit";
const TREE_GLOBALS: &str = "globals";

const GLOBAL_BOSS: &[u8] = b"boss";
const GLOBAL_MODIFIERS: &[u8] = b"modifiers";
const GLOBAL_WEATHER: &[u8] = b"weather";
const GLOBAL_MOTD: &[u8] = b"motd";
const GLOBAL_OVERDRIVE: &[u8] = b"overdrive";

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

fn next_timestamp_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros() * 1000)
}

/// Helper builder so tests can easily create throwaway stores with custom
/// paths, skip global seeding, or run with cheap Argon2 parameters.
pub struct GameStoreBuilder {
    path: PathBuf,
    seed_globals: bool,
    argon2_params: Option<Params>,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_globals: true,
            argon2_params: None,
        }
    }

    /// Opt out of seeding the default boss/weather/motd globals (useful for
    /// targeted tests).
    pub fn without_global_seed(mut self) -> Self {
        self.seed_globals = false;
        self
    }

    /// Override Argon2 parameters (memory KiB, iterations, parallelism).
    pub fn with_argon2_params(mut self, memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        self.argon2_params = Params::new(memory_kib, iterations, parallelism, None).ok();
        self
    }

    pub fn open(self) -> Result<GameStore, GameError> {
        GameStore::open_with_options(self.path, self.seed_globals, self.argon2_params)
    }
}

/// Sled-backed persistence plus credential handling for gOwOrk.
pub struct GameStore {
    _db: sled::Db,
    accounts: sled::Tree,
    attendance: sled::Tree,
    quests: sled::Tree,
    submissions: sled::Tree,
    audit: sled::Tree,
    globals: sled::Tree,
    argon2: Argon2<'static>,
    account_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    globals_lock: Arc<Mutex<()>>,
    _dir_lock: File,
}

impl GameStore {
    /// Open (or create) the store rooted at `path`, seeding default globals
    /// when none exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GameError> {
        Self::open_with_options(path.as_ref().to_path_buf(), true, None)
    }

    fn open_with_options(
        path: PathBuf,
        seed_globals: bool,
        argon2_params: Option<Params>,
    ) -> Result<Self, GameError> {
        std::fs::create_dir_all(&path)?;

        let lock_path = path.join("gowork.lock");
        let dir_lock = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)?;
        dir_lock.try_lock_exclusive().map_err(|_| {
            GameError::Internal(format!(
                "data directory {} is locked by another gowork process",
                path.display()
            ))
        })?;

        let db = sled::open(&path)?;
        let accounts = db.open_tree(TREE_ACCOUNTS)?;
        let attendance = db.open_tree(TREE_ATTENDANCE)?;
        let quests = db.open_tree(TREE_QUESTS)?;
        let submissions = db.open_tree(TREE_SUBMISSIONS)?;
        let audit = db.open_tree(TREE_AUDIT)?;
        let globals = db.open_tree(TREE_GLOBALS)?;

        let argon2 = match argon2_params {
            Some(p) => Argon2::new(Algorithm::Argon2id, Version::V0x13, p),
            None => Argon2::default(),
        };

        let store = Self {
            _db: db,
            accounts,
            attendance,
            quests,
            submissions,
            audit,
            globals,
            argon2,
            account_locks: Mutex::new(HashMap::new()),
            globals_lock: Arc::new(Mutex::new(())),
            _dir_lock: dir_lock,
        };

        if seed_globals {
            store.seed_globals_if_needed()?;
        }

        Ok(store)
    }

    // ===== Keys and codecs =====

    fn account_key(username: &str) -> Vec<u8> {
        format!("accounts:{}", username.to_ascii_lowercase()).into_bytes()
    }

    fn attendance_key(username: &str, date: &str) -> Vec<u8> {
        format!("attendance:{}:{}", username.to_ascii_lowercase(), date).into_bytes()
    }

    fn attendance_prefix(username: &str) -> Vec<u8> {
        format!("attendance:{}:", username.to_ascii_lowercase()).into_bytes()
    }

    fn quest_key(quest_id: &str) -> Vec<u8> {
        format!("quests:{}", quest_id).into_bytes()
    }

    fn submission_key(username: &str, quest_id: &str) -> Vec<u8> {
        format!(
            "submissions:{}:{}",
            username.to_ascii_lowercase(),
            quest_id
        )
        .into_bytes()
    }

    fn submission_prefix(username: &str) -> Vec<u8> {
        format!("submissions:{}:", username.to_ascii_lowercase()).into_bytes()
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(bytes: IVec) -> Result<T, GameError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    // ===== Locking =====

    /// Per-account mutex. Every mutating engine operation holds this while
    /// doing its read-modify-write so concurrent requests for one account
    /// cannot interleave and drop an update.
    pub fn account_lock(&self, username: &str) -> Arc<Mutex<()>> {
        let mut registry = unpoison(self.account_locks.lock());
        registry
            .entry(username.to_ascii_lowercase())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Mutex guarding boss/modifier/weather singleton updates.
    pub fn globals_lock(&self) -> Arc<Mutex<()>> {
        self.globals_lock.clone()
    }

    // ===== Accounts =====

    /// Insert or update an account record.
    pub fn put_account(&self, mut account: Account) -> Result<(), GameError> {
        account.schema_version = ACCOUNT_SCHEMA_VERSION;
        account.updated_at = Utc::now();
        let key = Self::account_key(&account.username);
        let bytes = Self::serialize(&account)?;
        self.accounts.insert(key, bytes)?;
        self.accounts.flush()?;
        Ok(())
    }

    /// Fetch an account by username.
    pub fn get_account(&self, username: &str) -> Result<Account, GameError> {
        let key = Self::account_key(username);
        let Some(bytes) = self.accounts.get(&key)? else {
            return Err(GameError::AccountNotFound(username.to_string()));
        };
        let record: Account = Self::deserialize(bytes)?;
        if record.schema_version != ACCOUNT_SCHEMA_VERSION {
            return Err(GameError::SchemaMismatch {
                entity: "account",
                expected: ACCOUNT_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn account_exists(&self, username: &str) -> Result<bool, GameError> {
        Ok(self.accounts.contains_key(Self::account_key(username))?)
    }

    /// All accounts, unordered.
    pub fn list_accounts(&self) -> Result<Vec<Account>, GameError> {
        let mut out = Vec::new();
        for entry in self.accounts.scan_prefix(b"accounts:") {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(bytes)?);
        }
        Ok(out)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Remove an account together with its attendance history and pending
    /// submissions. The audit trail is left intact.
    pub fn purge_account(&self, username: &str) -> Result<bool, GameError> {
        let existed = self
            .accounts
            .remove(Self::account_key(username))?
            .is_some();
        let keys: Vec<IVec> = self
            .attendance
            .scan_prefix(Self::attendance_prefix(username))
            .keys()
            .collect::<Result<_, _>>()?;
        for key in keys {
            self.attendance.remove(key)?;
        }
        let keys: Vec<IVec> = self
            .submissions
            .scan_prefix(Self::submission_prefix(username))
            .keys()
            .collect::<Result<_, _>>()?;
        for key in keys {
            self.submissions.remove(key)?;
        }
        self.accounts.flush()?;
        self.attendance.flush()?;
        self.submissions.flush()?;
        Ok(existed)
    }

    // ===== Credentials =====

    /// Register a new account with an Argon2id password hash. The caller
    /// decides the role; self-service registration always passes Employee.
    pub fn register_account(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
        role: Role,
    ) -> Result<Account, GameError> {
        let username =
            validate_username(username).map_err(|e| GameError::InvalidInput(e.to_string()))?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(GameError::InvalidInput(format!(
                "password too short (minimum {} characters)",
                MIN_PASSWORD_LEN
            )));
        }
        if password.len() > MAX_PASSWORD_LEN {
            return Err(GameError::InvalidInput("password too long".to_string()));
        }
        if self.account_exists(&username)? {
            return Err(GameError::UserExists(username));
        }

        let display = if display_name.trim().is_empty() {
            let mut chars = username.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => username.clone(),
            }
        } else {
            display_name.trim().to_string()
        };

        let mut account = Account::new(&username, &display, role);
        account.password_hash = Some(self.hash_password(password)?);
        self.put_account(account.clone())?;
        self.append_audit(&username, AuditKind::System, "Registered")?;
        info!(target: "security", "account registered: {}", username);
        Ok(account)
    }

    /// Verify credentials and return the account. Banned accounts cannot
    /// log in regardless of password.
    pub fn verify_login(&self, username: &str, password: &str) -> Result<Account, GameError> {
        let account = self.get_account(username)?;
        if account.banned {
            info!(target: "security", "login rejected (banned): {}", username);
            return Err(GameError::Banned);
        }
        let Some(stored) = &account.password_hash else {
            info!(target: "security", "login rejected (no password set): {}", username);
            return Err(GameError::InvalidCredentials);
        };
        let parsed = password_hash::PasswordHash::new(stored)
            .map_err(|e| GameError::Internal(format!("corrupt password hash: {e}")))?;
        if self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            info!(target: "security", "login rejected (bad password): {}", username);
            return Err(GameError::InvalidCredentials);
        }
        info!(target: "security", "login ok: {}", username);
        Ok(account)
    }

    /// Set (or replace) a password for an existing account.
    pub fn set_password(&self, username: &str, new_password: &str) -> Result<(), GameError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(GameError::InvalidInput(format!(
                "password too short (minimum {} characters)",
                MIN_PASSWORD_LEN
            )));
        }
        if new_password.len() > MAX_PASSWORD_LEN {
            return Err(GameError::InvalidInput("password too long".to_string()));
        }
        let mut account = self.get_account(username)?;
        account.password_hash = Some(self.hash_password(new_password)?);
        self.put_account(account)?;
        info!(target: "security", "password reset: {}", username);
        Ok(())
    }

    fn hash_password(&self, password: &str) -> Result<String, GameError> {
        let salt = password_hash::SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| GameError::Internal(format!("password hash failure: {e}")))?;
        Ok(hash.to_string())
    }

    // ===== Attendance =====

    pub fn put_attendance(&self, mut record: AttendanceRecord) -> Result<(), GameError> {
        record.schema_version = ATTENDANCE_SCHEMA_VERSION;
        let key = Self::attendance_key(&record.username, &record.date);
        let bytes = Self::serialize(&record)?;
        self.attendance.insert(key, bytes)?;
        self.attendance.flush()?;
        Ok(())
    }

    /// The attendance record for one user on one date, if any.
    pub fn get_attendance(
        &self,
        username: &str,
        date: &str,
    ) -> Result<Option<AttendanceRecord>, GameError> {
        let key = Self::attendance_key(username, date);
        match self.attendance.get(&key)? {
            Some(bytes) => {
                let record: AttendanceRecord = Self::deserialize(bytes)?;
                if record.schema_version != ATTENDANCE_SCHEMA_VERSION {
                    return Err(GameError::SchemaMismatch {
                        entity: "attendance",
                        expected: ATTENDANCE_SCHEMA_VERSION,
                        found: record.schema_version,
                    });
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Full attendance history for one user, oldest first (keys embed the
    /// date, so prefix order is chronological).
    pub fn list_attendance_for(&self, username: &str) -> Result<Vec<AttendanceRecord>, GameError> {
        let mut out = Vec::new();
        for entry in self.attendance.scan_prefix(Self::attendance_prefix(username)) {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(bytes)?);
        }
        Ok(out)
    }

    /// Every attendance record in the store, grouped by user then date.
    pub fn list_attendance_all(&self) -> Result<Vec<AttendanceRecord>, GameError> {
        let mut out = Vec::new();
        for entry in self.attendance.scan_prefix(b"attendance:") {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(bytes)?);
        }
        Ok(out)
    }

    // ===== Quests =====

    pub fn put_quest(&self, mut quest: QuestRecord) -> Result<(), GameError> {
        quest.schema_version = QUEST_SCHEMA_VERSION;
        let key = Self::quest_key(&quest.id);
        let bytes = Self::serialize(&quest)?;
        self.quests.insert(key, bytes)?;
        self.quests.flush()?;
        Ok(())
    }

    pub fn get_quest(&self, quest_id: &str) -> Result<Option<QuestRecord>, GameError> {
        match self.quests.get(Self::quest_key(quest_id))? {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn delete_quest(&self, quest_id: &str) -> Result<(), GameError> {
        self.quests.remove(Self::quest_key(quest_id))?;
        self.quests.flush()?;
        Ok(())
    }

    pub fn list_quests(&self) -> Result<Vec<QuestRecord>, GameError> {
        let mut out = Vec::new();
        for entry in self.quests.scan_prefix(b"quests:") {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(bytes)?);
        }
        Ok(out)
    }

    pub fn quest_count(&self) -> usize {
        self.quests.len()
    }

    // ===== Quest submissions =====

    pub fn put_submission(&self, submission: QuestSubmission) -> Result<(), GameError> {
        let key = Self::submission_key(&submission.username, &submission.quest_id);
        let bytes = Self::serialize(&submission)?;
        self.submissions.insert(key, bytes)?;
        self.submissions.flush()?;
        Ok(())
    }

    pub fn get_submission(
        &self,
        username: &str,
        quest_id: &str,
    ) -> Result<Option<QuestSubmission>, GameError> {
        match self
            .submissions
            .get(Self::submission_key(username, quest_id))?
        {
            Some(bytes) => Ok(Some(Self::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    pub fn delete_submission(&self, username: &str, quest_id: &str) -> Result<bool, GameError> {
        let removed = self
            .submissions
            .remove(Self::submission_key(username, quest_id))?
            .is_some();
        self.submissions.flush()?;
        Ok(removed)
    }

    /// All submissions still awaiting review, joined with account and quest
    /// details for the manager queue. Submissions whose quest has vanished
    /// (expired and pruned) are skipped.
    pub fn list_pending_submissions(&self) -> Result<Vec<PendingSubmission>, GameError> {
        let mut out = Vec::new();
        for entry in self.submissions.scan_prefix(b"submissions:") {
            let (_, bytes) = entry?;
            let sub: QuestSubmission = Self::deserialize(bytes)?;
            if sub.status != SubmissionStatus::Pending {
                continue;
            }
            let Some(quest) = self.get_quest(&sub.quest_id)? else {
                continue;
            };
            let Ok(account) = self.get_account(&sub.username) else {
                continue;
            };
            out.push(PendingSubmission {
                username: account.username,
                display_name: account.display_name,
                quest_id: quest.id,
                quest_title: quest.title,
                reward_gold: quest.reward_gold,
                reward_xp: quest.reward_xp,
                submitted_at: sub.submitted_at,
            });
        }
        out.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(out)
    }

    // ===== Globals =====

    fn seed_globals_if_needed(&self) -> Result<usize, GameError> {
        if self.globals.contains_key(GLOBAL_BOSS)? {
            return Ok(0);
        }
        self.put_boss(&initial_boss())?;
        self.put_modifiers(&GlobalModifiers::default())?;
        self.put_weather(WeatherKind::default())?;
        self.put_motd(DEFAULT_MOTD)?;
        Ok(4)
    }

    pub fn boss(&self) -> Result<BossState, GameError> {
        match self.globals.get(GLOBAL_BOSS)? {
            Some(bytes) => Self::deserialize(bytes),
            None => Ok(initial_boss()),
        }
    }

    pub fn put_boss(&self, boss: &BossState) -> Result<(), GameError> {
        let bytes = Self::serialize(boss)?;
        self.globals.insert(GLOBAL_BOSS, bytes)?;
        self.globals.flush()?;
        Ok(())
    }

    pub fn modifiers(&self) -> Result<GlobalModifiers, GameError> {
        match self.globals.get(GLOBAL_MODIFIERS)? {
            Some(bytes) => Self::deserialize(bytes),
            None => Ok(GlobalModifiers::default()),
        }
    }

    pub fn put_modifiers(&self, modifiers: &GlobalModifiers) -> Result<(), GameError> {
        let bytes = Self::serialize(modifiers)?;
        self.globals.insert(GLOBAL_MODIFIERS, bytes)?;
        self.globals.flush()?;
        Ok(())
    }

    pub fn weather(&self) -> Result<WeatherKind, GameError> {
        match self.globals.get(GLOBAL_WEATHER)? {
            Some(bytes) => Self::deserialize(bytes),
            None => Ok(WeatherKind::default()),
        }
    }

    pub fn put_weather(&self, weather: WeatherKind) -> Result<(), GameError> {
        let bytes = Self::serialize(&weather)?;
        self.globals.insert(GLOBAL_WEATHER, bytes)?;
        self.globals.flush()?;
        Ok(())
    }

    pub fn motd(&self) -> Result<String, GameError> {
        match self.globals.get(GLOBAL_MOTD)? {
            Some(bytes) => Ok(String::from_utf8_lossy(&bytes).to_string()),
            None => Ok(DEFAULT_MOTD.to_string()),
        }
    }

    pub fn put_motd(&self, motd: &str) -> Result<(), GameError> {
        self.globals.insert(GLOBAL_MOTD, motd.as_bytes())?;
        self.globals.flush()?;
        Ok(())
    }

    /// Server-wide overdrive flag (2x clock-in XP). Off until a manager
    /// turns it on.
    pub fn overdrive(&self) -> Result<bool, GameError> {
        Ok(self
            .globals
            .get(GLOBAL_OVERDRIVE)?
            .map(|bytes| bytes.as_ref() == [1])
            .unwrap_or(false))
    }

    pub fn put_overdrive(&self, on: bool) -> Result<(), GameError> {
        self.globals.insert(GLOBAL_OVERDRIVE, vec![u8::from(on)])?;
        self.globals.flush()?;
        Ok(())
    }

    // ===== Audit =====

    /// Append one audit entry. Keys are zero-padded nanosecond timestamps
    /// so tree order is chronological.
    pub fn append_audit(
        &self,
        username: &str,
        kind: AuditKind,
        details: &str,
    ) -> Result<(), GameError> {
        let entry = AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            kind,
            details: details.to_string(),
            timestamp: Utc::now(),
        };
        let key = format!("{:020}", next_timestamp_nanos()).into_bytes();
        let bytes = Self::serialize(&entry)?;
        self.audit.insert(key, bytes)?;
        self.audit.flush()?;
        Ok(())
    }

    /// One page of audit entries, newest first.
    pub fn audit_page(&self, offset: usize, limit: usize) -> Result<Vec<AuditEntry>, GameError> {
        let mut out = Vec::new();
        for entry in self.audit.iter().rev().skip(offset).take(limit) {
            let (_, bytes) = entry?;
            out.push(Self::deserialize(bytes)?);
        }
        Ok(out)
    }

    pub fn audit_count(&self) -> usize {
        self.audit.len()
    }

    /// Flush every tree; called on shutdown.
    pub fn flush(&self) -> Result<(), GameError> {
        self.accounts.flush()?;
        self.attendance.flush()?;
        self.quests.flush()?;
        self.submissions.flush()?;
        self.audit.flush()?;
        self.globals.flush()?;
        Ok(())
    }
}

/// Recover the guard from a poisoned mutex; the protected maps stay
/// structurally valid even if a holder panicked mid-operation.
pub fn unpoison<'a, T>(result: Result<MutexGuard<'a, T>, std::sync::PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    result.unwrap_or_else(|poisoned| poisoned.into_inner())
}
