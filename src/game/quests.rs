//! The quest board: a shared pool of time-boxed tasks that employees
//! claim and managers review.
//!
//! Completion is a two-step handshake. Submitting creates a pending
//! claim; a moderator or manager then approves it (paying the printed
//! rewards and hitting the boss for 50) or rejects it, which deletes the
//! claim so the quest can be attempted again. Approved claims stay on
//! file permanently, which is what blocks double-claiming.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::admin::require_role;
use crate::game::boss;
use crate::game::catalog::{QUEST_POOL_MIN, QUEST_TEMPLATES, QUEST_WINDOW_HOURS};
use crate::game::errors::GameError;
use crate::game::leveling::{check_achievements, grant_xp};
use crate::game::types::{
    AuditKind, PendingSubmission, QuestKind, QuestRecord, QuestSubmission, Role, SubmissionStatus,
    QUEST_SCHEMA_VERSION,
};
use crate::storage::{unpoison, GameStore};

/// Longest expiry window a hand-created quest may use, in hours.
const MAX_QUEST_WINDOW_HOURS: i64 = 168;
const MAX_QUEST_REWARD: u64 = 10_000;

/// Input for a manager-created quest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuest {
    pub title: String,
    pub description: String,
    pub reward_gold: u64,
    pub reward_xp: u64,
    pub kind: QuestKind,
    /// Hours until expiry; defaults to the standard window.
    #[serde(default)]
    pub window_hours: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub username: String,
    pub quest_id: String,
    pub quest_title: String,
    pub gold_awarded: u64,
    pub xp_awarded: u64,
    pub levels_gained: u32,
    pub new_achievements: Vec<String>,
    pub boss_message: Option<String>,
}

/// Drop expired quests and top the pool back up to the minimum from the
/// template table, skipping titles that are already live. Returns how
/// many quests were added.
pub fn refresh_quest_pool(
    store: &GameStore,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<usize, GameError> {
    let lock = store.globals_lock();
    let _guard = unpoison(lock.lock());

    let mut live_titles = Vec::new();
    let mut live_count = 0;
    for quest in store.list_quests()? {
        if quest.is_expired(now) {
            store.delete_quest(&quest.id)?;
        } else {
            live_titles.push(quest.title.clone());
            live_count += 1;
        }
    }

    let needed = QUEST_POOL_MIN.saturating_sub(live_count);
    if needed == 0 {
        return Ok(0);
    }

    let candidates: Vec<_> = QUEST_TEMPLATES
        .iter()
        .filter(|t| !live_titles.iter().any(|title| title == t.title))
        .collect();
    let mut added = 0;
    for template in candidates.choose_multiple(rng, needed) {
        let quest = QuestRecord {
            id: uuid::Uuid::new_v4().to_string(),
            title: template.title.to_string(),
            description: template.description.to_string(),
            reward_gold: template.reward_gold,
            reward_xp: template.reward_xp,
            kind: template.kind,
            expires_at: now + Duration::hours(QUEST_WINDOW_HOURS),
            schema_version: QUEST_SCHEMA_VERSION,
        };
        store.put_quest(quest)?;
        added += 1;
    }
    if added > 0 {
        store.append_audit(
            "server",
            AuditKind::System,
            &format!("Quest pool refreshed (+{} quests)", added),
        )?;
    }
    Ok(added)
}

/// All quests that have not expired yet, soonest expiry first.
pub fn active_quests(store: &GameStore, now: DateTime<Utc>) -> Result<Vec<QuestRecord>, GameError> {
    let mut quests: Vec<_> = store
        .list_quests()?
        .into_iter()
        .filter(|q| !q.is_expired(now))
        .collect();
    quests.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
    Ok(quests)
}

/// Post a hand-written quest to the board. Managers only.
pub fn create_quest(
    store: &GameStore,
    actor: &str,
    new_quest: NewQuest,
    now: DateTime<Utc>,
) -> Result<QuestRecord, GameError> {
    require_role(store, actor, Role::Manager)?;

    let title = new_quest.title.trim();
    if title.is_empty() || title.len() > 80 {
        return Err(GameError::InvalidInput(
            "quest title must be 1 to 80 characters".to_string(),
        ));
    }
    if new_quest.description.len() > 280 {
        return Err(GameError::InvalidInput("quest description too long".to_string()));
    }
    if new_quest.reward_gold > MAX_QUEST_REWARD || new_quest.reward_xp > MAX_QUEST_REWARD {
        return Err(GameError::InvalidInput(format!(
            "quest rewards are capped at {}",
            MAX_QUEST_REWARD
        )));
    }
    let window = new_quest.window_hours.unwrap_or(QUEST_WINDOW_HOURS);
    if !(1..=MAX_QUEST_WINDOW_HOURS).contains(&window) {
        return Err(GameError::InvalidInput(format!(
            "quest window must be 1 to {} hours",
            MAX_QUEST_WINDOW_HOURS
        )));
    }

    let lock = store.globals_lock();
    let _guard = unpoison(lock.lock());

    let quest = QuestRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: new_quest.description.trim().to_string(),
        reward_gold: new_quest.reward_gold,
        reward_xp: new_quest.reward_xp,
        kind: new_quest.kind,
        expires_at: now + Duration::hours(window),
        schema_version: QUEST_SCHEMA_VERSION,
    };
    store.put_quest(quest.clone())?;
    store.append_audit(
        actor,
        AuditKind::Quest,
        &format!("Posted quest '{}'", quest.title),
    )?;
    Ok(quest)
}

/// Claim completion of a quest. The claim sits pending until a reviewer
/// resolves it; one claim per user per quest.
pub fn submit_quest(
    store: &GameStore,
    username: &str,
    quest_id: &str,
    now: DateTime<Utc>,
) -> Result<QuestSubmission, GameError> {
    let quest = store
        .get_quest(quest_id)?
        .ok_or_else(|| GameError::QuestNotFound(quest_id.to_string()))?;
    if quest.is_expired(now) {
        return Err(GameError::QuestExpired);
    }

    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    // Confirms the account exists before writing a claim for it.
    store.get_account(username)?;
    if store.get_submission(username, quest_id)?.is_some() {
        return Err(GameError::AlreadySubmitted);
    }

    let submission = QuestSubmission {
        username: username.to_string(),
        quest_id: quest_id.to_string(),
        status: SubmissionStatus::Pending,
        submitted_at: now,
        resolved_at: None,
    };
    store.put_submission(submission.clone())?;
    store.append_audit(
        username,
        AuditKind::Quest,
        &format!("Submitted quest '{}'", quest.title),
    )?;
    Ok(submission)
}

/// The review queue, oldest claim first. Moderators and managers only.
pub fn pending_submissions(
    store: &GameStore,
    actor: &str,
) -> Result<Vec<PendingSubmission>, GameError> {
    require_role(store, actor, Role::Moderator)?;
    store.list_pending_submissions()
}

/// Approve a pending claim: pay the quest's printed rewards, hit the
/// boss for 50, and keep the claim on file so it cannot be re-claimed.
pub fn approve_quest(
    store: &GameStore,
    actor: &str,
    username: &str,
    quest_id: &str,
    now: DateTime<Utc>,
) -> Result<ApprovalOutcome, GameError> {
    require_role(store, actor, Role::Moderator)?;

    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let mut submission = store
        .get_submission(username, quest_id)?
        .ok_or(GameError::SubmissionNotFound)?;
    if submission.status != SubmissionStatus::Pending {
        return Err(GameError::SubmissionNotFound);
    }
    let quest = store
        .get_quest(quest_id)?
        .ok_or_else(|| GameError::QuestNotFound(quest_id.to_string()))?;

    let mut account = store.get_account(username)?;
    account.current_gold = account.current_gold.saturating_add(quest.reward_gold);
    let levels_gained = grant_xp(&mut account, quest.reward_xp);
    let boss_message = boss::damage_with(store, &mut account, 50, now)?;
    let new_achievements: Vec<String> = check_achievements(&mut account)
        .into_iter()
        .map(str::to_string)
        .collect();
    store.put_account(account)?;

    submission.status = SubmissionStatus::Approved;
    submission.resolved_at = Some(now);
    store.put_submission(submission)?;
    store.append_audit(
        username,
        AuditKind::Quest,
        &format!(
            "Quest '{}' approved by {} (+{} gold, +{} XP)",
            quest.title, actor, quest.reward_gold, quest.reward_xp
        ),
    )?;

    Ok(ApprovalOutcome {
        username: username.to_string(),
        quest_id: quest_id.to_string(),
        quest_title: quest.title,
        gold_awarded: quest.reward_gold,
        xp_awarded: quest.reward_xp,
        levels_gained,
        new_achievements,
        boss_message,
    })
}

/// Reject a pending claim. The claim is deleted outright, which lets the
/// user submit the same quest again.
pub fn reject_quest(
    store: &GameStore,
    actor: &str,
    username: &str,
    quest_id: &str,
) -> Result<(), GameError> {
    require_role(store, actor, Role::Moderator)?;

    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let existing = store
        .get_submission(username, quest_id)?
        .ok_or(GameError::SubmissionNotFound)?;
    if existing.status != SubmissionStatus::Pending {
        return Err(GameError::SubmissionNotFound);
    }
    store.delete_submission(username, quest_id)?;

    let title = store
        .get_quest(quest_id)?
        .map(|q| q.title)
        .unwrap_or_else(|| quest_id.to_string());
    store.append_audit(
        username,
        AuditKind::Quest,
        &format!("Quest '{}' rejected by {}", title, actor),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Role;
    use crate::storage::GameStoreBuilder;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn store() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path().join("db"))
            .with_argon2_params(8, 1, 1)
            .open()
            .expect("open store");
        (dir, store)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap()
    }

    fn with_role(store: &GameStore, name: &str, role: Role) {
        store
            .register_account(name, "", "password123", Role::Employee)
            .unwrap();
        let mut acct = store.get_account(name).unwrap();
        acct.role = role;
        store.put_account(acct).unwrap();
    }

    #[test]
    fn refresh_fills_the_pool_to_minimum() {
        let (_dir, store) = store();
        let mut rng = StdRng::seed_from_u64(5);

        let added = refresh_quest_pool(&store, now(), &mut rng).unwrap();
        assert_eq!(added, QUEST_POOL_MIN);
        let live = active_quests(&store, now()).unwrap();
        assert_eq!(live.len(), QUEST_POOL_MIN);

        // Titles never duplicate within the live pool.
        for (i, a) in live.iter().enumerate() {
            for b in live.iter().skip(i + 1) {
                assert_ne!(a.title, b.title);
            }
        }

        // A full pool refreshes to a no-op.
        assert_eq!(refresh_quest_pool(&store, now(), &mut rng).unwrap(), 0);
    }

    #[test]
    fn refresh_replaces_expired_quests() {
        let (_dir, store) = store();
        let mut rng = StdRng::seed_from_u64(5);
        refresh_quest_pool(&store, now(), &mut rng).unwrap();

        let later = now() + Duration::hours(QUEST_WINDOW_HOURS + 1);
        let added = refresh_quest_pool(&store, later, &mut rng).unwrap();
        assert_eq!(added, QUEST_POOL_MIN);
        for quest in active_quests(&store, later).unwrap() {
            assert!(!quest.is_expired(later));
        }
    }

    #[test]
    fn submission_lifecycle_reaches_approval() {
        let (_dir, store) = store();
        with_role(&store, "boss", Role::Manager);
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();

        let quest = create_quest(
            &store,
            "boss",
            NewQuest {
                title: "Deep clean the espresso machine".to_string(),
                description: "Full descale, group heads included".to_string(),
                reward_gold: 80,
                reward_xp: 40,
                kind: QuestKind::Daily,
                window_hours: None,
            },
            now(),
        )
        .unwrap();

        submit_quest(&store, "maria", &quest.id, now()).unwrap();
        assert!(matches!(
            submit_quest(&store, "maria", &quest.id, now()),
            Err(GameError::AlreadySubmitted)
        ));

        let queue = pending_submissions(&store, "boss").unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].username, "maria");
        assert_eq!(queue[0].quest_title, quest.title);

        let boss_hp = store.boss().unwrap().current_hp;
        let out = approve_quest(&store, "boss", "maria", &quest.id, now()).unwrap();
        assert_eq!(out.gold_awarded, 80);
        assert_eq!(out.xp_awarded, 40);

        let acct = store.get_account("maria").unwrap();
        assert_eq!(acct.current_gold, 180);
        assert_eq!(acct.current_xp, 40);
        assert_eq!(store.boss().unwrap().current_hp, boss_hp - 50);

        // The approved claim blocks both re-approval and re-submission.
        assert!(matches!(
            approve_quest(&store, "boss", "maria", &quest.id, now()),
            Err(GameError::SubmissionNotFound)
        ));
        assert!(matches!(
            submit_quest(&store, "maria", &quest.id, now()),
            Err(GameError::AlreadySubmitted)
        ));
    }

    #[test]
    fn rejection_allows_resubmission() {
        let (_dir, store) = store();
        with_role(&store, "mod", Role::Moderator);
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        refresh_quest_pool(&store, now(), &mut rng).unwrap();
        let quests = active_quests(&store, now()).unwrap();
        let quest = &quests[0];

        submit_quest(&store, "maria", &quest.id, now()).unwrap();
        reject_quest(&store, "mod", "maria", &quest.id).unwrap();
        assert!(pending_submissions(&store, "mod").unwrap().is_empty());

        // Rejected claims vanish, so trying again is allowed.
        assert!(submit_quest(&store, "maria", &quest.id, now()).is_ok());
    }

    #[test]
    fn review_requires_moderator_access() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();
        assert!(matches!(
            pending_submissions(&store, "maria"),
            Err(GameError::PermissionDenied(_))
        ));
        assert!(matches!(
            approve_quest(&store, "maria", "maria", "whatever", now()),
            Err(GameError::PermissionDenied(_))
        ));
    }

    #[test]
    fn create_quest_requires_manager_and_valid_input() {
        let (_dir, store) = store();
        with_role(&store, "mod", Role::Moderator);
        with_role(&store, "boss", Role::Manager);

        let quest = NewQuest {
            title: "Title".to_string(),
            description: String::new(),
            reward_gold: 10,
            reward_xp: 10,
            kind: QuestKind::Urgent,
            window_hours: Some(2),
        };
        assert!(matches!(
            create_quest(&store, "mod", quest.clone(), now()),
            Err(GameError::PermissionDenied(_))
        ));

        let mut blank = quest.clone();
        blank.title = "   ".to_string();
        assert!(matches!(
            create_quest(&store, "boss", blank, now()),
            Err(GameError::InvalidInput(_))
        ));

        let mut greedy = quest.clone();
        greedy.reward_gold = MAX_QUEST_REWARD + 1;
        assert!(matches!(
            create_quest(&store, "boss", greedy, now()),
            Err(GameError::InvalidInput(_))
        ));

        let created = create_quest(&store, "boss", quest, now()).unwrap();
        assert_eq!(created.expires_at, now() + Duration::hours(2));
    }

    #[test]
    fn expired_quests_cannot_be_submitted() {
        let (_dir, store) = store();
        store
            .register_account("maria", "Maria", "password123", Role::Employee)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        refresh_quest_pool(&store, now(), &mut rng).unwrap();
        let quests = active_quests(&store, now()).unwrap();
        let quest = &quests[0];

        let later = now() + Duration::hours(QUEST_WINDOW_HOURS + 1);
        assert!(matches!(
            submit_quest(&store, "maria", &quest.id, later),
            Err(GameError::QuestExpired)
        ));
        assert!(matches!(
            submit_quest(&store, "maria", "not-a-quest", now()),
            Err(GameError::QuestNotFound(_))
        ));
    }
}
