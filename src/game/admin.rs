//! Role checks and the manager toolbox: bonuses, penalties, bans,
//! account removal, and audit log access.

use log::info;
use serde::{Deserialize, Serialize};

use crate::game::errors::GameError;
use crate::game::leveling::{check_achievements, grant_xp};
use crate::game::types::{Account, AccountView, AuditEntry, AuditKind, Role};
use crate::storage::{unpoison, GameStore};

/// Largest single grant or penalty an admin action will accept.
const MAX_ADJUSTMENT: u64 = 1_000_000;
const MAX_AUDIT_PAGE: usize = 200;

/// Load the acting account and check it clears the given role. Banned
/// accounts fail regardless of role. Returns the actor for reuse.
pub fn require_role(store: &GameStore, username: &str, min: Role) -> Result<Account, GameError> {
    let account = store.get_account(username)?;
    if account.banned {
        return Err(GameError::Banned);
    }
    if account.role.access_level() < min.access_level() {
        return Err(GameError::PermissionDenied(format!(
            "requires {} access",
            min.name()
        )));
    }
    Ok(account)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusOutcome {
    pub gold_granted: u64,
    pub xp_granted: u64,
    pub levels_gained: u32,
    pub new_achievements: Vec<String>,
    pub account: AccountView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyOutcome {
    /// Amounts actually removed, after flooring at zero.
    pub gold_removed: u64,
    pub xp_removed: u64,
    pub hp_removed: u32,
    pub account: AccountView,
}

/// Grant gold and/or XP outside the normal reward loop. Managers only;
/// amounts are paid flat with no multipliers.
pub fn give_bonus(
    store: &GameStore,
    actor: &str,
    target: &str,
    gold: u64,
    xp: u64,
) -> Result<BonusOutcome, GameError> {
    require_role(store, actor, Role::Manager)?;
    if gold == 0 && xp == 0 {
        return Err(GameError::InvalidInput("nothing to grant".to_string()));
    }
    if gold > MAX_ADJUSTMENT || xp > MAX_ADJUSTMENT {
        return Err(GameError::InvalidInput(format!(
            "bonus amounts are capped at {}",
            MAX_ADJUSTMENT
        )));
    }

    let lock = store.account_lock(target);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(target)?;
    account.current_gold = account.current_gold.saturating_add(gold);
    let levels_gained = grant_xp(&mut account, xp);
    let new_achievements: Vec<String> = check_achievements(&mut account)
        .into_iter()
        .map(str::to_string)
        .collect();
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        target,
        AuditKind::Admin,
        &format!("Bonus from {}: +{} gold, +{} XP", actor, gold, xp),
    )?;

    Ok(BonusOutcome {
        gold_granted: gold,
        xp_granted: xp,
        levels_gained,
        new_achievements,
        account: view,
    })
}

/// Dock gold, XP and/or HP. Everything floors at zero; XP loss never
/// takes a level back. Managers only.
pub fn punish_user(
    store: &GameStore,
    actor: &str,
    target: &str,
    gold_penalty: u64,
    xp_penalty: u64,
    hp_penalty: u32,
) -> Result<PenaltyOutcome, GameError> {
    require_role(store, actor, Role::Manager)?;
    if gold_penalty == 0 && xp_penalty == 0 && hp_penalty == 0 {
        return Err(GameError::InvalidInput("nothing to deduct".to_string()));
    }
    if gold_penalty > MAX_ADJUSTMENT
        || xp_penalty > MAX_ADJUSTMENT
        || u64::from(hp_penalty) > MAX_ADJUSTMENT
    {
        return Err(GameError::InvalidInput(format!(
            "penalty amounts are capped at {}",
            MAX_ADJUSTMENT
        )));
    }

    let lock = store.account_lock(target);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(target)?;
    let gold_removed = account.current_gold.min(gold_penalty);
    let xp_removed = account.current_xp.min(xp_penalty);
    let hp_removed = account.current_hp.min(hp_penalty);
    account.current_gold -= gold_removed;
    account.current_xp -= xp_removed;
    account.current_hp -= hp_removed;
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        target,
        AuditKind::Admin,
        &format!(
            "Penalty from {}: -{} gold, -{} XP, -{} HP",
            actor, gold_removed, xp_removed, hp_removed
        ),
    )?;

    Ok(PenaltyOutcome {
        gold_removed,
        xp_removed,
        hp_removed,
        account: view,
    })
}

/// Flip an account's ban flag. Banned accounts cannot log in; sessions
/// already open are cut off at the next request. Managers only, and
/// never against yourself.
pub fn toggle_ban(store: &GameStore, actor: &str, target: &str) -> Result<bool, GameError> {
    require_role(store, actor, Role::Manager)?;
    if actor.eq_ignore_ascii_case(target) {
        return Err(GameError::InvalidInput(
            "you cannot ban yourself".to_string(),
        ));
    }

    let lock = store.account_lock(target);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(target)?;
    account.banned = !account.banned;
    let banned = account.banned;
    store.put_account(account)?;

    let verb = if banned { "banned" } else { "unbanned" };
    store.append_audit(target, AuditKind::Admin, &format!("{} by {}", verb, actor))?;
    info!(target: "security", "account {}: {} by {}", verb, target, actor);
    Ok(banned)
}

/// Change a display name and/or role. Role changes never apply to the
/// acting account, so a lone manager cannot demote themselves into a
/// lockout. Managers only.
pub fn update_account(
    store: &GameStore,
    actor: &str,
    target: &str,
    display_name: Option<String>,
    role: Option<Role>,
) -> Result<AccountView, GameError> {
    require_role(store, actor, Role::Manager)?;
    if display_name.is_none() && role.is_none() {
        return Err(GameError::InvalidInput("nothing to update".to_string()));
    }
    if role.is_some() && actor.eq_ignore_ascii_case(target) {
        return Err(GameError::InvalidInput(
            "you cannot change your own role".to_string(),
        ));
    }
    let display_name = match display_name {
        Some(name) => {
            let trimmed = name.trim().to_string();
            if trimmed.is_empty() || trimmed.len() > 40 {
                return Err(GameError::InvalidInput(
                    "display name must be 1-40 characters".to_string(),
                ));
            }
            Some(trimmed)
        }
        None => None,
    };

    let lock = store.account_lock(target);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(target)?;
    let mut changes = Vec::new();
    if let Some(name) = display_name {
        changes.push(format!("display name -> {}", name));
        account.display_name = name;
    }
    if let Some(role) = role {
        changes.push(format!("role -> {}", role.name()));
        account.role = role;
    }
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        target,
        AuditKind::Admin,
        &format!("Profile updated by {}: {}", actor, changes.join(", ")),
    )?;
    info!(
        target: "security",
        "account updated: {} by {} ({})",
        target,
        actor,
        changes.join(", ")
    );
    Ok(view)
}

/// Remove an account and its attendance and submission history. The
/// audit trail stays. Managers only, and never against yourself.
pub fn delete_account(store: &GameStore, actor: &str, target: &str) -> Result<(), GameError> {
    require_role(store, actor, Role::Manager)?;
    if actor.eq_ignore_ascii_case(target) {
        return Err(GameError::InvalidInput(
            "you cannot delete your own account".to_string(),
        ));
    }

    let lock = store.account_lock(target);
    let _guard = unpoison(lock.lock());

    if !store.purge_account(target)? {
        return Err(GameError::AccountNotFound(target.to_string()));
    }
    store.append_audit(
        target,
        AuditKind::Admin,
        &format!("Account deleted by {}", actor),
    )?;
    info!(target: "security", "account deleted: {} by {}", target, actor);
    Ok(())
}

/// One page of the audit trail, newest first. Moderators and managers.
pub fn audit_log(
    store: &GameStore,
    actor: &str,
    offset: usize,
    limit: usize,
) -> Result<Vec<AuditEntry>, GameError> {
    require_role(store, actor, Role::Moderator)?;
    store.audit_page(offset, limit.clamp(1, MAX_AUDIT_PAGE))
}
