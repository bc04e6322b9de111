//! Passive skill tree: unlocking skills and folding their effects into
//! reward multipliers.

use crate::game::catalog::find_skill;
use crate::game::errors::GameError;
use crate::game::types::{Account, AccountView, AuditKind, SkillEffect};
use crate::storage::{unpoison, GameStore};

/// Which multiplier a caller is asking the skill set for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillBonus {
    Gold,
    Xp,
    ShopDiscount,
}

/// Fold the account's unlocked skills into a single multiplier. Boosts
/// stack additively (two +20% skills make 1.4); discounts subtract and
/// are clamped at zero so a price can never go negative.
pub fn skill_multiplier(account: &Account, bonus: SkillBonus) -> f64 {
    let mut multiplier = 1.0;
    for id in &account.unlocked_skills {
        let Some(skill) = find_skill(id) else {
            // Skill removed from the catalog after it was unlocked.
            continue;
        };
        match skill.effect {
            SkillEffect::GoldBoost(v) => {
                if bonus == SkillBonus::Gold {
                    multiplier += v;
                }
            }
            SkillEffect::XpBoost(v) => {
                if bonus == SkillBonus::Xp {
                    multiplier += v;
                }
            }
            SkillEffect::ShopDiscount(v) => {
                if bonus == SkillBonus::ShopDiscount {
                    multiplier -= v;
                }
            }
            SkillEffect::MaxHpBoost(_) => {}
        }
    }
    if bonus == SkillBonus::ShopDiscount {
        multiplier.max(0.0)
    } else {
        multiplier
    }
}

/// Spend skill points to unlock a skill. Validates existence, prior
/// unlocks, point balance, and the level gate before touching anything.
/// `MaxHpBoost` skills apply their bonus immediately.
pub fn unlock_skill(
    store: &GameStore,
    username: &str,
    skill_id: &str,
) -> Result<AccountView, GameError> {
    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(username)?;
    let skill =
        find_skill(skill_id).ok_or_else(|| GameError::SkillNotFound(skill_id.to_string()))?;
    if account.has_skill(skill_id) {
        return Err(GameError::AlreadyUnlocked);
    }
    if account.skill_points < skill.cost {
        return Err(GameError::InsufficientSkillPoints {
            needed: skill.cost,
            have: account.skill_points,
        });
    }
    if account.level < skill.required_level {
        return Err(GameError::LevelTooLow {
            required: skill.required_level,
        });
    }

    account.skill_points -= skill.cost;
    account.unlocked_skills.push(skill.id.to_string());
    if let SkillEffect::MaxHpBoost(bonus) = skill.effect {
        account.total_hp += bonus;
        account.current_hp += bonus;
    }

    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        username,
        AuditKind::System,
        &format!("Unlocked skill {}", skill.name),
    )?;
    Ok(view)
}
