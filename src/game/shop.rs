//! The gold sink: shop purchases, pet care, and avatar equipment.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::catalog::{find_item, item_for_asset, MYSTERY_BOX_ITEM_ID, PET_FEED_COST};
use crate::game::errors::GameError;
use crate::game::leveling::{grant_xp, scale};
use crate::game::rewards::{buy_mystery_box, MysteryBoxOutcome};
use crate::game::skills::{skill_multiplier, SkillBonus};
use crate::game::types::{
    AccountView, AuditKind, AvatarSlot, ItemKind, PetRecord,
};
use crate::storage::{unpoison, GameStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOutcome {
    pub item_id: String,
    pub name: String,
    pub price_paid: u64,
    /// HP actually restored, for consumables; zero otherwise.
    pub hp_restored: u32,
    pub account: AccountView,
}

/// Result of a `buy_item` call, which doubles as the entry point for the
/// mystery box when the reserved id is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "purchase")]
pub enum Purchase {
    Item(PurchaseOutcome),
    MysteryBox(MysteryBoxOutcome),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedOutcome {
    pub pet: PetRecord,
    pub owner_xp: u64,
    pub levels_gained: u32,
    pub account: AccountView,
}

fn slot_for_kind(kind: ItemKind) -> Option<AvatarSlot> {
    match kind {
        ItemKind::Hat => Some(AvatarSlot::Hat),
        ItemKind::Eyes => Some(AvatarSlot::Eyes),
        ItemKind::Clothing => Some(AvatarSlot::Clothing),
        ItemKind::Accessory => Some(AvatarSlot::Accessory),
        ItemKind::Consumable | ItemKind::Pet => None,
    }
}

/// Price after shop discount skills, floored.
pub fn discounted_price(base: u64, discount_multiplier: f64) -> u64 {
    scale(base, discount_multiplier)
}

/// Buy a catalog item. Cosmetics land in the inventory, consumables heal
/// on the spot, the pet item adopts a companion, and the reserved
/// mystery box id routes into the box flow.
pub fn buy_item(
    store: &GameStore,
    username: &str,
    item_id: &str,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<Purchase, GameError> {
    if item_id == MYSTERY_BOX_ITEM_ID {
        return Ok(Purchase::MysteryBox(buy_mystery_box(
            store, username, now, rng,
        )?));
    }
    let item = find_item(item_id).ok_or_else(|| GameError::ItemNotFound(item_id.to_string()))?;

    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(username)?;
    let price = discounted_price(
        item.cost,
        skill_multiplier(&account, SkillBonus::ShopDiscount),
    );

    let mut hp_restored = 0;
    match item.kind {
        ItemKind::Consumable => {
            if account.current_gold < price {
                return Err(GameError::InsufficientGold {
                    needed: price,
                    have: account.current_gold,
                });
            }
            account.current_gold -= price;
            let before = account.current_hp;
            account.current_hp = (account.current_hp + item.effect_value).min(account.total_hp);
            hp_restored = account.current_hp - before;
        }
        ItemKind::Pet => {
            if account.pet.is_some() {
                return Err(GameError::AlreadyHasPet);
            }
            if account.current_gold < price {
                return Err(GameError::InsufficientGold {
                    needed: price,
                    have: account.current_gold,
                });
            }
            account.current_gold -= price;
            account.pet = Some(PetRecord::adopt("Doggo"));
        }
        _ => {
            if account.owns_item(item.id) {
                return Err(GameError::AlreadyOwned);
            }
            if account.current_gold < price {
                return Err(GameError::InsufficientGold {
                    needed: price,
                    have: account.current_gold,
                });
            }
            account.current_gold -= price;
            account.inventory.push(item.id.to_string());
        }
    }

    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        username,
        AuditKind::Shop,
        &format!("Bought {} for {} gold", item.name, price),
    )?;

    Ok(Purchase::Item(PurchaseOutcome {
        item_id: item.id.to_string(),
        name: item.name.to_string(),
        price_paid: price,
        hp_restored,
        account: view,
    }))
}

/// Feed the pet: 10 gold buys +20 hunger and +10 happiness (both capped
/// at 100), 5 pet XP toward its own levels, and 5 XP for the owner.
pub fn feed_pet(store: &GameStore, username: &str) -> Result<FeedOutcome, GameError> {
    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(username)?;
    let Some(pet) = account.pet.as_ref() else {
        return Err(GameError::NoPet);
    };
    if pet.hunger >= 100 {
        return Err(GameError::PetFull);
    }
    if account.current_gold < PET_FEED_COST {
        return Err(GameError::InsufficientGold {
            needed: PET_FEED_COST,
            have: account.current_gold,
        });
    }

    account.current_gold -= PET_FEED_COST;
    let pet_name = {
        // Re-borrow mutably now that validation is done.
        let pet = account.pet.as_mut().ok_or(GameError::NoPet)?;
        pet.hunger = (pet.hunger + 20).min(100);
        pet.happiness = (pet.happiness + 10).min(100);
        pet.pet_xp += 5;
        while pet.pet_xp >= u64::from(pet.level) * 100 {
            pet.pet_xp -= u64::from(pet.level) * 100;
            pet.level += 1;
        }
        pet.name.clone()
    };
    let owner_xp = 5;
    let levels_gained = grant_xp(&mut account, owner_xp);

    let pet = account.pet.clone().ok_or(GameError::NoPet)?;
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        username,
        AuditKind::Shop,
        &format!("Fed {} (+20 hunger)", pet_name),
    )?;

    Ok(FeedOutcome {
        pet,
        owner_xp,
        levels_gained,
        account: view,
    })
}

/// Put an avatar asset into a slot. Assets that belong to a paid catalog
/// item must be owned and must go into the slot their kind maps to;
/// anything else (base faces, default clothes) passes through freely.
pub fn equip_item(
    store: &GameStore,
    username: &str,
    slot: AvatarSlot,
    asset_id: &str,
) -> Result<AccountView, GameError> {
    if asset_id.is_empty() || asset_id.len() > 64 {
        return Err(GameError::InvalidInput("bad asset id".to_string()));
    }

    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(username)?;
    if let Some(item) = item_for_asset(asset_id) {
        match slot_for_kind(item.kind) {
            Some(expected) if expected == slot => {}
            _ => {
                return Err(GameError::InvalidInput(format!(
                    "{} does not fit the {} slot",
                    asset_id,
                    slot.name()
                )));
            }
        }
        if item.cost > 0 && !account.owns_item(item.id) {
            return Err(GameError::NotOwned);
        }
    }

    account.avatar.set_slot(slot, asset_id);
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        username,
        AuditKind::System,
        &format!("Equipped {} as {}", asset_id, slot.name()),
    )?;
    Ok(view)
}
