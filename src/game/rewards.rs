//! The reward actions a clocked-in employee can take: working shifts,
//! taking breaks, the daily wheel spin, mystery boxes, and arcade runs.
//!
//! Work rewards pass through multipliers in a fixed order with flooring
//! at each step: skill boosts, then the global event multiplier, then
//! weather effects, then the pet bonus. Wheel, box, and arcade payouts
//! are flat and skip multipliers entirely.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::boss;
use crate::game::catalog::{
    wheel_total_weight, ARCADE_COOLDOWN_MINUTES, MYSTERY_BOX_COST, WHEEL_PRIZES,
};
use crate::game::errors::GameError;
use crate::game::leveling::{check_achievements, grant_xp, scale};
use crate::game::skills::{skill_multiplier, SkillBonus};
use crate::game::types::{
    date_key, AccountView, AuditKind, PrizeKind, WeatherKind, WheelPrize,
};
use crate::storage::{unpoison, GameStore};

/// Largest arcade score the server will accept in one session.
const MAX_ARCADE_SCORE: u64 = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOutcome {
    pub gold_earned: u64,
    pub xp_earned: u64,
    pub hp_spent: u32,
    pub weather: WeatherKind,
    /// Foggy-day jackpot: the 10% chance that quintuples the gold roll.
    pub lucky_find: bool,
    pub pet_bonus_xp: u64,
    pub levels_gained: u32,
    pub new_achievements: Vec<String>,
    pub boss_message: Option<String>,
    pub account: AccountView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakOutcome {
    pub hp_recovered: u32,
    pub current_hp: u32,
    pub weather: WeatherKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub prize_id: String,
    pub label: String,
    pub kind: PrizeKind,
    pub value: u64,
    pub levels_gained: u32,
    pub new_achievements: Vec<String>,
    pub account: AccountView,
}

/// What fell out of a mystery box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "amount")]
pub enum MysteryReward {
    Gold(u64),
    Xp(u64),
    FullHeal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MysteryBoxOutcome {
    pub reward: MysteryReward,
    pub levels_gained: u32,
    pub new_achievements: Vec<String>,
    pub account: AccountView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArcadeOutcome {
    pub score: u64,
    pub gold_earned: u64,
    pub xp_earned: u64,
    pub levels_gained: u32,
    pub new_achievements: Vec<String>,
    pub account: AccountView,
}

/// HP drained by one work action under the given weather.
pub fn work_hp_cost(weather: WeatherKind) -> u32 {
    match weather {
        WeatherKind::Sunny | WeatherKind::Rainy | WeatherKind::Foggy => 2,
        WeatherKind::Heatwave => 4,
        WeatherKind::Snowy => 5,
    }
}

/// Serve customers for one work action: costs HP, rolls 1 to 3 gold,
/// grants 5 XP, feeds the multiplier pipeline, decays pet hunger, and
/// chips one HP off the boss.
pub fn perform_work(
    store: &GameStore,
    username: &str,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<WorkOutcome, GameError> {
    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let today = date_key(now);
    let open_shift = store
        .get_attendance(username, &today)?
        .map(|r| r.is_open())
        .unwrap_or(false);
    if !open_shift {
        return Err(GameError::ShiftNotActive);
    }

    let mut account = store.get_account(username)?;
    let weather = store.weather()?;
    let hp_cost = work_hp_cost(weather);
    if account.current_hp < hp_cost {
        return Err(GameError::TooTired);
    }

    let modifiers = store.modifiers()?;
    let mut gold: u64 = rng.gen_range(1..=3);
    let mut xp: u64 = 5;

    gold = scale(gold, skill_multiplier(&account, SkillBonus::Gold));
    xp = scale(xp, skill_multiplier(&account, SkillBonus::Xp));
    gold = scale(gold, modifiers.gold_multiplier);
    xp = scale(xp, modifiers.xp_multiplier);

    let mut lucky_find = false;
    match weather {
        WeatherKind::Heatwave => gold = scale(gold, 1.5),
        WeatherKind::Snowy => xp = scale(xp, 1.5),
        WeatherKind::Foggy => {
            if rng.gen::<f64>() < 0.10 {
                gold *= 5;
                lucky_find = true;
            }
        }
        WeatherKind::Sunny | WeatherKind::Rainy => {}
    }

    let mut pet_bonus_xp = 0;
    if let Some(pet) = account.pet.as_mut() {
        if pet.hunger > 20 {
            pet_bonus_xp = 2 * u64::from(pet.level);
            xp += pet_bonus_xp;
        }
        pet.hunger = pet.hunger.saturating_sub(1);
    }

    account.current_hp -= hp_cost;
    account.current_gold = account.current_gold.saturating_add(gold);
    account.shifts_worked += 1;
    let levels_gained = grant_xp(&mut account, xp);
    let boss_message = boss::damage_with(store, &mut account, 1, now)?;
    let new_achievements: Vec<String> = check_achievements(&mut account)
        .into_iter()
        .map(str::to_string)
        .collect();
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        username,
        AuditKind::Work,
        &format!("Worked a shift (+{} gold, +{} XP)", gold, xp),
    )?;

    Ok(WorkOutcome {
        gold_earned: gold,
        xp_earned: xp,
        hp_spent: hp_cost,
        weather,
        lucky_find,
        pet_bonus_xp,
        levels_gained,
        new_achievements,
        boss_message,
        account: view,
    })
}

/// Rest during a shift: +15 HP, or +25 on a rainy day, capped at max.
pub fn take_break(
    store: &GameStore,
    username: &str,
    now: DateTime<Utc>,
) -> Result<BreakOutcome, GameError> {
    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let today = date_key(now);
    let open_shift = store
        .get_attendance(username, &today)?
        .map(|r| r.is_open())
        .unwrap_or(false);
    if !open_shift {
        return Err(GameError::ShiftNotActive);
    }

    let mut account = store.get_account(username)?;
    let weather = store.weather()?;
    let heal: u32 = if weather == WeatherKind::Rainy { 25 } else { 15 };

    let before = account.current_hp;
    account.current_hp = (account.current_hp + heal).min(account.total_hp);
    let recovered = account.current_hp - before;
    let current_hp = account.current_hp;
    store.put_account(account)?;
    store.append_audit(
        username,
        AuditKind::Work,
        &format!("Took a break (+{} HP)", recovered),
    )?;

    Ok(BreakOutcome {
        hp_recovered: recovered,
        current_hp,
        weather,
    })
}

/// Resolve a wheel roll into its prize segment. `roll` must be drawn
/// from `[0, wheel_total_weight())`; the cumulative walk maps each
/// integer to exactly one segment.
pub fn draw_prize(roll: u32) -> &'static WheelPrize {
    let mut cursor = roll;
    for prize in WHEEL_PRIZES.iter() {
        if cursor < prize.weight {
            return prize;
        }
        cursor -= prize.weight;
    }
    &WHEEL_PRIZES[WHEEL_PRIZES.len() - 1]
}

/// Spin the daily prize wheel. One spin per calendar date; prizes are
/// paid flat, with the full-heal segment restoring HP to max.
pub fn spin_wheel(
    store: &GameStore,
    username: &str,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<SpinOutcome, GameError> {
    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let today = date_key(now);
    let mut account = store.get_account(username)?;
    if account.last_spin_date == today {
        return Err(GameError::AlreadySpun);
    }

    let roll = rng.gen_range(0..wheel_total_weight());
    let prize = draw_prize(roll);
    let mut levels_gained = 0;
    match prize.kind {
        PrizeKind::Gold => {
            account.current_gold = account.current_gold.saturating_add(prize.value);
        }
        PrizeKind::Xp => {
            levels_gained = grant_xp(&mut account, prize.value);
        }
        PrizeKind::Hp => {
            account.current_hp = account.total_hp;
        }
    }
    account.last_spin_date = today;
    let new_achievements: Vec<String> = check_achievements(&mut account)
        .into_iter()
        .map(str::to_string)
        .collect();
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(username, AuditKind::Spin, &format!("Won {}", prize.label))?;

    Ok(SpinOutcome {
        prize_id: prize.id.to_string(),
        label: prize.label.to_string(),
        kind: prize.kind,
        value: prize.value,
        levels_gained,
        new_achievements,
        account: view,
    })
}

/// Map a uniform roll in `[0, 1)` to a mystery box reward: 30% gold
/// jackpot, 30% XP surge, 40% full heal.
pub fn mystery_reward(roll: f64) -> MysteryReward {
    if roll < 0.3 {
        MysteryReward::Gold(200)
    } else if roll < 0.6 {
        MysteryReward::Xp(100)
    } else {
        MysteryReward::FullHeal
    }
}

/// Buy and open a mystery box: 100 gold, one per calendar date.
pub fn buy_mystery_box(
    store: &GameStore,
    username: &str,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<MysteryBoxOutcome, GameError> {
    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let today = date_key(now);
    let mut account = store.get_account(username)?;
    if account.last_mystery_box_date == today {
        return Err(GameError::MysteryBoxCooldown);
    }
    if account.current_gold < MYSTERY_BOX_COST {
        return Err(GameError::InsufficientGold {
            needed: MYSTERY_BOX_COST,
            have: account.current_gold,
        });
    }

    account.current_gold -= MYSTERY_BOX_COST;
    let reward = mystery_reward(rng.gen::<f64>());
    let mut levels_gained = 0;
    let summary = match reward {
        MysteryReward::Gold(amount) => {
            account.current_gold = account.current_gold.saturating_add(amount);
            format!("{} gold", amount)
        }
        MysteryReward::Xp(amount) => {
            levels_gained = grant_xp(&mut account, amount);
            format!("{} XP", amount)
        }
        MysteryReward::FullHeal => {
            account.current_hp = account.total_hp;
            "a full heal".to_string()
        }
    };
    account.last_mystery_box_date = today;
    let new_achievements: Vec<String> = check_achievements(&mut account)
        .into_iter()
        .map(str::to_string)
        .collect();
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        username,
        AuditKind::Shop,
        &format!("Opened a mystery box: {}", summary),
    )?;

    Ok(MysteryBoxOutcome {
        reward,
        levels_gained,
        new_achievements,
        account: view,
    })
}

/// Record a finished arcade run. Scores convert flat (gold = score/10,
/// XP = score/5) behind a two-hour cooldown.
pub fn record_arcade_play(
    store: &GameStore,
    username: &str,
    score: u64,
    now: DateTime<Utc>,
) -> Result<ArcadeOutcome, GameError> {
    if score > MAX_ARCADE_SCORE {
        return Err(GameError::InvalidInput(format!(
            "arcade score {} is out of range",
            score
        )));
    }

    let lock = store.account_lock(username);
    let _guard = unpoison(lock.lock());

    let mut account = store.get_account(username)?;
    if let Some(last) = account.last_arcade_play {
        let elapsed = now - last;
        if elapsed < Duration::minutes(ARCADE_COOLDOWN_MINUTES) {
            let remaining_mins = (ARCADE_COOLDOWN_MINUTES - elapsed.num_minutes()).max(1);
            return Err(GameError::ArcadeCoolingDown { remaining_mins });
        }
    }

    let gold = score / 10;
    let xp = score / 5;
    account.current_gold = account.current_gold.saturating_add(gold);
    let levels_gained = grant_xp(&mut account, xp);
    account.last_arcade_play = Some(now);
    let new_achievements: Vec<String> = check_achievements(&mut account)
        .into_iter()
        .map(str::to_string)
        .collect();
    let view = AccountView::from(&account);
    store.put_account(account)?;
    store.append_audit(
        username,
        AuditKind::Arcade,
        &format!("Arcade run scored {} (+{} gold, +{} XP)", score, gold, xp),
    )?;

    Ok(ArcadeOutcome {
        score,
        gold_earned: gold,
        xp_earned: xp,
        levels_gained,
        new_achievements,
        account: view,
    })
}
