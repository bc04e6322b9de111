//! Manager-controlled world state: global reward events, the weather,
//! and the message of the day.
//!
//! Events are a closed set of presets rather than free-form multipliers,
//! so a typo can never 100x the economy. Setting an event replaces the
//! whole modifier pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::admin::require_role;
use crate::game::boss;
use crate::game::errors::GameError;
use crate::game::quests::active_quests;
use crate::game::types::{
    AuditKind, BossState, GlobalEventKind, GlobalModifiers, QuestRecord, Role, WeatherKind,
};
use crate::storage::{unpoison, GameStore};

const MAX_MOTD_LEN: usize = 500;

/// Shared world state bundle handed to clients on login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldState {
    pub weather: WeatherKind,
    pub motd: String,
    pub modifiers: GlobalModifiers,
    pub overdrive: bool,
    pub boss: BossState,
    pub quests: Vec<QuestRecord>,
}

/// The fixed modifier preset each event maps to.
pub fn modifiers_for_event(kind: GlobalEventKind) -> GlobalModifiers {
    match kind {
        GlobalEventKind::None => GlobalModifiers::default(),
        GlobalEventKind::DoubleXp => GlobalModifiers {
            xp_multiplier: 2.0,
            gold_multiplier: 1.0,
            active_event: Some("Training Day (2x XP)".to_string()),
        },
        GlobalEventKind::HappyHour => GlobalModifiers {
            xp_multiplier: 1.0,
            gold_multiplier: 2.0,
            active_event: Some("Happy Hour (2x Gold)".to_string()),
        },
    }
}

/// Switch the active global event. Managers only.
pub fn set_global_event(
    store: &GameStore,
    actor: &str,
    kind: GlobalEventKind,
) -> Result<GlobalModifiers, GameError> {
    require_role(store, actor, Role::Manager)?;

    let lock = store.globals_lock();
    let _guard = unpoison(lock.lock());

    let modifiers = modifiers_for_event(kind);
    store.put_modifiers(&modifiers)?;
    let label = modifiers
        .active_event
        .clone()
        .unwrap_or_else(|| "no event".to_string());
    store.append_audit(actor, AuditKind::Admin, &format!("Set global event: {}", label))?;
    Ok(modifiers)
}

/// Change the weather. Managers only.
pub fn set_weather(
    store: &GameStore,
    actor: &str,
    weather: WeatherKind,
) -> Result<WeatherKind, GameError> {
    require_role(store, actor, Role::Manager)?;

    let lock = store.globals_lock();
    let _guard = unpoison(lock.lock());

    store.put_weather(weather)?;
    store.append_audit(
        actor,
        AuditKind::Admin,
        &format!("Set weather to {}", weather.name()),
    )?;
    Ok(weather)
}

/// Flip the overdrive flag (2x XP on clock-in while on). The flag lives
/// server-side so clients cannot claim the bonus on their own. Managers
/// only. Returns the new state.
pub fn toggle_overdrive(store: &GameStore, actor: &str) -> Result<bool, GameError> {
    require_role(store, actor, Role::Manager)?;

    let lock = store.globals_lock();
    let _guard = unpoison(lock.lock());

    let on = !store.overdrive()?;
    store.put_overdrive(on)?;
    store.append_audit(
        actor,
        AuditKind::Admin,
        if on { "Overdrive ON" } else { "Overdrive OFF" },
    )?;
    Ok(on)
}

/// Replace the message of the day. Managers only.
pub fn set_motd(store: &GameStore, actor: &str, motd: &str) -> Result<String, GameError> {
    require_role(store, actor, Role::Manager)?;

    let motd = motd.trim();
    if motd.is_empty() || motd.len() > MAX_MOTD_LEN {
        return Err(GameError::InvalidInput(format!(
            "motd must be 1 to {} characters",
            MAX_MOTD_LEN
        )));
    }

    let lock = store.globals_lock();
    let _guard = unpoison(lock.lock());

    store.put_motd(motd)?;
    store.append_audit(actor, AuditKind::Admin, "Updated the message of the day")?;
    Ok(motd.to_string())
}

/// Assemble the world bundle: weather, MOTD, modifiers, the boss (with
/// any due respawn applied), and the live quest list.
pub fn world_snapshot(store: &GameStore, now: DateTime<Utc>) -> Result<WorldState, GameError> {
    Ok(WorldState {
        weather: store.weather()?,
        motd: store.motd()?,
        modifiers: store.modifiers()?,
        overdrive: store.overdrive()?,
        boss: boss::boss_state(store, now)?,
        quests: active_quests(store, now)?,
    })
}
