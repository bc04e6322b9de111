//! Request routing for the JSON-lines protocol.
//!
//! One request per line, shaped `{"op": "clock_in", ...}`; one response per
//! line, shaped `{"ok": true, "data": ...}` on success or
//! `{"ok": false, "error": "<kind>", "message": "..."}` on failure. Error
//! kinds are the engine's [`GameError::kind`] strings, so clients can match
//! on them without parsing prose.
//!
//! Authentication is connection-scoped: `login`/`register` bind the session
//! to an account, and every subsequent request re-loads that account, so a
//! ban or deletion cuts the session off at its next request. Role checks
//! stay inside the engine; dispatch only decides who the actor is.

use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::game::{
    self, AccountView, AvatarSlot, GameError, GlobalEventKind, NewQuest, QuestKind, Role,
    WeatherKind,
};
use crate::logutil::escape_log;
use crate::server::sec_log;
use crate::server::session::Session;
use crate::storage::GameStore;

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const DEFAULT_AUDIT_LIMIT: usize = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Register {
        username: String,
        display_name: Option<String>,
        password: String,
    },
    Login {
        username: String,
        password: String,
    },
    Logout,
    Quit,
    Me,
    World,
    ClockIn,
    ClockOut,
    Work,
    TakeBreak,
    SpinWheel,
    BuyMysteryBox,
    ArcadePlay {
        score: u64,
    },
    BuyItem {
        item_id: String,
    },
    EquipItem {
        slot: AvatarSlot,
        asset_id: String,
    },
    UnlockSkill {
        skill_id: String,
    },
    FeedPet,
    Quests,
    SubmitQuest {
        quest_id: String,
    },
    SendKudos {
        to: String,
    },
    Leaderboard {
        limit: Option<usize>,
    },
    TeamStats,
    PendingSubmissions,
    ApproveQuest {
        username: String,
        quest_id: String,
    },
    RejectQuest {
        username: String,
        quest_id: String,
    },
    CreateQuest {
        title: String,
        description: String,
        reward_gold: u64,
        reward_xp: u64,
        kind: QuestKind,
        window_hours: Option<i64>,
    },
    SetWeather {
        weather: WeatherKind,
    },
    SetGlobalEvent {
        event: GlobalEventKind,
    },
    SetMotd {
        motd: String,
    },
    ToggleOverdrive,
    GiveBonus {
        username: String,
        gold: u64,
        xp: u64,
    },
    PunishUser {
        username: String,
        gold: Option<u64>,
        xp: Option<u64>,
        hp: Option<u32>,
    },
    ToggleBan {
        username: String,
    },
    UpdateAccount {
        username: String,
        display_name: Option<String>,
        role: Option<Role>,
    },
    DeleteAccount {
        username: String,
    },
    AuditLog {
        offset: Option<usize>,
        limit: Option<usize>,
    },
    ExportAttendance,
}

#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn success(data: Value) -> Self {
        Response {
            ok: true,
            error: None,
            message: None,
            data: Some(data),
        }
    }

    pub fn empty() -> Self {
        Response {
            ok: true,
            error: None,
            message: None,
            data: None,
        }
    }

    pub fn failure(kind: &'static str, message: impl Into<String>) -> Self {
        Response {
            ok: false,
            error: Some(kind),
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn from_error(err: &GameError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }
}

/// Parse one wire line and run it. Never panics and never returns an
/// unserializable response; protocol garbage comes back as `bad_request`.
pub fn handle_line(
    store: &GameStore,
    config: &Config,
    session: &mut Session,
    line: &str,
) -> Response {
    debug!(
        "session {}: {}",
        &session.id[..8],
        escape_log(line)
    );
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return Response::failure("bad_request", format!("malformed request: {}", e));
        }
    };
    match dispatch(store, config, session, request) {
        Ok(response) => response,
        Err(err) => Response::from_error(&err),
    }
}

fn dispatch(
    store: &GameStore,
    config: &Config,
    session: &mut Session,
    request: Request,
) -> Result<Response, GameError> {
    let now = Utc::now();
    match request {
        Request::Ping => Ok(Response::success(serde_json::json!({
            "server": "gowork",
            "version": env!("CARGO_PKG_VERSION"),
        }))),

        Request::Register {
            username,
            display_name,
            password,
        } => {
            let allowed = config
                .security
                .as_ref()
                .map_or(true, |s| s.allow_registration);
            if !allowed {
                return Err(GameError::PermissionDenied(
                    "registration is disabled on this server".to_string(),
                ));
            }
            let display = display_name.unwrap_or_else(|| username.clone());
            let account = store.register_account(&username, &display, &password, Role::Employee)?;
            session.login(account.username.clone(), account.role);
            info!("session {}: registered {}", &session.id[..8], account.username);
            to_response(&AccountView::from(&account))
        }

        Request::Login { username, password } => {
            let account = store.verify_login(&username, &password)?;
            session.login(account.username.clone(), account.role);
            info!("session {}: login {}", &session.id[..8], account.username);
            to_response(&AccountView::from(&account))
        }

        Request::Logout => {
            if session.is_logged_in() {
                info!("session {}: logout {}", &session.id[..8], session.display_name());
            }
            session.logout();
            Ok(Response::empty())
        }

        Request::Quit => {
            session.logout();
            session.request_close();
            Ok(Response::empty())
        }

        Request::Me => {
            let username = authed(store, session)?;
            let account = store.get_account(&username)?;
            to_response(&AccountView::from(&account))
        }

        // World state is readable before login so clients can show the
        // MOTD and weather on their sign-in screen.
        Request::World => to_response(&game::world_snapshot(store, now)?),

        Request::ClockIn => {
            let username = authed(store, session)?;
            let overdrive = store.overdrive()?;
            to_response(&game::clock_in(store, &username, now, overdrive)?)
        }

        Request::ClockOut => {
            let username = authed(store, session)?;
            to_response(&game::clock_out(store, &username, now)?)
        }

        Request::Work => {
            let username = authed(store, session)?;
            to_response(&game::perform_work(
                store,
                &username,
                now,
                &mut rand::thread_rng(),
            )?)
        }

        Request::TakeBreak => {
            let username = authed(store, session)?;
            to_response(&game::take_break(store, &username, now)?)
        }

        Request::SpinWheel => {
            let username = authed(store, session)?;
            to_response(&game::spin_wheel(
                store,
                &username,
                now,
                &mut rand::thread_rng(),
            )?)
        }

        Request::BuyMysteryBox => {
            let username = authed(store, session)?;
            to_response(&game::buy_mystery_box(
                store,
                &username,
                now,
                &mut rand::thread_rng(),
            )?)
        }

        Request::ArcadePlay { score } => {
            let username = authed(store, session)?;
            to_response(&game::record_arcade_play(store, &username, score, now)?)
        }

        Request::BuyItem { item_id } => {
            let username = authed(store, session)?;
            to_response(&game::buy_item(
                store,
                &username,
                &item_id,
                now,
                &mut rand::thread_rng(),
            )?)
        }

        Request::EquipItem { slot, asset_id } => {
            let username = authed(store, session)?;
            to_response(&game::equip_item(store, &username, slot, &asset_id)?)
        }

        Request::UnlockSkill { skill_id } => {
            let username = authed(store, session)?;
            to_response(&game::unlock_skill(store, &username, &skill_id)?)
        }

        Request::FeedPet => {
            let username = authed(store, session)?;
            to_response(&game::feed_pet(store, &username)?)
        }

        Request::Quests => {
            authed(store, session)?;
            // Reads top up the pool so the board never looks empty.
            game::refresh_quest_pool(store, now, &mut rand::thread_rng())?;
            to_response(&game::active_quests(store, now)?)
        }

        Request::SubmitQuest { quest_id } => {
            let username = authed(store, session)?;
            to_response(&game::submit_quest(store, &username, &quest_id, now)?)
        }

        Request::SendKudos { to } => {
            let username = authed(store, session)?;
            let total = game::send_kudos(store, &username, &to)?;
            Ok(Response::success(serde_json::json!({
                "to": to,
                "kudos_received": total,
                "xp_granted": game::catalog::KUDOS_XP,
            })))
        }

        Request::Leaderboard { limit } => {
            authed(store, session)?;
            let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
            to_response(&game::leaderboard(store, limit)?)
        }

        Request::TeamStats => {
            authed(store, session)?;
            to_response(&game::team_stats(store, now)?)
        }

        Request::PendingSubmissions => {
            let actor = authed(store, session)?;
            to_response(&game::pending_submissions(store, &actor)?)
        }

        Request::ApproveQuest { username, quest_id } => {
            let actor = authed(store, session)?;
            to_response(&game::approve_quest(store, &actor, &username, &quest_id, now)?)
        }

        Request::RejectQuest { username, quest_id } => {
            let actor = authed(store, session)?;
            game::reject_quest(store, &actor, &username, &quest_id)?;
            Ok(Response::empty())
        }

        Request::CreateQuest {
            title,
            description,
            reward_gold,
            reward_xp,
            kind,
            window_hours,
        } => {
            let actor = authed(store, session)?;
            let new_quest = NewQuest {
                title,
                description,
                reward_gold,
                reward_xp,
                kind,
                window_hours,
            };
            to_response(&game::create_quest(store, &actor, new_quest, now)?)
        }

        Request::SetWeather { weather } => {
            let actor = authed(store, session)?;
            let weather = game::set_weather(store, &actor, weather)?;
            Ok(Response::success(serde_json::json!({ "weather": weather })))
        }

        Request::SetGlobalEvent { event } => {
            let actor = authed(store, session)?;
            to_response(&game::set_global_event(store, &actor, event)?)
        }

        Request::SetMotd { motd } => {
            let actor = authed(store, session)?;
            let motd = game::set_motd(store, &actor, &motd)?;
            Ok(Response::success(serde_json::json!({ "motd": motd })))
        }

        Request::ToggleOverdrive => {
            let actor = authed(store, session)?;
            let on = game::toggle_overdrive(store, &actor)?;
            Ok(Response::success(serde_json::json!({ "overdrive": on })))
        }

        Request::GiveBonus { username, gold, xp } => {
            let actor = authed(store, session)?;
            to_response(&game::give_bonus(store, &actor, &username, gold, xp)?)
        }

        Request::PunishUser {
            username,
            gold,
            xp,
            hp,
        } => {
            let actor = authed(store, session)?;
            to_response(&game::punish_user(
                store,
                &actor,
                &username,
                gold.unwrap_or(0),
                xp.unwrap_or(0),
                hp.unwrap_or(0),
            )?)
        }

        Request::ToggleBan { username } => {
            let actor = authed(store, session)?;
            let banned = game::toggle_ban(store, &actor, &username)?;
            Ok(Response::success(serde_json::json!({
                "username": username,
                "banned": banned,
            })))
        }

        Request::UpdateAccount {
            username,
            display_name,
            role,
        } => {
            let actor = authed(store, session)?;
            to_response(&game::update_account(
                store,
                &actor,
                &username,
                display_name,
                role,
            )?)
        }

        Request::DeleteAccount { username } => {
            let actor = authed(store, session)?;
            game::delete_account(store, &actor, &username)?;
            Ok(Response::empty())
        }

        Request::AuditLog { offset, limit } => {
            let actor = authed(store, session)?;
            to_response(&game::audit_log(
                store,
                &actor,
                offset.unwrap_or(0),
                limit.unwrap_or(DEFAULT_AUDIT_LIMIT),
            )?)
        }

        Request::ExportAttendance => {
            let actor = authed(store, session)?;
            let csv = game::export_attendance_csv(store, &actor)?;
            Ok(Response::success(serde_json::json!({ "csv": csv })))
        }
    }
}

/// Resolve the acting account for an authenticated request. Re-loads the
/// account so bans and deletions apply immediately; either one unbinds the
/// session.
fn authed(store: &GameStore, session: &mut Session) -> Result<String, GameError> {
    let Some(username) = session.username.clone() else {
        return Err(GameError::PermissionDenied("login required".to_string()));
    };
    let account = match store.get_account(&username) {
        Ok(account) => account,
        Err(err) => {
            session.logout();
            return Err(err);
        }
    };
    if account.banned {
        sec_log!("session cut (banned): {}", username);
        session.logout();
        return Err(GameError::Banned);
    }
    Ok(username)
}

fn to_response<T: Serialize>(value: &T) -> Result<Response, GameError> {
    let data = serde_json::to_value(value).map_err(|e| GameError::Internal(e.to_string()))?;
    Ok(Response::success(data))
}
