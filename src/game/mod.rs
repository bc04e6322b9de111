//! Game engine: progression, economy, and shared world state.
//!
//! Operations are free functions over [`crate::storage::GameStore`].
//! Every mutating operation takes the per-account lock for its whole
//! read-modify-write window, validates before mutating, and appends one
//! audit entry on success. Lock order is always account first, then
//! globals; nothing takes them the other way around.
//!
//! Time never comes from the clock inside the engine. Callers pass
//! `now` explicitly, which keeps cooldowns and date gates testable and
//! makes the server the only source of truth for time.

pub mod admin;
pub mod boss;
pub mod catalog;
pub mod clock;
pub mod errors;
pub mod globals;
pub mod leveling;
pub mod quests;
pub mod rewards;
pub mod shop;
pub mod skills;
pub mod team;
pub mod types;

pub use admin::{
    audit_log, delete_account, give_bonus, punish_user, require_role, toggle_ban, update_account,
    BonusOutcome, PenaltyOutcome,
};
pub use boss::{boss_state, damage_with, ensure_respawned};
pub use clock::{classify_clock_in, clock_in, clock_out, next_streak, ClockInOutcome};
pub use errors::GameError;
pub use globals::{
    modifiers_for_event, set_global_event, set_motd, set_weather, toggle_overdrive, world_snapshot,
    WorldState,
};
pub use leveling::{apply_level_ups, award_achievement, check_achievements, grant_xp, scale};
pub use quests::{
    active_quests, approve_quest, create_quest, pending_submissions, refresh_quest_pool,
    reject_quest, submit_quest, ApprovalOutcome, NewQuest,
};
pub use rewards::{
    buy_mystery_box, draw_prize, mystery_reward, perform_work, record_arcade_play, spin_wheel,
    take_break, work_hp_cost, ArcadeOutcome, BreakOutcome, MysteryBoxOutcome, MysteryReward,
    SpinOutcome, WorkOutcome,
};
pub use shop::{buy_item, discounted_price, equip_item, feed_pet, FeedOutcome, Purchase, PurchaseOutcome};
pub use skills::{skill_multiplier, unlock_skill, SkillBonus};
pub use team::{export_attendance_csv, leaderboard, send_kudos, team_stats};
pub use types::*;
