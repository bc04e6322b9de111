use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const ACCOUNT_SCHEMA_VERSION: u8 = 1;
pub const ATTENDANCE_SCHEMA_VERSION: u8 = 1;
pub const QUEST_SCHEMA_VERSION: u8 = 1;

/// Access tiers mirror the numeric levels used for permission checks:
/// employee = 1, moderator = 5, manager = 10.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Moderator,
    Manager,
}

impl Role {
    pub fn access_level(&self) -> u8 {
        match self {
            Role::Employee => 1,
            Role::Moderator => 5,
            Role::Manager => 10,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Moderator => "moderator",
            Role::Manager => "manager",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Employee
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    Sunny,
    Rainy,
    Snowy,
    Heatwave,
    Foggy,
}

impl WeatherKind {
    pub fn name(&self) -> &'static str {
        match self {
            WeatherKind::Sunny => "Sunny",
            WeatherKind::Rainy => "Rainy",
            WeatherKind::Snowy => "Snowy",
            WeatherKind::Heatwave => "Heatwave",
            WeatherKind::Foggy => "Foggy",
        }
    }
}

impl Default for WeatherKind {
    fn default() -> Self {
        WeatherKind::Sunny
    }
}

/// Attendance classification for a clock-in, decided by wall-clock time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Ontime,
    Late,
    CriticalHit,
    EarlyBird,
}

impl AttendanceStatus {
    pub fn name(&self) -> &'static str {
        match self {
            AttendanceStatus::Ontime => "ontime",
            AttendanceStatus::Late => "late",
            AttendanceStatus::CriticalHit => "critical_hit",
            AttendanceStatus::EarlyBird => "early_bird",
        }
    }
}

/// Cosmetic slots on the avatar. Every account renders with all four base
/// slots filled; `accessory` is optional.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvatarConfig {
    pub hat: String,
    pub eyes: String,
    pub mouth: String,
    pub clothing: String,
    #[serde(default)]
    pub accessory: Option<String>,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            hat: "cap_red".to_string(),
            eyes: "normal".to_string(),
            mouth: "smile".to_string(),
            clothing: "apron_green".to_string(),
            accessory: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AvatarSlot {
    Hat,
    Eyes,
    Mouth,
    Clothing,
    Accessory,
}

impl AvatarSlot {
    pub fn name(&self) -> &'static str {
        match self {
            AvatarSlot::Hat => "hat",
            AvatarSlot::Eyes => "eyes",
            AvatarSlot::Mouth => "mouth",
            AvatarSlot::Clothing => "clothing",
            AvatarSlot::Accessory => "accessory",
        }
    }
}

impl AvatarConfig {
    pub fn set_slot(&mut self, slot: AvatarSlot, asset_id: &str) {
        match slot {
            AvatarSlot::Hat => self.hat = asset_id.to_string(),
            AvatarSlot::Eyes => self.eyes = asset_id.to_string(),
            AvatarSlot::Mouth => self.mouth = asset_id.to_string(),
            AvatarSlot::Clothing => self.clothing = asset_id.to_string(),
            AvatarSlot::Accessory => self.accessory = Some(asset_id.to_string()),
        }
    }
}

/// A companion pet. Hunger decays while working; a fed pet grants a passive
/// XP bonus scaled by its level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PetRecord {
    pub name: String,
    pub hunger: u8,
    pub happiness: u8,
    #[serde(default = "default_pet_level")]
    pub level: u32,
    #[serde(default)]
    pub pet_xp: u64,
}

fn default_pet_level() -> u32 {
    1
}

impl PetRecord {
    pub fn adopt(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hunger: 50,
            happiness: 100,
            level: 1,
            pet_xp: 0,
        }
    }
}

/// One account per user: identity, progression, economy, cooldowns, and
/// owned collections. Stored as a single bincode record keyed by username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub level: u32,
    pub current_xp: u64,
    pub skill_points: u32,
    pub current_gold: u64,
    pub current_hp: u32,
    pub total_hp: u32,
    pub streak: u32,
    /// Calendar date (YYYY-MM-DD) of the most recent clock-in, empty before
    /// the first one.
    #[serde(default)]
    pub last_login_date: String,
    #[serde(default)]
    pub last_spin_date: String,
    #[serde(default)]
    pub last_mystery_box_date: String,
    #[serde(default)]
    pub last_arcade_play: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default)]
    pub unlocked_skills: Vec<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
    pub avatar: AvatarConfig,
    #[serde(default)]
    pub pet: Option<PetRecord>,
    #[serde(default)]
    pub kudos_received: u32,
    /// Lifetime count of work actions, drives the workaholic achievement.
    #[serde(default)]
    pub shifts_worked: u64,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl Account {
    pub fn new(username: &str, display_name: &str, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: display_name.to_string(),
            role,
            level: 1,
            current_xp: 0,
            skill_points: 0,
            current_gold: 100,
            current_hp: 100,
            total_hp: 100,
            streak: 0,
            last_login_date: String::new(),
            last_spin_date: String::new(),
            last_mystery_box_date: String::new(),
            last_arcade_play: None,
            inventory: vec!["item_cap_red".to_string(), "item_apron_green".to_string()],
            unlocked_skills: Vec::new(),
            achievements: Vec::new(),
            avatar: AvatarConfig::default(),
            pet: None,
            kudos_received: 0,
            shifts_worked: 0,
            banned: false,
            password_hash: None,
            created_at: now,
            updated_at: now,
            schema_version: ACCOUNT_SCHEMA_VERSION,
        }
    }

    /// XP still required before the next level-up triggers.
    pub fn xp_to_next_level(&self) -> u64 {
        let threshold = u64::from(self.level) * 100;
        threshold.saturating_sub(self.current_xp)
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }

    pub fn owns_item(&self, id: &str) -> bool {
        self.inventory.iter().any(|i| i == id)
    }

    pub fn has_skill(&self, id: &str) -> bool {
        self.unlocked_skills.iter().any(|s| s == id)
    }

    /// Total XP this account has ever earned, counting levels already
    /// consumed by roll-over. Level n costs n*100 to clear.
    pub fn lifetime_xp(&self) -> u64 {
        let consumed: u64 = (1..u64::from(self.level)).map(|l| l * 100).sum();
        consumed + self.current_xp
    }
}

/// Wire-safe projection of an [`Account`]. This is what sessions and
/// reports hand out; it never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountView {
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub level: u32,
    pub current_xp: u64,
    pub xp_to_next_level: u64,
    pub skill_points: u32,
    pub current_gold: u64,
    pub current_hp: u32,
    pub total_hp: u32,
    pub streak: u32,
    pub last_login_date: String,
    pub inventory: Vec<String>,
    pub unlocked_skills: Vec<String>,
    pub achievements: Vec<String>,
    pub avatar: AvatarConfig,
    pub pet: Option<PetRecord>,
    pub kudos_received: u32,
    pub shifts_worked: u64,
    pub banned: bool,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            display_name: account.display_name.clone(),
            role: account.role,
            level: account.level,
            current_xp: account.current_xp,
            xp_to_next_level: account.xp_to_next_level(),
            skill_points: account.skill_points,
            current_gold: account.current_gold,
            current_hp: account.current_hp,
            total_hp: account.total_hp,
            streak: account.streak,
            last_login_date: account.last_login_date.clone(),
            inventory: account.inventory.clone(),
            unlocked_skills: account.unlocked_skills.clone(),
            achievements: account.achievements.clone(),
            avatar: account.avatar.clone(),
            pet: account.pet.clone(),
            kudos_received: account.kudos_received,
            shifts_worked: account.shifts_worked,
            banned: account.banned,
        }
    }
}

/// One attendance record per user per calendar date. Created on clock-in,
/// closed once by clock-out, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceRecord {
    pub id: String,
    pub username: String,
    /// Calendar date key (YYYY-MM-DD) in UTC.
    pub date: String,
    pub time_in: DateTime<Utc>,
    #[serde(default)]
    pub time_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub xp_earned: u64,
    pub schema_version: u8,
}

impl AttendanceRecord {
    pub fn open(username: &str, date: &str, time_in: DateTime<Utc>, status: AttendanceStatus, xp_earned: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            date: date.to_string(),
            time_in,
            time_out: None,
            status,
            xp_earned,
            schema_version: ATTENDANCE_SCHEMA_VERSION,
        }
    }

    pub fn is_open(&self) -> bool {
        self.time_out.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    Daily,
    Party,
    Urgent,
}

impl QuestKind {
    pub fn name(&self) -> &'static str {
        match self {
            QuestKind::Daily => "Daily",
            QuestKind::Party => "Party",
            QuestKind::Urgent => "Urgent",
        }
    }
}

/// A live quest in the shared pool, visible until it expires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub reward_gold: u64,
    pub reward_xp: u64,
    pub kind: QuestKind,
    pub expires_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl QuestRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
}

/// Per-(user, quest) completion claim awaiting manager review. Rejection
/// deletes the record so the quest can be submitted again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestSubmission {
    pub username: String,
    pub quest_id: String,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Joined view of a pending submission for the review queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingSubmission {
    pub username: String,
    pub display_name: String,
    pub quest_id: String,
    pub quest_title: String,
    pub reward_gold: u64,
    pub reward_xp: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Server-wide boss pool. Damaged by clock-ins, work actions, and quest
/// approvals; respawns at full HP once `respawn_at` passes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BossState {
    pub name: String,
    pub current_hp: u64,
    pub max_hp: u64,
    pub active: bool,
    pub description: String,
    #[serde(default)]
    pub respawn_at: Option<DateTime<Utc>>,
    /// Seconds between a kill and the respawn at full HP.
    #[serde(default = "default_respawn_delay")]
    pub respawn_delay_secs: i64,
}

fn default_respawn_delay() -> i64 {
    10
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GlobalEventKind {
    None,
    DoubleXp,
    HappyHour,
}

/// Server-wide multiplier pair, replaced wholesale by `set_global_event`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalModifiers {
    pub xp_multiplier: f64,
    pub gold_multiplier: f64,
    #[serde(default)]
    pub active_event: Option<String>,
}

impl Default for GlobalModifiers {
    fn default() -> Self {
        Self {
            xp_multiplier: 1.0,
            gold_multiplier: 1.0,
            active_event: None,
        }
    }
}

/// Passive skill effects as a closed set so multiplier folds stay
/// exhaustive under `match`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum SkillEffect {
    GoldBoost(f64),
    XpBoost(f64),
    ShopDiscount(f64),
    MaxHpBoost(u32),
}

/// Static skill catalog entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkillDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub cost: u32,
    pub effect: SkillEffect,
    pub required_level: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Hat,
    Eyes,
    Clothing,
    Accessory,
    Consumable,
    Pet,
}

impl ItemKind {
    /// Cosmetics live in the inventory; consumables and pets resolve at
    /// purchase time instead.
    pub fn is_cosmetic(&self) -> bool {
        !matches!(self, ItemKind::Consumable | ItemKind::Pet)
    }
}

/// Static shop catalog entry. `effect_value` is the heal amount for
/// consumables and unused otherwise.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShopItemDef {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ItemKind,
    pub asset_id: &'static str,
    pub cost: u64,
    pub description: &'static str,
    pub effect_value: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PrizeKind {
    Gold,
    Xp,
    /// Full heal regardless of the prize value.
    Hp,
}

/// One wheel segment. Draw probability is `weight / total_weight`, not
/// uniform per segment.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WheelPrize {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: PrizeKind,
    pub value: u64,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Clock,
    Work,
    Spin,
    Shop,
    Quest,
    Arcade,
    Admin,
    System,
}

impl AuditKind {
    pub fn name(&self) -> &'static str {
        match self {
            AuditKind::Clock => "CLOCK",
            AuditKind::Work => "WORK",
            AuditKind::Spin => "SPIN",
            AuditKind::Shop => "SHOP",
            AuditKind::Quest => "QUEST",
            AuditKind::Arcade => "ARCADE",
            AuditKind::Admin => "ADMIN",
            AuditKind::System => "SYSTEM",
        }
    }
}

/// Append-only audit record; one per mutating engine operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: String,
    pub username: String,
    pub kind: AuditKind,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate snapshot for the team dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamStats {
    pub total_users: usize,
    pub active_shifts: usize,
    pub total_gold_in_circulation: u64,
    pub total_xp_generated: u64,
    pub avg_hp: u32,
    #[serde(default)]
    pub top_earner: Option<String>,
    #[serde(default)]
    pub highest_level: Option<String>,
    #[serde(default)]
    pub most_kudos: Option<String>,
}

/// Calendar date key (YYYY-MM-DD, UTC) used for attendance and daily
/// cooldowns.
pub fn date_key(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

/// Parse a stored date key back into a date; `None` for the empty
/// "never" sentinel or malformed input.
pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    if key.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_account_defaults_match_onboarding() {
        let acct = Account::new("maria", "Maria", Role::Employee);
        assert_eq!(acct.level, 1);
        assert_eq!(acct.current_gold, 100);
        assert_eq!(acct.current_hp, 100);
        assert_eq!(acct.total_hp, 100);
        assert!(acct.owns_item("item_cap_red"));
        assert!(acct.owns_item("item_apron_green"));
        assert_eq!(acct.avatar.hat, "cap_red");
        assert!(acct.pet.is_none());
        assert!(!acct.banned);
    }

    #[test]
    fn date_key_is_utc_calendar_date() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(date_key(ts), "2024-03-09");
        assert_eq!(
            parse_date_key("2024-03-09"),
            Some(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
        );
        assert_eq!(parse_date_key(""), None);
    }

    #[test]
    fn lifetime_xp_counts_consumed_levels() {
        let mut acct = Account::new("maria", "Maria", Role::Employee);
        assert_eq!(acct.lifetime_xp(), 0);
        // Level 3 means levels 1 and 2 were cleared: 100 + 200.
        acct.level = 3;
        acct.current_xp = 40;
        assert_eq!(acct.lifetime_xp(), 340);
    }

    #[test]
    fn role_levels_are_ordered() {
        assert!(Role::Manager.access_level() > Role::Moderator.access_level());
        assert!(Role::Moderator.access_level() > Role::Employee.access_level());
    }
}
