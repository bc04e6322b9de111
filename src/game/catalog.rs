//! Static game catalogs: skills, shop items, achievements, wheel prizes,
//! quest templates, and the default boss. These tables are the tuning
//! surface of the whole economy; everything else looks values up here.
//!
//! Wheel odds (weight / 100):
//! - 10 Gold  25%
//! - 50 Gold  20%
//! - 100 Gold 10%
//! - 250 Gold  4%
//! - 50 XP    20%
//! - 100 XP   11%
//! - Full HP  10%

use super::types::{
    AchievementDef, BossState, ItemKind, PrizeKind, QuestKind, ShopItemDef, SkillDef, SkillEffect,
    WheelPrize,
};

/// Reserved shop id that routes `buy_item` into the mystery box flow.
pub const MYSTERY_BOX_ITEM_ID: &str = "mystery_box";
/// Mystery box price in gold.
pub const MYSTERY_BOX_COST: u64 = 100;
/// Gold paid to whoever lands the killing blow on the boss.
pub const BOSS_KILL_GOLD: u64 = 500;
/// Feeding the pet costs this much gold.
pub const PET_FEED_COST: u64 = 10;
/// XP granted to whoever receives a kudos.
pub const KUDOS_XP: u64 = 10;
/// Work actions needed for the workaholic achievement.
pub const HARD_WORKER_THRESHOLD: u64 = 50;
/// Gold threshold for the capitalist achievement.
pub const RICH_THRESHOLD: u64 = 1000;
/// Streak length for the on-fire achievement.
pub const STREAK_ACHIEVEMENT_AT: u32 = 3;
/// Minimum size the active quest pool is refilled to.
pub const QUEST_POOL_MIN: usize = 3;
/// Visibility window for generated quests, in hours.
pub const QUEST_WINDOW_HOURS: i64 = 12;

/// Minimum gap between scored arcade sessions.
pub const ARCADE_COOLDOWN_MINUTES: i64 = 120;

pub const SKILL_TREE: [SkillDef; 4] = [
    SkillDef {
        id: "skill_barista_mastery",
        name: "Barista Mastery",
        description: "Earn 20% more Gold from serving customers.",
        cost: 1,
        effect: SkillEffect::GoldBoost(0.2),
        required_level: 2,
    },
    SkillDef {
        id: "skill_iron_lungs",
        name: "Iron Lungs",
        description: "+20 Max HP. Work harder, longer.",
        cost: 1,
        effect: SkillEffect::MaxHpBoost(20),
        required_level: 3,
    },
    SkillDef {
        id: "skill_charisma",
        name: "Charisma",
        description: "Shop items cost 15% less.",
        cost: 2,
        effect: SkillEffect::ShopDiscount(0.15),
        required_level: 5,
    },
    SkillDef {
        id: "skill_fast_learner",
        name: "Fast Learner",
        description: "Gain 10% more XP from all sources.",
        cost: 3,
        effect: SkillEffect::XpBoost(0.1),
        required_level: 8,
    },
];

pub const SHOP_ITEMS: [ShopItemDef; 11] = [
    ShopItemDef {
        id: "item_cap_red",
        name: "Red Cap",
        kind: ItemKind::Hat,
        asset_id: "cap_red",
        cost: 50,
        description: "Classic pizza delivery vibes.",
        effect_value: 0,
    },
    ShopItemDef {
        id: "item_cap_blue",
        name: "Blue Cap",
        kind: ItemKind::Hat,
        asset_id: "cap_blue",
        cost: 50,
        description: "Cool and collected.",
        effect_value: 0,
    },
    ShopItemDef {
        id: "item_crown",
        name: "Golden Crown",
        kind: ItemKind::Hat,
        asset_id: "crown_gold",
        cost: 500,
        description: "For the shift manager.",
        effect_value: 0,
    },
    ShopItemDef {
        id: "item_shades",
        name: "Cool Shades",
        kind: ItemKind::Eyes,
        asset_id: "sunglasses",
        cost: 100,
        description: "Block out the haters.",
        effect_value: 0,
    },
    ShopItemDef {
        id: "item_monocle",
        name: "Monocle",
        kind: ItemKind::Eyes,
        asset_id: "monocle",
        cost: 250,
        description: "Quite fancy.",
        effect_value: 0,
    },
    ShopItemDef {
        id: "item_apron_green",
        name: "Green Apron",
        kind: ItemKind::Clothing,
        asset_id: "apron_green",
        cost: 0,
        description: "Standard issue.",
        effect_value: 0,
    },
    ShopItemDef {
        id: "item_suit",
        name: "Tuxedo",
        kind: ItemKind::Clothing,
        asset_id: "suit_black",
        cost: 1000,
        description: "Dressed to impress.",
        effect_value: 0,
    },
    ShopItemDef {
        id: "pet_dog",
        name: "Office Dog",
        kind: ItemKind::Pet,
        asset_id: "dog_voxel",
        cost: 500,
        description: "Adopts a loyal companion. Grants passive XP bonus when fed.",
        effect_value: 0,
    },
    ShopItemDef {
        id: "cons_coffee",
        name: "Black Coffee",
        kind: ItemKind::Consumable,
        asset_id: "coffee",
        cost: 15,
        description: "Instantly restore 20 HP.",
        effect_value: 20,
    },
    ShopItemDef {
        id: "cons_donut",
        name: "Glazed Donut",
        kind: ItemKind::Consumable,
        asset_id: "donut",
        cost: 25,
        description: "Instantly restore 40 HP.",
        effect_value: 40,
    },
    ShopItemDef {
        id: "cons_energy",
        name: "Rocket Fuel",
        kind: ItemKind::Consumable,
        asset_id: "energy_drink",
        cost: 50,
        description: "Restore 100 HP. Max energy!",
        effect_value: 100,
    },
];

pub const ACHIEVEMENTS: [AchievementDef; 5] = [
    AchievementDef {
        id: "ach_early_bird",
        name: "Early Bird",
        description: "Clock in before 8:00 AM",
        icon: "🌅",
    },
    AchievementDef {
        id: "ach_streak_3",
        name: "On Fire",
        description: "Maintain a 3-day streak",
        icon: "🔥",
    },
    AchievementDef {
        id: "ach_rich",
        name: "Capitalist",
        description: "Hold 1000 Gold",
        icon: "💎",
    },
    AchievementDef {
        id: "ach_boss_killer",
        name: "Boss Slayer",
        description: "Deal final blow to a boss",
        icon: "⚔️",
    },
    AchievementDef {
        id: "ach_hard_worker",
        name: "Workaholic",
        description: "Manually serve 50 customers",
        icon: "💪",
    },
];

pub const WHEEL_PRIZES: [WheelPrize; 7] = [
    WheelPrize {
        id: "prize_gold_10",
        label: "10 Gold",
        kind: PrizeKind::Gold,
        value: 10,
        weight: 25,
    },
    WheelPrize {
        id: "prize_gold_50",
        label: "50 Gold",
        kind: PrizeKind::Gold,
        value: 50,
        weight: 20,
    },
    WheelPrize {
        id: "prize_gold_100",
        label: "100 Gold",
        kind: PrizeKind::Gold,
        value: 100,
        weight: 10,
    },
    WheelPrize {
        id: "prize_gold_250",
        label: "250 Gold",
        kind: PrizeKind::Gold,
        value: 250,
        weight: 4,
    },
    WheelPrize {
        id: "prize_xp_50",
        label: "50 XP",
        kind: PrizeKind::Xp,
        value: 50,
        weight: 20,
    },
    WheelPrize {
        id: "prize_xp_100",
        label: "100 XP",
        kind: PrizeKind::Xp,
        value: 100,
        weight: 11,
    },
    WheelPrize {
        id: "prize_full_heal",
        label: "Full HP",
        kind: PrizeKind::Hp,
        value: 0,
        weight: 10,
    },
];

/// Blueprint rows the quest generator draws from.
pub struct QuestTemplate {
    pub title: &'static str,
    pub description: &'static str,
    pub reward_gold: u64,
    pub reward_xp: u64,
    pub kind: QuestKind,
}

pub const QUEST_TEMPLATES: [QuestTemplate; 8] = [
    QuestTemplate {
        title: "Morning Brew",
        description: "Serve 50 coffees before 10 AM",
        reward_gold: 25,
        reward_xp: 10,
        kind: QuestKind::Daily,
    },
    QuestTemplate {
        title: "Clean Up Crew",
        description: "Ensure the lobby is spotless",
        reward_gold: 15,
        reward_xp: 5,
        kind: QuestKind::Party,
    },
    QuestTemplate {
        title: "RUSH HOUR",
        description: "Survive the lunch rush without errors",
        reward_gold: 100,
        reward_xp: 50,
        kind: QuestKind::Urgent,
    },
    QuestTemplate {
        title: "Restock Milk",
        description: "Check inventory and restock fridge",
        reward_gold: 20,
        reward_xp: 10,
        kind: QuestKind::Daily,
    },
    QuestTemplate {
        title: "Fix Wifi",
        description: "Turn the router off and on again",
        reward_gold: 50,
        reward_xp: 20,
        kind: QuestKind::Urgent,
    },
    QuestTemplate {
        title: "Smile Service",
        description: "Get 5 positive customer reviews",
        reward_gold: 30,
        reward_xp: 15,
        kind: QuestKind::Party,
    },
    QuestTemplate {
        title: "Trash Duty",
        description: "Empty all bins (The glamorous life)",
        reward_gold: 40,
        reward_xp: 20,
        kind: QuestKind::Daily,
    },
    QuestTemplate {
        title: "Inventory Count",
        description: "Count all the beans. Yes, all of them.",
        reward_gold: 60,
        reward_xp: 30,
        kind: QuestKind::Urgent,
    },
];

/// Default message of the day, overridable by managers.
pub const DEFAULT_MOTD: &str = "Welcome to gOwOrk! Don't forget to clock in on time!";

/// The boss every store starts with.
pub fn initial_boss() -> BossState {
    BossState {
        name: "The Sunday Rush".to_string(),
        current_hp: 1000,
        max_hp: 1000,
        active: true,
        description: "An endless horde of caffeine-deprived zombies.".to_string(),
        respawn_at: None,
        respawn_delay_secs: 10,
    }
}

pub fn find_skill(id: &str) -> Option<&'static SkillDef> {
    SKILL_TREE.iter().find(|s| s.id == id)
}

pub fn find_item(id: &str) -> Option<&'static ShopItemDef> {
    SHOP_ITEMS.iter().find(|i| i.id == id)
}

pub fn find_achievement(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Catalog item (if any) that renders the given avatar asset.
pub fn item_for_asset(asset_id: &str) -> Option<&'static ShopItemDef> {
    SHOP_ITEMS.iter().find(|i| i.asset_id == asset_id)
}

/// Sum of all wheel prize weights; the draw domain is `[0, total)`.
pub fn wheel_total_weight() -> u32 {
    WHEEL_PRIZES.iter().map(|p| p.weight).sum()
}
