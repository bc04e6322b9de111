use thiserror::Error;

/// Domain and storage errors surfaced by the progression engine. Domain
/// variants are precondition failures meant to be shown to the user
/// verbatim; they are never retried by the engine itself.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, lock files, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    #[error("no account named '{0}'")]
    AccountNotFound(String),

    #[error("username '{0}' is already taken")]
    UserExists(String),

    #[error("account suspended, contact a manager")]
    Banned,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("you must be clocked in to do that")]
    ShiftNotActive,

    #[error("too tired! take a break or grab a coffee")]
    TooTired,

    #[error("not enough gold (need {needed}, have {have})")]
    InsufficientGold { needed: u64, have: u64 },

    #[error("not enough skill points (need {needed}, have {have})")]
    InsufficientSkillPoints { needed: u32, have: u32 },

    #[error("requires level {required}")]
    LevelTooLow { required: u32 },

    #[error("you already own that item")]
    AlreadyOwned,

    #[error("you already have a pet")]
    AlreadyHasPet,

    #[error("you don't have a pet")]
    NoPet,

    #[error("your pet is already full")]
    PetFull,

    #[error("you don't own that item")]
    NotOwned,

    #[error("no item with id '{0}'")]
    ItemNotFound(String),

    #[error("no skill with id '{0}'")]
    SkillNotFound(String),

    #[error("skill already unlocked")]
    AlreadyUnlocked,

    #[error("no active quest with id '{0}'")]
    QuestNotFound(String),

    #[error("quest has expired")]
    QuestExpired,

    #[error("quest already submitted, awaiting review")]
    AlreadySubmitted,

    #[error("no pending submission for that quest")]
    SubmissionNotFound,

    #[error("daily spin already used, come back tomorrow")]
    AlreadySpun,

    #[error("mystery box already opened today")]
    MysteryBoxCooldown,

    #[error("arcade cooling down, {remaining_mins} minutes left")]
    ArcadeCoolingDown { remaining_mins: i64 },

    #[error("you can't send kudos to yourself")]
    SelfKudos,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal error (lock registry, unexpected conditions).
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Stable machine-readable kind for the wire protocol and audit detail
    /// strings. Mirrors the variant names.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::Sled(_) => "storage",
            GameError::Bincode(_) => "serialization",
            GameError::Io(_) => "io",
            GameError::SchemaMismatch { .. } => "schema_mismatch",
            GameError::AccountNotFound(_) => "account_not_found",
            GameError::UserExists(_) => "user_exists",
            GameError::Banned => "banned",
            GameError::InvalidCredentials => "invalid_credentials",
            GameError::ShiftNotActive => "shift_not_active",
            GameError::TooTired => "too_tired",
            GameError::InsufficientGold { .. } => "insufficient_gold",
            GameError::InsufficientSkillPoints { .. } => "insufficient_skill_points",
            GameError::LevelTooLow { .. } => "level_too_low",
            GameError::AlreadyOwned => "already_owned",
            GameError::AlreadyHasPet => "already_has_pet",
            GameError::NoPet => "no_pet",
            GameError::PetFull => "pet_full",
            GameError::NotOwned => "not_owned",
            GameError::ItemNotFound(_) => "item_not_found",
            GameError::SkillNotFound(_) => "skill_not_found",
            GameError::AlreadyUnlocked => "already_unlocked",
            GameError::QuestNotFound(_) => "quest_not_found",
            GameError::QuestExpired => "quest_expired",
            GameError::AlreadySubmitted => "already_submitted",
            GameError::SubmissionNotFound => "submission_not_found",
            GameError::AlreadySpun => "already_spun",
            GameError::MysteryBoxCooldown => "mystery_box_cooldown",
            GameError::ArcadeCoolingDown { .. } => "arcade_cooling_down",
            GameError::SelfKudos => "self_kudos",
            GameError::PermissionDenied(_) => "permission_denied",
            GameError::InvalidInput(_) => "invalid_input",
            GameError::Internal(_) => "internal",
        }
    }
}
