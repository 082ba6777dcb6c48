use thiserror::Error;

use crate::game::types::CooldownKey;

/// Failures that can occur while reading or writing the character save file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Wrapper around IO errors (open, copy, rename, lock).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the game engine at the request boundary.
///
/// Every variant is recoverable: the front end renders it and the process keeps running.
#[derive(Debug, Error)]
pub enum GameError {
    /// Character, item, monster or market slot absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A character already exists for this handle.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// The actor (or target) does not hold the named item.
    #[error("item not held: {0}")]
    InsufficientQuantity(String),

    #[error("{action} on cooldown for {remaining_secs}s")]
    CooldownActive {
        action: CooldownKey,
        remaining_secs: i64,
    },

    #[error("imprisoned for another {remaining_secs}s")]
    Imprisoned { remaining_secs: i64 },

    /// Self-targeting or a target that cannot take part.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// The defender already has an outstanding challenge.
    #[error("{0} already has a pending duel")]
    DefenderBusy(String),

    #[error("no duel challenge pending for {0}")]
    NoChallenge(String),

    /// Race or class has already been picked.
    #[error("{what} already chosen: {current}")]
    AlreadyChosen { what: &'static str, current: String },

    /// A timed effect that must expire before the action can be repeated.
    #[error("effect already active: {0}")]
    EffectActive(&'static str),

    /// The action makes no sense in the current state (full HP, not in prison, ...).
    #[error("not applicable: {0}")]
    NotApplicable(String),

    /// Missing or malformed request arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

impl GameError {
    /// Short machine-readable name used by front ends and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::NotFound(_) => "not_found",
            GameError::AlreadyExists(_) => "already_exists",
            GameError::InsufficientFunds { .. } => "insufficient_funds",
            GameError::InsufficientQuantity(_) => "insufficient_quantity",
            GameError::CooldownActive { .. } => "cooldown_active",
            GameError::Imprisoned { .. } => "imprisoned",
            GameError::InvalidTarget(_) => "invalid_target",
            GameError::DefenderBusy(_) => "defender_busy",
            GameError::NoChallenge(_) => "no_challenge",
            GameError::AlreadyChosen { .. } => "already_chosen",
            GameError::EffectActive(_) => "effect_active",
            GameError::NotApplicable(_) => "not_applicable",
            GameError::InvalidArgument(_) => "invalid_argument",
            GameError::StorageFailure(_) => "storage_failure",
        }
    }
}
