//! Input validation for player handles, numeric arguments and log output.

use std::collections::BTreeSet;

use crate::game::GameError;

pub const MIN_HANDLE_LEN: usize = 1;
pub const MAX_HANDLE_LEN: usize = 32;

/// Handle validation errors with helpful messages
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    #[error("Handle is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Handle is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Handle contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },
}

impl From<HandleError> for GameError {
    fn from(e: HandleError) -> Self {
        GameError::InvalidTarget(e.to_string())
    }
}

/// Turn a chat mention (`@Alice`, `alice`, ` ALICE `) into the store key `alice`.
///
/// Letters, digits, `_`, `-` and `.` are accepted; Unicode letters are allowed so
/// non-Latin chat names keep working.
pub fn normalize_handle(raw: &str) -> Result<String, HandleError> {
    let trimmed = raw.trim();
    let handle = trimmed.strip_prefix('@').unwrap_or(trimmed).to_lowercase();

    let len = handle.chars().count();
    if len < MIN_HANDLE_LEN {
        return Err(HandleError::TooShort { min: MIN_HANDLE_LEN });
    }
    if len > MAX_HANDLE_LEN {
        return Err(HandleError::TooLong { max: MAX_HANDLE_LEN });
    }

    let invalid: BTreeSet<char> = handle
        .chars()
        .filter(|&c| !(c.is_alphanumeric() || c == '_' || c == '-' || c == '.'))
        .collect();
    if !invalid.is_empty() {
        let chars = invalid
            .into_iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(", ");
        return Err(HandleError::InvalidCharacters { chars });
    }
    Ok(handle)
}

/// Parse a non-negative whole amount of gold.
pub fn parse_amount(raw: &str) -> Result<u64, GameError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| GameError::InvalidArgument(format!("'{}' is not a valid amount", log_safe(raw))))
}

/// Join free-text arguments back into one name, e.g. `["health", "potion"]` -> `"health potion"`.
pub fn join_args(args: &[String]) -> Option<String> {
    let joined = args.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Escape a player-supplied string for single-line logging.
///
/// Newlines, tabs and other control characters are escaped; anything past 120 characters is
/// cut with an ellipsis.
pub fn log_safe(s: &str) -> String {
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}
