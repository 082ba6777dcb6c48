//! Line-oriented console front end.
//!
//! Each input line is `<actor> [!]<command> [args...]`, e.g. `alice !fight goblin` or
//! `bob duel @alice 25`. Each result is printed as a single JSON object so the console can be
//! scripted or piped into another chat bridge.

use chrono::{DateTime, Utc};
use log::trace;
use serde_json::json;

use crate::game::{GameError, Intent, Outcome, Request};
use crate::validation::log_safe;

#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleLine {
    /// Empty line or `#` comment.
    Blank,
    Request(Request),
    Invalid(String),
}

/// Parse one console line into a request stamped with `now`.
pub fn parse_line(raw: &str, now: DateTime<Utc>) -> ConsoleLine {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return ConsoleLine::Blank;
    }
    let mut words = trimmed.split_whitespace();
    let Some(actor) = words.next() else {
        return ConsoleLine::Blank;
    };
    let Some(command) = words.next() else {
        return ConsoleLine::Invalid("usage: <player> <command> [args...]".into());
    };
    let command = command.strip_prefix('!').unwrap_or(command);
    match command.parse::<Intent>() {
        Ok(intent) => {
            let args: Vec<String> = words.map(str::to_string).collect();
            trace!("Parsed {} {} {:?} from '{}'", actor, intent, args, log_safe(raw));
            ConsoleLine::Request(Request {
                actor: actor.to_string(),
                intent,
                args,
                now,
            })
        }
        Err(e) => ConsoleLine::Invalid(e),
    }
}

/// One JSON line for a handled request.
pub fn render(result: &Result<Outcome, GameError>) -> String {
    let value = match result {
        Ok(outcome) => json!({ "ok": true, "outcome": outcome }),
        Err(e) => json!({
            "ok": false,
            "error": { "kind": e.kind(), "message": e.to_string() },
        }),
    };
    value.to_string()
}

/// One JSON line for input that never reached the engine.
pub fn render_invalid(message: &str) -> String {
    json!({ "ok": false, "error": { "kind": "invalid_input", "message": message } }).to_string()
}
