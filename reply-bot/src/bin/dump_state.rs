//! State Dump
//!
//! Prints every entry of the bot's state file as `key : value`, one per line,
//! followed by each recorded interaction.
//!
//! Usage:
//!   REPLYBOT_STATE_PATH=./.state/replybot.json cargo run --bin dump_state
//!
//! Environment variables:
//!   REPLYBOT_STATE_PATH  - State file to read (default: ./.state/replybot.json)

use dotenv::dotenv;
use serde_json::Value;
use std::env;
use std::fs;
use std::process::ExitCode;

const STATE_PATH_VAR: &str = "REPLYBOT_STATE_PATH";
const DEFAULT_STATE_PATH: &str = "./.state/replybot.json";

fn main() -> ExitCode {
    dotenv().ok();
    let path = env::var(STATE_PATH_VAR)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATE_PATH.to_string());

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    let state: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Failed to parse {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    for line in render(&state) {
        println!("{}", line);
    }
    ExitCode::SUCCESS
}

fn render(state: &Value) -> Vec<String> {
    let Some(entries) = state.as_object() else {
        return vec![format!("state : {}", display(state))];
    };

    let mut lines = Vec::new();
    let mut interactions = None;
    for (key, value) in entries {
        if key == "interaction_log" {
            interactions = value.as_object();
            let count = interactions.map_or(0, |log| log.len());
            lines.push(format!("{} : {} entries", key, count));
        } else {
            lines.push(format!("{} : {}", key, display(value)));
        }
    }

    for (post_id, record) in interactions.into_iter().flatten() {
        lines.push(String::new());
        lines.push(format!("[{}]", post_id));
        match record.as_object() {
            Some(fields) => {
                for (key, value) in fields {
                    lines.push(format!("  {} : {}", key, display(value)));
                }
            }
            None => lines.push(format!("  {}", display(record))),
        }
    }
    lines
}

/// Strings unquoted, everything else as compact JSON
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
