pub mod agenda;
pub mod doctor;
pub mod search;
pub mod sync;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::config::AssistantConfig;
use crate::db;

/// Open the configured database for a one-shot terminal command.
fn open(config: &AssistantConfig) -> Result<Connection> {
    let db_path = config.resolved_db_path();
    db::open_database(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))
}

/// Cut `text` to `max` characters, marking the cut with `...`.
fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
