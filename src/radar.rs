//! Radar: a flat, prioritized list of unscheduled follow-ups.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::now_timestamp;
use crate::error::AppResult;
use crate::tasks::types::{validate_priority, validate_title};

#[derive(Debug, Clone, Serialize)]
pub struct RadarItem {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub notes: Option<String>,
    pub priority: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRadarItem {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
}

pub fn create_radar_item(
    conn: &Connection,
    owner: &str,
    input: &NewRadarItem,
) -> AppResult<RadarItem> {
    let title = validate_title(&input.title)?;
    let priority = validate_priority(input.priority)?;
    let notes = input
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    let now = now_timestamp();

    conn.execute(
        "INSERT INTO radar_items (owner, title, notes, priority, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![owner, title, notes, priority, now],
    )?;
    let id = conn.last_insert_rowid();
    info!(radar_id = id, priority, "radar item created");

    Ok(RadarItem {
        id,
        owner: owner.to_string(),
        title,
        notes,
        priority,
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Highest priority first, newest first within a priority.
pub fn list_radar_items(conn: &Connection, owner: &str) -> AppResult<Vec<RadarItem>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner, title, notes, priority, created_at, updated_at
         FROM radar_items WHERE owner = ?1
         ORDER BY priority ASC, id DESC",
    )?;
    let items = stmt
        .query_map(params![owner], row_to_item)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

fn row_to_item(row: &Row) -> rusqlite::Result<RadarItem> {
    Ok(RadarItem {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        notes: row.get(3)?,
        priority: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
