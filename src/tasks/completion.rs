//! Occurrence completion: idempotent done markers per (owner, task, date).

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use super::store::get_task;
use super::types::{DateWindow, Schedule};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionOutcome {
    pub ok: bool,
    pub task_id: i64,
    pub occurrence_date: NaiveDate,
    /// Set when the occurrence had already been completed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already: bool,
}

/// Mark one occurrence of a task as done.
///
/// One-off tasks only accept their due date. Recurring tasks accept any date,
/// whether or not the rule produces it.
pub fn complete_occurrence(
    conn: &Connection,
    owner: &str,
    task_id: i64,
    occurrence_date: NaiveDate,
) -> AppResult<CompletionOutcome> {
    let task = get_task(conn, owner, task_id)?;

    if let Schedule::OneOff { due_date } = task.schedule {
        if due_date != occurrence_date {
            return Err(AppError::InvalidArgument(format!(
                "one-off task {task_id} is due on {due_date}, not {occurrence_date}"
            )));
        }
    }

    let inserted = conn.execute(
        "INSERT INTO task_completions (owner, task_id, occurrence_date, completed_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(owner, task_id, occurrence_date) DO NOTHING",
        params![owner, task_id, occurrence_date, now_timestamp()],
    )?;

    let already = inserted == 0;
    info!(task_id, date = %occurrence_date, already, "occurrence completed");

    Ok(CompletionOutcome {
        ok: true,
        task_id,
        occurrence_date,
        already,
    })
}

/// All (task, date) pairs completed inside `window`.
pub fn completed_in(
    conn: &Connection,
    owner: &str,
    window: &DateWindow,
) -> AppResult<HashSet<(i64, NaiveDate)>> {
    let mut stmt = conn.prepare(
        "SELECT task_id, occurrence_date FROM task_completions
         WHERE owner = ?1 AND occurrence_date >= ?2 AND occurrence_date <= ?3",
    )?;
    let done = stmt
        .query_map(params![owner, window.start, window.end], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, NaiveDate>(1)?))
        })?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(done)
}
