//! Task persistence: create, fetch, delete, and the window queries.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use super::types::{validate_priority, validate_title, DateWindow, NewTask, Schedule, Task};
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};

const TASK_COLUMNS: &str =
    "id, owner, title, notes, priority, kind, due_date, start_date, rrule, created_at, updated_at";

/// Validate and insert a task, returning its id. `today` fills missing dates.
pub fn create_task(
    conn: &Connection,
    owner: &str,
    input: &NewTask,
    today: NaiveDate,
) -> AppResult<i64> {
    let title = validate_title(&input.title)?;
    let priority = validate_priority(input.priority)?;
    let notes = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let rrule = input.rrule.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let schedule = match rrule {
        Some(rule) => Schedule::Recurring {
            start_date: input.start_date.unwrap_or(today),
            rrule: rule.to_string(),
        },
        None => Schedule::OneOff {
            due_date: input.due_date.or(input.start_date).unwrap_or(today),
        },
    };

    let (due_date, start_date, rrule) = match &schedule {
        Schedule::OneOff { due_date } => (Some(*due_date), None, None),
        Schedule::Recurring { start_date, rrule } => {
            (None, Some(*start_date), Some(rrule.as_str()))
        }
    };

    let now = now_timestamp();
    conn.execute(
        "INSERT INTO tasks
             (owner, title, notes, priority, kind, due_date, start_date, rrule,
              created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            owner,
            title,
            notes,
            priority,
            schedule.kind().as_str(),
            due_date,
            start_date,
            rrule,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    info!(task_id = id, kind = %schedule.kind(), "task created");
    Ok(id)
}

pub fn get_task(conn: &Connection, owner: &str, id: i64) -> AppResult<Task> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner = ?1 AND id = ?2"),
        params![owner, id],
        row_to_task,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("task {id}")))
}

/// Delete a task and, through the foreign key, its completions.
pub fn delete_task(conn: &Connection, owner: &str, id: i64) -> AppResult<()> {
    let deleted = conn.execute(
        "DELETE FROM tasks WHERE owner = ?1 AND id = ?2",
        params![owner, id],
    )?;
    if deleted == 0 {
        return Err(AppError::NotFound(format!("task {id}")));
    }
    info!(task_id = id, "task deleted");
    Ok(())
}

/// One-off tasks whose due date falls inside `window`.
pub fn one_off_tasks_in(
    conn: &Connection,
    owner: &str,
    window: &DateWindow,
) -> AppResult<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE owner = ?1 AND kind = 'one_off' AND due_date >= ?2 AND due_date <= ?3
         ORDER BY id"
    ))?;
    let tasks = stmt
        .query_map(params![owner, window.start, window.end], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

/// Recurring tasks that have started on or before `end`.
pub fn recurring_tasks_started_by(
    conn: &Connection,
    owner: &str,
    end: NaiveDate,
) -> AppResult<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE owner = ?1 AND kind = 'recurring' AND start_date <= ?2
         ORDER BY id"
    ))?;
    let tasks = stmt
        .query_map(params![owner, end], row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let kind: String = row.get(5)?;
    let schedule = match kind.as_str() {
        "recurring" => Schedule::Recurring {
            start_date: row.get(7)?,
            rrule: row.get(8)?,
        },
        _ => Schedule::OneOff {
            due_date: row.get(6)?,
        },
    };
    Ok(Task {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        notes: row.get(3)?,
        priority: row.get(4)?,
        schedule,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
