use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{today, ApiResult, AppState};
use crate::db::with_db;
use crate::tasks::{self, CompletionOutcome, DateWindow, NewTask, Task, TaskOccurrence};

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    /// Reference date; defaults to today.
    pub date_ref: Option<NaiveDate>,
    #[serde(default = "default_hide_done")]
    pub hide_done: bool,
    #[serde(default = "default_days")]
    pub days: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
    pub occurrence_date: NaiveDate,
}

fn default_hide_done() -> bool {
    true
}

fn default_days() -> i64 {
    tasks::types::DEFAULT_NEXT_DAYS
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewTask>,
) -> ApiResult<Value> {
    let owner = state.owner();
    let today = today();
    let id = with_db(&state.db, move |conn| tasks::create_task(conn, &owner, &input, today)).await?;
    Ok(Json(json!({ "ok": true, "id": id })))
}

pub async fn get_one(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Task> {
    let owner = state.owner();
    let task = with_db(&state.db, move |conn| tasks::get_task(conn, &owner, id)).await?;
    Ok(Json(task))
}

pub async fn delete_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    let owner = state.owner();
    with_db(&state.db, move |conn| tasks::delete_task(conn, &owner, id)).await?;
    Ok(Json(json!({ "ok": true, "task_id": id })))
}

pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<CompleteBody>,
) -> ApiResult<CompletionOutcome> {
    let owner = state.owner();
    let outcome = with_db(&state.db, move |conn| {
        tasks::complete_occurrence(conn, &owner, id, body.occurrence_date)
    })
    .await?;
    Ok(Json(outcome))
}

pub async fn list_today(
    State(state): State<Arc<AppState>>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<TaskOccurrence>> {
    let window = DateWindow::day(q.date_ref.unwrap_or_else(today));
    list_window(&state, window, q.hide_done).await
}

pub async fn list_week(
    State(state): State<Arc<AppState>>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<TaskOccurrence>> {
    let window = DateWindow::week_of(q.date_ref.unwrap_or_else(today));
    list_window(&state, window, q.hide_done).await
}

pub async fn list_next(
    State(state): State<Arc<AppState>>,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Vec<TaskOccurrence>> {
    let window = DateWindow::next_days(q.date_ref.unwrap_or_else(today), q.days);
    list_window(&state, window, q.hide_done).await
}

async fn list_window(
    state: &AppState,
    window: DateWindow,
    hide_done: bool,
) -> ApiResult<Vec<TaskOccurrence>> {
    let owner = state.owner();
    let assembled = with_db(&state.db, move |conn| {
        tasks::assemble(conn, &owner, &window, hide_done)
    })
    .await?;
    Ok(Json(assembled.items))
}
