//! Agenda overview: today, the coming days, and the radar in one response.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;

use crate::error::AppResult;
use crate::radar::{list_radar_items, RadarItem};
use crate::tasks::types::{DateWindow, TaskOccurrence};
use crate::tasks::window::assemble;

#[derive(Debug, Serialize)]
pub struct AgendaOverview {
    pub date_ref: NaiveDate,
    pub days: i64,
    pub today: Vec<TaskOccurrence>,
    pub next: Vec<TaskOccurrence>,
    pub radar: Vec<RadarItem>,
}

/// `days` is echoed back as given; out-of-range values fall back to the
/// default window length for `next`.
pub fn overview(
    conn: &Connection,
    owner: &str,
    date_ref: NaiveDate,
    days: i64,
    hide_done: bool,
) -> AppResult<AgendaOverview> {
    let today = assemble(conn, owner, &DateWindow::day(date_ref), hide_done)?;
    let next = assemble(conn, owner, &DateWindow::next_days(date_ref, days), hide_done)?;

    Ok(AgendaOverview {
        date_ref,
        days,
        today: today.items,
        next: next.items,
        radar: list_radar_items(conn, owner)?,
    })
}
