//! Task window assembly: one-off tasks plus expanded recurring occurrences for
//! a date range, marked done from completions and sorted for display.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, warn};

use super::completion::completed_in;
use super::recurrence;
use super::store::{one_off_tasks_in, recurring_tasks_started_by};
use super::types::{DateWindow, Schedule, Task, TaskOccurrence};
use crate::error::AppResult;

/// A recurring task left out of a window because its rule could not be expanded.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedTask {
    pub task_id: i64,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskWindow {
    pub items: Vec<TaskOccurrence>,
    pub skipped: Vec<SkippedTask>,
}

/// Build the ordered occurrence list for `window`.
///
/// Items are sorted by date, then priority, then case-insensitive title, with
/// the task id as the last tie-breaker. A malformed rule skips its task only.
pub fn assemble(
    conn: &Connection,
    owner: &str,
    window: &DateWindow,
    hide_done: bool,
) -> AppResult<TaskWindow> {
    let done = completed_in(conn, owner, window)?;
    let mut out = TaskWindow::default();

    for task in one_off_tasks_in(conn, owner, window)? {
        if let Schedule::OneOff { due_date } = task.schedule {
            out.items.push(occurrence(&task, due_date, None));
        }
    }

    for task in recurring_tasks_started_by(conn, owner, window.end)? {
        let Schedule::Recurring { start_date, rrule } = &task.schedule else {
            continue;
        };
        let anchor = start_date.and_time(chrono::NaiveTime::MIN);
        match recurrence::expand(rrule, anchor, window) {
            Ok(dates) => {
                for at in dates {
                    out.items.push(occurrence(&task, at.date(), Some(rrule.clone())));
                }
            }
            Err(e) => {
                warn!(
                    task_id = task.id,
                    rrule = %rrule,
                    error = %e,
                    "skipping task with invalid recurrence rule"
                );
                out.skipped.push(SkippedTask {
                    task_id: task.id,
                    error: e.to_string(),
                });
            }
        }
    }

    for item in &mut out.items {
        item.is_done = done.contains(&(item.id, item.date));
    }
    if hide_done {
        out.items.retain(|item| !item.is_done);
    }

    out.items.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.priority.cmp(&b.priority))
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then(a.id.cmp(&b.id))
    });

    debug!(
        start = %window.start,
        end = %window.end,
        items = out.items.len(),
        skipped = out.skipped.len(),
        "task window assembled"
    );
    Ok(out)
}

fn occurrence(task: &Task, date: chrono::NaiveDate, rrule: Option<String>) -> TaskOccurrence {
    TaskOccurrence {
        id: task.id,
        owner: task.owner.clone(),
        title: task.title.clone(),
        notes: task.notes.clone(),
        kind: task.kind(),
        date,
        rrule,
        is_done: false,
        priority: task.priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::completion::complete_occurrence;
    use crate::tasks::store::create_task;
    use crate::tasks::types::{NewTask, TaskKind};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn one_off(conn: &Connection, title: &str, due: NaiveDate, priority: i64) -> i64 {
        create_task(
            conn,
            "default",
            &NewTask {
                title: title.into(),
                due_date: Some(due),
                priority: Some(priority),
                ..Default::default()
            },
            due,
        )
        .unwrap()
    }

    fn recurring(conn: &Connection, title: &str, start: NaiveDate, rule: &str) -> i64 {
        create_task(
            conn,
            "default",
            &NewTask {
                title: title.into(),
                start_date: Some(start),
                rrule: Some(rule.into()),
                ..Default::default()
            },
            start,
        )
        .unwrap()
    }

    #[test]
    fn one_off_appears_exactly_once() {
        let conn = crate::db::open_memory_database().unwrap();
        let id = one_off(&conn, "dentist", date(2024, 3, 5), 2);
        let window = DateWindow::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();

        let result = assemble(&conn, "default", &window, true).unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, id);
        assert_eq!(result.items[0].kind, TaskKind::OneOff);
        assert_eq!(result.items[0].rrule, None);
    }

    #[test]
    fn monthly_rule_anchored_on_the_13th() {
        let conn = crate::db::open_memory_database().unwrap();
        recurring(&conn, "invoice", date(2024, 1, 13), "FREQ=MONTHLY;BYMONTHDAY=13");
        let window = DateWindow::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();

        let result = assemble(&conn, "default", &window, true).unwrap();
        let dates: Vec<_> = result.items.iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 3, 13)]);
        assert_eq!(result.items[0].kind, TaskKind::Recurring);
    }

    #[test]
    fn sorted_by_date_priority_then_title() {
        let conn = crate::db::open_memory_database().unwrap();
        let d = date(2024, 6, 10);
        one_off(&conn, "zeta", d, 2);
        one_off(&conn, "beta", d, 1);
        one_off(&conn, "Alpha", d, 2);
        one_off(&conn, "earlier", date(2024, 6, 9), 5);

        let window = DateWindow::new(date(2024, 6, 9), date(2024, 6, 10)).unwrap();
        let titles: Vec<_> = assemble(&conn, "default", &window, true)
            .unwrap()
            .items
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["earlier", "beta", "Alpha", "zeta"]);
    }

    #[test]
    fn hide_done_filters_completed_occurrences() {
        let conn = crate::db::open_memory_database().unwrap();
        let id = recurring(&conn, "water plants", date(2024, 1, 1), "FREQ=DAILY");
        complete_occurrence(&conn, "default", id, date(2024, 1, 2)).unwrap();
        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap();

        let hidden = assemble(&conn, "default", &window, true).unwrap();
        let dates: Vec<_> = hidden.items.iter().map(|i| i.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 3)]);

        let all = assemble(&conn, "default", &window, false).unwrap();
        assert_eq!(all.items.len(), 3);
        assert!(all.items[1].is_done);
        assert!(!all.items[0].is_done);
    }

    #[test]
    fn malformed_rule_is_skipped_not_fatal() {
        let conn = crate::db::open_memory_database().unwrap();
        let bad = recurring(&conn, "broken", date(2024, 1, 1), "FREQ=SOMETIMES");
        recurring(&conn, "fine", date(2024, 1, 1), "FREQ=DAILY");
        let window = DateWindow::day(date(2024, 1, 5));

        let result = assemble(&conn, "default", &window, true).unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "fine");
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].task_id, bad);
    }

    #[test]
    fn recurring_occurrences_stay_in_window() {
        let conn = crate::db::open_memory_database().unwrap();
        recurring(&conn, "a", date(2023, 11, 20), "FREQ=WEEKLY;BYDAY=MO,TH");
        recurring(&conn, "b", date(2023, 2, 28), "FREQ=MONTHLY;BYMONTHDAY=-1");
        recurring(&conn, "c", date(2022, 7, 4), "FREQ=YEARLY;INTERVAL=2");
        let window = DateWindow::new(date(2024, 2, 1), date(2024, 2, 29)).unwrap();

        let result = assemble(&conn, "default", &window, false).unwrap();
        assert!(!result.items.is_empty());
        for item in &result.items {
            assert!(window.contains(item.date), "{} outside window", item.date);
        }
    }
}
