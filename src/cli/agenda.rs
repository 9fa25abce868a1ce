//! CLI `agenda` command: print today's tasks, the coming days and the radar.

use anyhow::Result;
use chrono::NaiveDate;

use crate::agenda::overview;
use crate::config::AssistantConfig;
use crate::radar::RadarItem;
use crate::tasks::types::normalize_next_days;
use crate::tasks::{TaskKind, TaskOccurrence};

pub fn agenda(
    config: &AssistantConfig,
    date: Option<NaiveDate>,
    days: i64,
    show_done: bool,
) -> Result<()> {
    let conn = super::open(config)?;
    let date_ref = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let view = overview(&conn, &config.storage.owner, date_ref, days, !show_done)?;

    println!("Today ({})", view.date_ref);
    print_occurrences(&view.today, false);
    println!();
    println!("Next {} days", normalize_next_days(days));
    print_occurrences(&view.next, true);
    println!();
    println!("Radar");
    print_radar(&view.radar);

    Ok(())
}

fn print_occurrences(items: &[TaskOccurrence], with_date: bool) {
    if items.is_empty() {
        println!("  (nothing scheduled)");
        return;
    }
    for occ in items {
        println!("  {}", occurrence_line(occ, with_date));
    }
}

fn occurrence_line(occ: &TaskOccurrence, with_date: bool) -> String {
    let mark = if occ.is_done { "x" } else { " " };
    let repeat = if occ.kind == TaskKind::Recurring { " (repeats)" } else { "" };
    if with_date {
        format!("[{mark}] {} P{} #{} {}{repeat}", occ.date, occ.priority, occ.id, occ.title)
    } else {
        format!("[{mark}] P{} #{} {}{repeat}", occ.priority, occ.id, occ.title)
    }
}

fn print_radar(items: &[RadarItem]) {
    if items.is_empty() {
        println!("  (empty)");
        return;
    }
    for item in items {
        match item.notes.as_deref() {
            Some(notes) if !notes.is_empty() => {
                println!("  P{} {} - {}", item.priority, item.title, super::preview(notes, 80))
            }
            _ => println!("  P{} {}", item.priority, item.title),
        }
    }
}
