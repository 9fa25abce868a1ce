//! Task record types and the date windows they are listed over.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Default priority for tasks and radar items (1 = highest, 5 = lowest).
pub const DEFAULT_PRIORITY: i64 = 3;

/// Longest accepted title, in characters.
pub const MAX_TITLE_CHARS: usize = 240;

/// Fallback span for "next N days" listings when the request is out of range.
pub const DEFAULT_NEXT_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    OneOff,
    Recurring,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneOff => "one_off",
            Self::Recurring => "recurring",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_off" => Ok(Self::OneOff),
            "recurring" => Ok(Self::Recurring),
            _ => Err(format!("unknown task kind: {s}")),
        }
    }
}

/// When a task happens: a single due date, or a rule anchored at a start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    OneOff { due_date: NaiveDate },
    Recurring { start_date: NaiveDate, rrule: String },
}

impl Schedule {
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::OneOff { .. } => TaskKind::OneOff,
            Self::Recurring { .. } => TaskKind::Recurring,
        }
    }
}

/// A task row from the `tasks` table.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub notes: Option<String>,
    pub priority: i64,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub created_at: String,
    pub updated_at: String,
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        self.schedule.kind()
    }
}

/// Request body for creating a task.
///
/// A present `rrule` makes the task recurring; otherwise it is one-off with the
/// first of `due_date`, `start_date`, or today as its due date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub rrule: Option<String>,
}

/// One dated instance of a task inside a listing window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOccurrence {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub notes: Option<String>,
    pub kind: TaskKind,
    pub date: NaiveDate,
    pub rrule: Option<String>,
    pub is_done: bool,
    pub priority: i64,
}

/// Inclusive calendar-date range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end < start {
            return Err(AppError::InvalidArgument(format!(
                "window end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The single day `anchor`.
    pub fn day(anchor: NaiveDate) -> Self {
        Self {
            start: anchor,
            end: anchor,
        }
    }

    /// Monday through Sunday of the week containing `anchor`.
    pub fn week_of(anchor: NaiveDate) -> Self {
        let back = anchor.weekday().num_days_from_monday() as u64;
        let start = anchor.checked_sub_days(Days::new(back)).unwrap_or(anchor);
        let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
        Self { start, end }
    }

    /// `days` days starting at `anchor`; spans outside 1..=365 fall back to 14.
    pub fn next_days(anchor: NaiveDate, days: i64) -> Self {
        let days = normalize_next_days(days);
        let end = anchor
            .checked_add_days(Days::new((days - 1) as u64))
            .unwrap_or(anchor);
        Self { start: anchor, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Start of the first day.
    pub fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Last representable instant of the final day.
    pub fn upper_bound(&self) -> NaiveDateTime {
        self.end
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .unwrap_or_else(|| self.end.and_time(NaiveTime::MIN))
    }
}

pub fn normalize_next_days(days: i64) -> i64 {
    if (1..=365).contains(&days) {
        days
    } else {
        DEFAULT_NEXT_DAYS
    }
}

/// Trim and bound-check a title.
pub fn validate_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_CHARS {
        return Err(AppError::InvalidArgument(format!(
            "title must be 1-{MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

pub fn validate_priority(priority: Option<i64>) -> AppResult<i64> {
    match priority.unwrap_or(DEFAULT_PRIORITY) {
        p @ 1..=5 => Ok(p),
        p => Err(AppError::InvalidArgument(format!(
            "priority must be between 1 and 5, got {p}"
        ))),
    }
}
