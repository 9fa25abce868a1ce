//! Recurrence rule parsing and windowed occurrence expansion.
//!
//! Supports the RFC 5545 `RRULE` subset used by agenda tasks: `FREQ`
//! (daily/weekly/monthly/yearly), `INTERVAL`, `COUNT`, `UNTIL`, `BYMONTH`,
//! `BYMONTHDAY`, `BYDAY` (with ordinals), `BYSETPOS` and `WKST`.
//!
//! The anchor is only an occurrence when it matches the rule. Missing BY-parts
//! default from the anchor, and dates that do not exist in a given month are
//! skipped rather than clamped.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use std::str::FromStr;
use thiserror::Error;

use super::types::DateWindow;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("empty recurrence rule")]
    Empty,

    #[error("recurrence rule has no FREQ")]
    MissingFrequency,

    #[error("unsupported frequency: {0}")]
    UnsupportedFrequency(String),

    #[error("unsupported rule part: {0}")]
    UnsupportedPart(String),

    #[error("malformed rule part: {0}")]
    MalformedPart(String),

    #[error("invalid {part} value: {value}")]
    InvalidValue { part: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A `BYDAY` entry: weekday plus optional ordinal (`2MO`, `-1FR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekdayRule {
    pub weekday: Weekday,
    pub ordinal: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<NaiveDateTime>,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i32>,
    pub by_day: Vec<WeekdayRule>,
    pub by_set_pos: Vec<i32>,
    pub week_start: Weekday,
}

/// Parse `rule` and expand it from `anchor` into the occurrences inside `window`.
pub fn expand(
    rule: &str,
    anchor: NaiveDateTime,
    window: &DateWindow,
) -> Result<Vec<NaiveDateTime>, RecurrenceError> {
    let rule: RecurrenceRule = rule.parse()?;
    Ok(rule.occurrences_between(anchor, window))
}

impl FromStr for RecurrenceRule {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = match trimmed.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &trimmed[6..],
            _ => trimmed,
        };
        if body.trim().is_empty() {
            return Err(RecurrenceError::Empty);
        }

        let mut frequency = None;
        let mut interval = 1;
        let mut count = None;
        let mut until = None;
        let mut by_month = Vec::new();
        let mut by_month_day = Vec::new();
        let mut by_day = Vec::new();
        let mut by_set_pos = Vec::new();
        let mut week_start = Weekday::Mon;

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RecurrenceError::MalformedPart(part.to_string()))?;
            let value = value.trim();
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => frequency = Some(parse_frequency(value)?),
                "INTERVAL" => interval = parse_positive("INTERVAL", value)?,
                "COUNT" => count = Some(parse_positive("COUNT", value)?),
                "UNTIL" => until = Some(parse_until(value)?),
                "BYMONTH" => by_month = parse_list(value, parse_month)?,
                "BYMONTHDAY" => {
                    by_month_day = parse_list(value, |v| parse_signed("BYMONTHDAY", v, 31))?
                }
                "BYDAY" => by_day = parse_list(value, parse_weekday_rule)?,
                "BYSETPOS" => by_set_pos = parse_list(value, |v| parse_signed("BYSETPOS", v, 366))?,
                "WKST" => week_start = parse_weekday("WKST", value)?,
                other => return Err(RecurrenceError::UnsupportedPart(other.to_string())),
            }
        }

        Ok(Self {
            frequency: frequency.ok_or(RecurrenceError::MissingFrequency)?,
            interval,
            count,
            until,
            by_month,
            by_month_day,
            by_day,
            by_set_pos,
            week_start,
        })
    }
}

/// BY-parts after filling the anchor-derived defaults.
struct Resolved {
    by_month: Vec<u32>,
    by_month_day: Vec<i32>,
    by_day: Vec<WeekdayRule>,
}

impl RecurrenceRule {
    /// All occurrences in `window`, bounds inclusive: the window runs from the
    /// start of its first day to the end of its last day.
    pub fn occurrences_between(
        &self,
        anchor: NaiveDateTime,
        window: &DateWindow,
    ) -> Vec<NaiveDateTime> {
        let lower = window.lower_bound();
        let upper = window.upper_bound();
        let mut out = Vec::new();
        if upper < anchor {
            return out;
        }

        let anchor_date = anchor.date();
        let time = anchor.time();
        let resolved = self.resolve(anchor_date);
        let mut emitted: u32 = 0;

        // COUNT depends on every earlier occurrence, so only uncounted rules may skip ahead.
        let mut period = match self.count {
            Some(_) => 0,
            None => self.periods_before(anchor_date, window.start),
        };

        loop {
            let Some(days) = self.period_days(period, anchor_date) else {
                break;
            };
            match days.first() {
                Some(first) if first.and_time(time) <= upper => {}
                _ => break,
            }

            let mut candidates: Vec<NaiveDate> = days
                .into_iter()
                .filter(|d| self.matches(*d, &resolved))
                .collect();
            if !self.by_set_pos.is_empty() {
                candidates = select_positions(&candidates, &self.by_set_pos);
            }

            for date in candidates {
                let at = date.and_time(time);
                if at < anchor {
                    continue;
                }
                if matches!(self.until, Some(until) if at > until) {
                    return out;
                }
                if matches!(self.count, Some(count) if emitted >= count) {
                    return out;
                }
                emitted += 1;
                if at > upper {
                    return out;
                }
                if at >= lower {
                    out.push(at);
                }
            }

            period += 1;
        }

        out
    }

    fn resolve(&self, anchor: NaiveDate) -> Resolved {
        let mut by_month = self.by_month.clone();
        let mut by_month_day = self.by_month_day.clone();
        let mut by_day = self.by_day.clone();

        if by_month_day.is_empty() && by_day.is_empty() {
            match self.frequency {
                Frequency::Yearly => {
                    if by_month.is_empty() {
                        by_month.push(anchor.month());
                    }
                    by_month_day.push(anchor.day() as i32);
                }
                Frequency::Monthly => by_month_day.push(anchor.day() as i32),
                Frequency::Weekly => by_day.push(WeekdayRule {
                    weekday: anchor.weekday(),
                    ordinal: None,
                }),
                Frequency::Daily => {}
            }
        }

        Resolved {
            by_month,
            by_month_day,
            by_day,
        }
    }

    /// Whole periods that end before `target`, used to skip straight to the window.
    fn periods_before(&self, anchor: NaiveDate, target: NaiveDate) -> i64 {
        if target <= anchor {
            return 0;
        }
        let interval = self.interval as i64;
        let elapsed = match self.frequency {
            Frequency::Daily => (target - anchor).num_days(),
            Frequency::Weekly => {
                (week_start_of(target, self.week_start) - week_start_of(anchor, self.week_start))
                    .num_days()
                    / 7
            }
            Frequency::Monthly => month_index(target) - month_index(anchor),
            Frequency::Yearly => (target.year() - anchor.year()) as i64,
        };
        (elapsed / interval).max(0)
    }

    /// Days belonging to the `index`-th period counted from the anchor's period.
    fn period_days(&self, index: i64, anchor: NaiveDate) -> Option<Vec<NaiveDate>> {
        let step = index.checked_mul(self.interval as i64)?;
        match self.frequency {
            Frequency::Daily => {
                let day = anchor.checked_add_days(Days::new(u64::try_from(step).ok()?))?;
                Some(vec![day])
            }
            Frequency::Weekly => {
                let offset = u64::try_from(step.checked_mul(7)?).ok()?;
                let start =
                    week_start_of(anchor, self.week_start).checked_add_days(Days::new(offset))?;
                Some(start.iter_days().take(7).collect())
            }
            Frequency::Monthly => {
                let index = month_index(anchor).checked_add(step)?;
                let year = i32::try_from(index.div_euclid(12)).ok()?;
                let month = index.rem_euclid(12) as u32 + 1;
                Some(month_days(year, month)?)
            }
            Frequency::Yearly => {
                let year = anchor.year().checked_add(i32::try_from(step).ok()?)?;
                let mut days = Vec::with_capacity(366);
                for month in 1..=12 {
                    days.extend(month_days(year, month)?);
                }
                Some(days)
            }
        }
    }

    fn matches(&self, date: NaiveDate, resolved: &Resolved) -> bool {
        if !resolved.by_month.is_empty() && !resolved.by_month.contains(&date.month()) {
            return false;
        }

        if !resolved.by_month_day.is_empty() {
            let Some(len) = days_in_month(date.year(), date.month()) else {
                return false;
            };
            let day = date.day() as i32;
            let hit = resolved
                .by_month_day
                .iter()
                .any(|&md| md == day || (md < 0 && len as i32 + md + 1 == day));
            if !hit {
                return false;
            }
        }

        if !resolved.by_day.is_empty()
            && !resolved
                .by_day
                .iter()
                .any(|rule| self.weekday_matches(rule, date, resolved))
        {
            return false;
        }

        true
    }

    fn weekday_matches(&self, rule: &WeekdayRule, date: NaiveDate, resolved: &Resolved) -> bool {
        if date.weekday() != rule.weekday {
            return false;
        }
        let Some(ordinal) = rule.ordinal else {
            return true;
        };

        // Ordinals count within the month, or within the year for YEARLY rules without BYMONTH.
        let span = match self.frequency {
            Frequency::Monthly => month_span(date),
            Frequency::Yearly if resolved.by_month.is_empty() => year_span(date),
            Frequency::Yearly => month_span(date),
            Frequency::Daily | Frequency::Weekly => return true,
        };
        let Some((first, last)) = span else {
            return false;
        };

        let from_start = (date - first).num_days() / 7 + 1;
        let from_end = (last - date).num_days() / 7 + 1;
        if ordinal > 0 {
            from_start == ordinal as i64
        } else {
            from_end == -(ordinal as i64)
        }
    }
}

fn select_positions(candidates: &[NaiveDate], positions: &[i32]) -> Vec<NaiveDate> {
    let len = candidates.len() as i64;
    let mut picked: Vec<NaiveDate> = positions
        .iter()
        .filter_map(|&pos| {
            let idx = if pos > 0 { pos as i64 - 1 } else { len + pos as i64 };
            usize::try_from(idx).ok().and_then(|i| candidates.get(i).copied())
        })
        .collect();
    picked.sort();
    picked.dedup();
    picked
}

fn week_start_of(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let back = (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    date.checked_sub_days(Days::new(back as u64)).unwrap_or(date)
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn month_days(year: i32, month: u32) -> Option<Vec<NaiveDate>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let len = days_in_month(year, month)?;
    Some(first.iter_days().take(len as usize).collect())
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next - first).num_days() as u32)
}

fn month_span(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?;
    let last_day = days_in_month(date.year(), date.month())?;
    let last = NaiveDate::from_ymd_opt(date.year(), date.month(), last_day)?;
    Some((first, last))
}

fn year_span(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(date.year(), 1, 1)?,
        NaiveDate::from_ymd_opt(date.year(), 12, 31)?,
    ))
}

fn parse_frequency(value: &str) -> Result<Frequency, RecurrenceError> {
    match value.to_ascii_uppercase().as_str() {
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        "YEARLY" => Ok(Frequency::Yearly),
        _ => Err(RecurrenceError::UnsupportedFrequency(value.to_string())),
    }
}

fn parse_positive(part: &'static str, value: &str) -> Result<u32, RecurrenceError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RecurrenceError::InvalidValue {
            part,
            value: value.to_string(),
        }),
    }
}

fn parse_month(value: &str) -> Result<u32, RecurrenceError> {
    match value.parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => Ok(m),
        _ => Err(RecurrenceError::InvalidValue {
            part: "BYMONTH",
            value: value.to_string(),
        }),
    }
}

/// Non-zero integer with `|n| <= max`, leading `+` allowed.
fn parse_signed(part: &'static str, value: &str, max: i32) -> Result<i32, RecurrenceError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    match digits.parse::<i32>() {
        Ok(n) if n != 0 && n.abs() <= max => Ok(n),
        _ => Err(RecurrenceError::InvalidValue {
            part,
            value: value.to_string(),
        }),
    }
}

fn parse_weekday(part: &'static str, value: &str) -> Result<Weekday, RecurrenceError> {
    match value.to_ascii_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        _ => Err(RecurrenceError::InvalidValue {
            part,
            value: value.to_string(),
        }),
    }
}

fn parse_weekday_rule(value: &str) -> Result<WeekdayRule, RecurrenceError> {
    let invalid = || RecurrenceError::InvalidValue {
        part: "BYDAY",
        value: value.to_string(),
    };
    let split = value.len().checked_sub(2).ok_or_else(invalid)?;
    let (ordinal, day) = match (value.get(..split), value.get(split..)) {
        (Some(ordinal), Some(day)) => (ordinal, day),
        _ => return Err(invalid()),
    };
    let weekday = parse_weekday("BYDAY", day)?;
    let ordinal = if ordinal.is_empty() {
        None
    } else {
        Some(parse_signed("BYDAY", ordinal, 53).map_err(|_| invalid())?)
    };
    Ok(WeekdayRule { weekday, ordinal })
}

fn parse_until(value: &str) -> Result<NaiveDateTime, RecurrenceError> {
    let raw = value.strip_suffix('Z').unwrap_or(value);
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| RecurrenceError::InvalidValue {
            part: "UNTIL",
            value: value.to_string(),
        })
}

fn parse_list<T>(
    value: &str,
    parse: impl Fn(&str) -> Result<T, RecurrenceError>,
) -> Result<Vec<T>, RecurrenceError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse)
        .collect()
}
