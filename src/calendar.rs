//! Calendar arithmetic for rollup periods.
//!
//! Pantry weeks are Monday-start, five-day windows anchored on the first
//! Monday on or after the 1st of the month. Months and years are half-open
//! date windows.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

/// Days covered by a pantry week (Monday through Friday).
pub const PANTRY_WEEK_DAYS: u64 = 5;

/// Upper bound on the number of pantry weeks a month can hold.
pub const MAX_WEEKS_PER_MONTH: u32 = 5;

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// A pantry week resolved to concrete dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PantryWeek {
    pub year: i32,
    pub month: u32,
    pub week: u32,
    /// Monday.
    pub start_date: NaiveDate,
    /// Friday, inclusive.
    pub end_date: NaiveDate,
}

impl PantryWeek {
    /// The week as a half-open window ending the day after Friday.
    pub fn window(&self) -> DateWindow {
        DateWindow {
            start: self.start_date,
            end: self.start_date + Days::new(PANTRY_WEEK_DAYS),
        }
    }
}

/// First day of the given month, if the month is valid.
pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Truncate a date to the first day of its month.
pub fn truncate_to_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// January 1 of the given year.
pub fn start_of_year(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

/// Half-open window covering the whole month.
pub fn month_window(year: i32, month: u32) -> Option<DateWindow> {
    let start = month_start(year, month)?;
    let end = start.checked_add_months(chrono::Months::new(1))?;
    Some(DateWindow { start, end })
}

/// First Monday on or after the 1st of the month.
pub fn first_monday(year: i32, month: u32) -> Option<NaiveDate> {
    let first = month_start(year, month)?;
    let offset = (7 - first.weekday().num_days_from_monday()) % 7;
    first.checked_add_days(Days::new(u64::from(offset)))
}

/// Resolve week `week` (1-based) of a month.
///
/// Returns `None` when the month is invalid, `week` is zero, or the week's
/// Monday falls outside the month.
pub fn pantry_week(year: i32, month: u32, week: u32) -> Option<PantryWeek> {
    if week == 0 {
        return None;
    }
    let monday = first_monday(year, month)?;
    let start_date = monday.checked_add_days(Days::new(7 * u64::from(week - 1)))?;
    if start_date.year() != year || start_date.month() != month {
        return None;
    }
    let end_date = start_date + Days::new(PANTRY_WEEK_DAYS - 1);
    Some(PantryWeek {
        year,
        month,
        week,
        start_date,
        end_date,
    })
}

/// All pantry weeks that exist in the month, in order.
pub fn weeks_in_month(year: i32, month: u32) -> Vec<PantryWeek> {
    (1..=MAX_WEEKS_PER_MONTH)
        .map_while(|week| pantry_week(year, month, week))
        .collect()
}

/// Locate the pantry week whose window contains `date`.
///
/// Weekend days are never inside a pantry week. A weekday belongs to the week
/// starting on its Monday, which is attributed to the Monday's month even when
/// the Friday spills into the next month.
pub fn week_containing(date: NaiveDate) -> Option<PantryWeek> {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return None;
    }
    let monday = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
    let first = first_monday(monday.year(), monday.month())?;
    let week = (monday - first).num_days() / 7 + 1;
    pantry_week(monday.year(), monday.month(), u32::try_from(week).ok()?)
}

/// Pantry weeks holding at least one day of the month.
///
/// That is the month's own weeks, preceded by the previous month's last week
/// when its Friday spills over the 1st.
pub fn weeks_touching_month(year: i32, month: u32) -> Vec<PantryWeek> {
    let Some(first) = month_start(year, month) else {
        return Vec::new();
    };
    let spill = week_containing(first).filter(|week| (week.year, week.month) != (year, month));
    spill
        .into_iter()
        .chain(weeks_in_month(year, month))
        .collect()
}

/// The twelve month starts of a year.
pub fn months_of_year(year: i32) -> Vec<NaiveDate> {
    (1..=12).filter_map(|month| month_start(year, month)).collect()
}
