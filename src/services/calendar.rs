//! Calendar occurrences: which tasks land on which days, and how their time
//! is labelled.
//!
//! All day boundaries are taken in the time zone passed by the caller.

use std::{cmp::Ordering, fmt};

use jiff::{
    Span, Timestamp,
    civil::{Date, Time},
    tz::TimeZone,
};

use crate::models::{task::Task, tree};

fn day_of(ts: Timestamp, tz: &TimeZone) -> Date {
    ts.to_zoned(tz.clone()).date()
}

/// Whether the task is scheduled on `date`. Archived and unscheduled tasks
/// never are.
pub fn occurs_on(task: &Task, date: Date, tz: &TimeZone) -> bool {
    if task.archived || !task.is_scheduled() {
        return false;
    }

    let start = task.start_date_time.map(|ts| day_of(ts, tz));
    let end = task.end_date_time.map(|ts| day_of(ts, tz));

    if start == Some(date) || end == Some(date) {
        return true;
    }
    if let (Some(start), Some(end)) = (start, end)
        && start <= date
        && date <= end
    {
        return true;
    }
    task.due_date.is_some_and(|due| day_of(due, tz) == date)
}

/// Start time first, then end time, then priority (high first). A task with
/// the compared field sorts before one without.
pub fn compare_occurrences(a: &Task, b: &Task) -> Ordering {
    fn by_presence(a: Option<Timestamp>, b: Option<Timestamp>) -> Option<Ordering> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            (Some(_), None) => Some(Ordering::Less),
            (None, Some(_)) => Some(Ordering::Greater),
            (None, None) => None,
        }
    }

    by_presence(a.start_date_time, b.start_date_time)
        .or_else(|| by_presence(a.end_date_time, b.end_date_time))
        .unwrap_or_else(|| b.priority.weight().cmp(&a.priority.weight()))
}

/// Every task, at any depth, that occurs on `date`, in display order.
pub fn tasks_on<'a>(tasks: &'a [Task], date: Date, tz: &TimeZone) -> Vec<&'a Task> {
    let mut on_date: Vec<&Task> = tree::flatten(tasks)
        .into_iter()
        .filter(|t| occurs_on(t, date, tz))
        .collect();
    on_date.sort_by(|a, b| compare_occurrences(a, b));
    on_date
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeLabel {
    /// Local start time
    At(String),
    /// Due at a specific time of day
    Due(String),
    /// Due at local midnight, read as "sometime that day"
    DueToday,
}

impl fmt::Display for TimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLabel::At(time) => write!(f, "{time}"),
            TimeLabel::Due(time) => write!(f, "Due: {time}"),
            TimeLabel::DueToday => write!(f, "Due today"),
        }
    }
}

/// "9:00 AM" style clock time in `tz`.
pub fn format_clock(ts: Timestamp, tz: &TimeZone) -> String {
    ts.to_zoned(tz.clone()).strftime("%-I:%M %p").to_string()
}

pub fn display_time(task: &Task, tz: &TimeZone) -> Option<TimeLabel> {
    if let Some(start) = task.start_date_time {
        return Some(TimeLabel::At(format_clock(start, tz)));
    }
    let due = task.due_date?;
    if due.to_zoned(tz.clone()).time() == Time::midnight() {
        Some(TimeLabel::DueToday)
    } else {
        Some(TimeLabel::Due(format_clock(due, tz)))
    }
}

/// "9:00 AM - 5:00 PM", or "9:00 AM - Jun 12 5:00 PM" when the span crosses
/// days. Only the start time when there is no end.
pub fn time_range(task: &Task, tz: &TimeZone) -> Option<String> {
    let start = task.start_date_time?;
    let start_time = format_clock(start, tz);

    let Some(end) = task.end_date_time else {
        return Some(start_time);
    };
    let end_time = format_clock(end, tz);

    if day_of(start, tz) == day_of(end, tz) {
        Some(format!("{start_time} - {end_time}"))
    } else {
        let end_date = end.to_zoned(tz.clone()).strftime("%b %-d").to_string();
        Some(format!("{start_time} - {end_date} {end_time}"))
    }
}

/// "45m", "2h", "2h 30m".
pub fn format_duration(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{minutes}m");
    }
    let (hours, rest) = (minutes / 60, minutes % 60);
    if rest == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {rest}m")
    }
}

#[derive(Debug, Clone)]
pub struct CalendarDay<'a> {
    pub date: Date,
    /// False for the leading/trailing days of adjacent months
    pub in_month: bool,
    pub is_today: bool,
    pub tasks: Vec<&'a Task>,
}

/// Sunday of the week containing `date`.
pub fn week_start(date: Date) -> Date {
    let offset = i64::from(date.weekday().to_sunday_zero_offset());
    date.saturating_sub(Span::new().days(offset))
}

fn calendar_day<'a>(tasks: &'a [Task], date: Date, anchor: Date, today: Date, tz: &TimeZone) -> CalendarDay<'a> {
    CalendarDay {
        date,
        in_month: date.year() == anchor.year() && date.month() == anchor.month(),
        is_today: date == today,
        tasks: tasks_on(tasks, date, tz),
    }
}

/// Consecutive days from `first` through `last`, both included.
fn days_between(first: Date, last: Date) -> Vec<Date> {
    let mut days = Vec::new();
    let mut date = first;
    while date <= last {
        days.push(date);
        match date.tomorrow() {
            Ok(next) => date = next,
            Err(_) => break,
        }
    }
    days
}

/// The seven days, Sunday first, of the week containing `anchor`.
pub fn week_view<'a>(tasks: &'a [Task], anchor: Date, today: Date, tz: &TimeZone) -> Vec<CalendarDay<'a>> {
    let first = week_start(anchor);
    let last = first.saturating_add(Span::new().days(6));
    days_between(first, last)
        .into_iter()
        .map(|date| calendar_day(tasks, date, anchor, today, tz))
        .collect()
}

/// Whole weeks covering the month of `anchor`, adjacent-month days included.
pub fn month_view<'a>(tasks: &'a [Task], anchor: Date, today: Date, tz: &TimeZone) -> Vec<CalendarDay<'a>> {
    let first = week_start(anchor.first_of_month());
    let last = week_start(anchor.last_of_month()).saturating_add(Span::new().days(6));
    days_between(first, last)
        .into_iter()
        .map(|date| calendar_day(tasks, date, anchor, today, tz))
        .collect()
}
