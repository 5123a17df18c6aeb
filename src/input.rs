//! Parsing and validation of command-line input before it reaches the
//! workspace.

use jiff::{
    Timestamp,
    civil::{Date, DateTime, Time},
    tz::TimeZone,
};
use thiserror::Error;

use crate::{
    models::task::minutes_between,
    services::{projects::ResolveProjectError, tasks::{MoveTaskError, ResolveTaskError}},
    storage::StorageError,
};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Invalid date '{input}': {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("End time must be after start time")]
    EndBeforeStart,

    #[error(transparent)]
    ResolveTask(#[from] ResolveTaskError),

    #[error(transparent)]
    ResolveProject(#[from] ResolveProjectError),

    #[error(transparent)]
    MoveTask(#[from] MoveTaskError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Position {0} is out of range")]
    InvalidPosition(usize),
}

/// Trimmed title, rejecting blank input.
pub fn require_title(title: &str) -> Result<String, CliError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CliError::EmptyTitle);
    }
    Ok(title.to_string())
}

/// `today`, `tomorrow` or `YYYY-MM-DD`.
pub fn parse_date(input: &str, today: Date) -> Result<Date, CliError> {
    let invalid = |reason: String| CliError::InvalidDate {
        input: input.to_string(),
        reason,
    };

    match input.trim().to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => today.tomorrow().map_err(|e| invalid(e.to_string())),
        other => other.parse::<Date>().map_err(|e| invalid(e.to_string())),
    }
}

/// An instant given as RFC 3339, as a local `YYYY-MM-DD HH:MM`, or as a bare
/// day (local midnight, meaning "that day, no specific time").
pub fn parse_instant(input: &str, today: Date, tz: &TimeZone) -> Result<Timestamp, CliError> {
    let invalid = |reason: String| CliError::InvalidDate {
        input: input.to_string(),
        reason,
    };
    let trimmed = input.trim();

    if let Ok(ts) = trimmed.parse::<Timestamp>() {
        return Ok(ts);
    }

    let local = if trimmed.contains(':') {
        trimmed
            .replacen(' ', "T", 1)
            .parse::<DateTime>()
            .map_err(|e| invalid(e.to_string()))?
    } else {
        parse_date(trimmed, today)?.to_datetime(Time::midnight())
    };

    local
        .to_zoned(tz.clone())
        .map(|zoned| zoned.timestamp())
        .map_err(|e| invalid(e.to_string()))
}

/// Rejects an end that does not come after the start.
pub fn check_span(start: Option<Timestamp>, end: Option<Timestamp>) -> Result<(), CliError> {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => Err(CliError::EndBeforeStart),
        _ => Ok(()),
    }
}

/// An explicit duration wins; otherwise it follows the start/end span.
pub fn resolve_duration(
    duration: Option<i64>,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
) -> Option<i64> {
    duration.or_else(|| minutes_between(start?, end?))
}
