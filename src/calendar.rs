//! Plain calendar dates, wall-clock times and the injectable clock.
//!
//! Dates from the backend arrive either as `YYYY-MM-DD` or as a full ISO
//! timestamp (`2025-08-03T00:00:00.000Z`). Both are reduced to the calendar
//! date written in the string. The zone suffix is discarded, never applied,
//! so the result does not depend on the host timezone.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid date: {0:?}")]
    InvalidDate(String),

    #[error("Invalid time: {0:?}")]
    InvalidTime(String),
}

/// Leading `YYYY-MM-DD`, optionally followed by a time/zone component.
static RE_ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T ].*)?$").expect("static date pattern")
});

/// Reduce a backend date string to its calendar date.
pub fn normalize_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    let caps = RE_ISO_DATE
        .captures(trimmed)
        .ok_or_else(|| ValidationError::InvalidDate(raw.to_string()))?;
    let date_part = caps
        .get(1)
        .ok_or_else(|| ValidationError::InvalidDate(raw.to_string()))?
        .as_str();
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Parse `HH:MM` (or `HH:MM:SS`) into a time of day.
pub fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime(raw.to_string()))
}

/// Render a time the way the booking form stores it.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parse a raw (date, time) pair into a local timestamp.
pub fn local_datetime(date: &str, time: &str) -> Result<NaiveDateTime, ValidationError> {
    Ok(normalize_date(date)?.and_time(parse_time(time)?))
}

// ─── Clock ────────────────────────────────────────────────────────────────────

/// Supplies "now" in local wall-clock terms.
pub trait ClockSource {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The host's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        Self(date.and_time(time))
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
