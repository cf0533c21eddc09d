// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and trip date parsing.
//!
//! Trip dates are wall-clock values entered on the device, either as
//! `DD/MM/YYYY HH:MM` or in ISO form. They are compared against "now"
//! shifted into the trips' configured UTC offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, SecondsFormat, Utc};

/// Day-first formats produced by the date picker.
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y %H:%M", "%d/%m/%Y %H:%M:%S"];

/// ISO-like formats without an offset.
const ISO_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current wall-clock time for trips entered at `utc_offset_minutes`.
pub fn wall_clock_now(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDateTime {
    match FixedOffset::east_opt(utc_offset_minutes * 60) {
        Some(offset) => now.with_timezone(&offset).naive_local(),
        None => now.naive_utc(),
    }
}

/// Parse a trip date-time string.
///
/// Returns `None` for anything unreadable. An explicit offset is
/// normalized to UTC wall-clock.
pub fn parse_trip_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains('/') {
        return DAY_FIRST_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    // "2024-05-01T08:30Z" has no seconds, which RFC3339 requires.
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    ISO_NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
}

/// Why a departure time was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DepartureError {
    #[error("trip date '{0}' is not a valid date and time")]
    Unparseable(String),

    #[error("trip date is in the past")]
    InPast,

    #[error("trip must start at least {0} minutes from now")]
    TooSoon(i64),
}

/// Check that a one-off trip starts far enough in the future.
pub fn validate_departure(
    raw: &str,
    now: NaiveDateTime,
    min_lead_minutes: i64,
) -> Result<NaiveDateTime, DepartureError> {
    let departure =
        parse_trip_datetime(raw).ok_or_else(|| DepartureError::Unparseable(raw.to_string()))?;

    if departure <= now {
        return Err(DepartureError::InPast);
    }
    if departure < now + Duration::minutes(min_lead_minutes) {
        return Err(DepartureError::TooSoon(min_lead_minutes));
    }

    Ok(departure)
}
