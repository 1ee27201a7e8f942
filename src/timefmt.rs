//! Text forms of instants, times of day and dates used at the edges.
//!
//! Instants are ISO-8601 / RFC 3339. Seconds may be left out, the offset may be
//! `Z`, `±HH:MM`, `±HHMM` or `±HH`, and a timestamp without an offset is read as
//! UTC. Output is always UTC with a `Z` suffix.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

use crate::engine::EngineError;
use crate::model::Ms;

const OFFSET_INSTANT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];
const NAIVE_INSTANT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

fn invalid(field: &'static str, value: &str) -> EngineError {
    EngineError::InvalidFormat {
        field,
        value: value.to_string(),
    }
}

pub fn parse_instant(field: &'static str, s: &str) -> Result<Ms, EngineError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    if let Some(dt) = OFFSET_INSTANT_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Ok(dt.timestamp_millis());
    }
    NAIVE_INSTANT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
        .ok_or_else(|| invalid(field, s))
}

pub fn format_instant(ms: Ms) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn parse_time_of_day(field: &'static str, s: &str) -> Result<NaiveTime, EngineError> {
    let s = s.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| invalid(field, s))
}

pub fn format_time_of_day(t: NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}

pub fn parse_date(field: &'static str, s: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| invalid(field, s))
}
