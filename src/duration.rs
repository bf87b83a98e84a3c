use chrono::{NaiveTime, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;

/// Minutes assumed when a class length carries no leading number.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

static LEADING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+").expect("regex compiles"));

/// Reads the leading integer of a free-text length ("90 min", "60") as minutes.
pub fn parse_duration_minutes(text: &str) -> u32 {
    LEADING_DIGITS
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(DEFAULT_DURATION_MINUTES)
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}

/// End time of a class as `HH:MM`.
///
/// Works on the time of day only: a class crossing midnight wraps around
/// (`23:30` + 60 min is `00:30`) and the date is left untouched.
pub fn compute_end_time(start: &str, length: &str) -> Option<String> {
    let start = parse_time_of_day(start)?;
    let minutes = TimeDelta::minutes(i64::from(parse_duration_minutes(length)));
    let (end, _wrapped_seconds) = start.overflowing_add_signed(minutes);
    Some(end.format("%H:%M").to_string())
}
