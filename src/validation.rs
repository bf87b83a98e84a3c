use chrono::{NaiveDate, NaiveTime};

use crate::duration::parse_time_of_day;
use crate::error::ApiError;
use crate::month::YearMonth;

pub fn parse_month(value: Option<&str>, fallback: NaiveDate) -> Result<YearMonth, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(YearMonth::of(fallback)),
        Some(raw) => raw
            .parse()
            .map_err(|err| ApiError::BadRequest(format!("month: {err}"))),
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest("date must be formatted as YYYY-MM-DD".into()))
}

pub fn parse_time_bound(value: Option<&str>) -> Result<Option<NaiveTime>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_time_of_day(raw)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("invalid time {raw:?}, expected HH:MM"))),
    }
}
