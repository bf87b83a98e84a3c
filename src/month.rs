use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonthParseError {
    #[error("month must be formatted as YYYY-MM")]
    Format,
    #[error("month {0} is out of range")]
    OutOfRange(String),
}

/// Half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window covering `days` days starting at `start`.
    pub fn days(start: NaiveDate, days: u64) -> Self {
        let end = start
            .checked_add_days(chrono::Days::new(days))
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

/// A calendar month, keyed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || !(1..=9998).contains(&year) {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("validated year and month")
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.first_day(), self.next().first_day())
    }

    pub fn next(&self) -> Self {
        Self::of(self.first_day() + Months::new(1))
    }

    pub fn previous(&self) -> Self {
        Self::of(self.first_day() - Months::new(1))
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s.trim().split_once('-').ok_or(MonthParseError::Format)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(MonthParseError::Format);
        }
        let year = year.parse::<i32>().map_err(|_| MonthParseError::Format)?;
        let month = month.parse::<u32>().map_err(|_| MonthParseError::Format)?;
        YearMonth::new(year, month).ok_or_else(|| MonthParseError::OutOfRange(s.to_string()))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = MonthParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let month: YearMonth = "2025-03".parse().unwrap();
        assert_eq!(month.year(), 2025);
        assert_eq!(month.month(), 3);
        assert_eq!(month.key(), "2025-03");
        assert_eq!("2025-3".parse::<YearMonth>(), Err(MonthParseError::Format));
        assert!(matches!(
            "2025-13".parse::<YearMonth>(),
            Err(MonthParseError::OutOfRange(_))
        ));
        assert!("march".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_window_is_half_open() {
        let window = YearMonth::new(2024, 2).unwrap().window();
        assert_eq!(window.start, date(2024, 2, 1));
        assert_eq!(window.end, date(2024, 3, 1));
        assert!(window.contains(date(2024, 2, 29)));
        assert!(!window.contains(date(2024, 3, 1)));
        assert!(!window.contains(date(2024, 1, 31)));
    }

    #[test]
    fn test_neighbours_cross_year_boundary() {
        let december = YearMonth::new(2025, 12).unwrap();
        assert_eq!(december.next(), YearMonth::new(2026, 1).unwrap());
        assert_eq!(december.next().previous(), december);
        assert_eq!(
            YearMonth::new(2025, 1).unwrap().previous(),
            YearMonth::new(2024, 12).unwrap()
        );
    }

    #[test]
    fn test_serde_uses_key() {
        let month = YearMonth::new(2025, 7).unwrap();
        assert_eq!(serde_json::to_string(&month).unwrap(), r#""2025-07""#);
        let back: YearMonth = serde_json::from_str(r#""2025-07""#).unwrap();
        assert_eq!(back, month);
    }
}
