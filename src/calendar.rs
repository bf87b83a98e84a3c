use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::CalendarEvent;
use crate::month::YearMonth;

/// Events previewed per grid cell; the rest only count towards `event_count`.
pub const GRID_PREVIEW_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayEvents {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GridDay {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub in_month: bool,
    pub event_count: usize,
    pub preview: Vec<CalendarEvent>,
}

pub fn events_for_date(events: &[CalendarEvent], date: NaiveDate) -> Vec<CalendarEvent> {
    events.iter().filter(|e| e.date() == date).cloned().collect()
}

/// Seven buckets, `week_start` through `week_start + 6`.
pub fn events_for_week(events: &[CalendarEvent], week_start: NaiveDate) -> Vec<DayEvents> {
    week_start
        .iter_days()
        .take(7)
        .map(|date| DayEvents {
            date,
            events: events_for_date(events, date),
        })
        .collect()
}

/// The Sunday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_sunday()))
}

/// Whole Sunday-first weeks covering `month`, one row per week.
pub fn month_grid(month: YearMonth, events: &[CalendarEvent]) -> Vec<Vec<GridDay>> {
    let window = month.window();
    let mut weeks = Vec::new();
    let mut week_start = start_of_week(window.start);
    while week_start < window.end {
        let week = week_start
            .iter_days()
            .take(7)
            .map(|date| {
                let day_events = events_for_date(events, date);
                GridDay {
                    date,
                    in_month: window.contains(date),
                    event_count: day_events.len(),
                    preview: day_events.into_iter().take(GRID_PREVIEW_LIMIT).collect(),
                }
            })
            .collect();
        weeks.push(week);
        week_start = week_start + Days::new(7);
    }
    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClassRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(id: &str, on: NaiveDate) -> CalendarEvent {
        CalendarEvent::new(
            ClassRecord {
                class_id: id.into(),
                classname: "Hip Hop Foundations".into(),
                instructor: "Dee".into(),
                studio_name: "88".into(),
                date: on,
                time: "12:00".into(),
                length: "60 min".into(),
                price: None,
            },
            None,
        )
    }

    #[test]
    fn test_events_for_date_exact_match() {
        let events = vec![
            event("a", date(2025, 11, 3)),
            event("b", date(2025, 11, 4)),
            event("c", date(2025, 11, 3)),
        ];
        let found = events_for_date(&events, date(2025, 11, 3));
        let ids: Vec<_> = found.iter().map(|e| e.class_id()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(events_for_date(&events, date(2025, 11, 5)).is_empty());
    }

    #[test]
    fn test_week_buckets_partition_the_week() {
        let start = date(2025, 11, 30);
        let events: Vec<_> = (0..10)
            .map(|i| event(&format!("e{i}"), start + Days::new(i % 9)))
            .collect();

        let week = events_for_week(&events, start);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, start);
        assert_eq!(week[6].date, date(2025, 12, 6));

        let mut bucketed: Vec<&str> = Vec::new();
        for day in &week {
            assert_eq!(day.events, events_for_date(&events, day.date));
            assert!(day.events.iter().all(|e| e.date() == day.date));
            bucketed.extend(day.events.iter().map(|e| e.class_id()));
        }
        let mut unique = bucketed.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), bucketed.len());

        let in_week = events
            .iter()
            .filter(|e| e.date() >= start && e.date() < start + Days::new(7))
            .count();
        assert_eq!(bucketed.len(), in_week);
    }

    #[test]
    fn test_start_of_week_is_sunday() {
        assert_eq!(start_of_week(date(2025, 11, 5)), date(2025, 11, 2));
        assert_eq!(start_of_week(date(2025, 11, 2)), date(2025, 11, 2));
        assert_eq!(start_of_week(date(2026, 1, 1)), date(2025, 12, 28));
    }

    #[test]
    fn test_month_grid_covers_whole_weeks() {
        let november = YearMonth::new(2025, 11).unwrap();
        let day = date(2025, 11, 14);
        let events: Vec<_> = (0..5).map(|i| event(&format!("e{i}"), day)).collect();

        let grid = month_grid(november, &events);
        // Nov 2025 starts on a Saturday and ends on a Sunday
        assert_eq!(grid.len(), 6);
        assert!(grid.iter().all(|week| week.len() == 7));
        assert_eq!(grid[0][0].date, date(2025, 10, 26));
        assert!(!grid[0][0].in_month);
        assert!(grid[0][6].in_month);

        let cell = grid
            .iter()
            .flatten()
            .find(|cell| cell.date == day)
            .unwrap();
        assert_eq!(cell.event_count, 5);
        assert_eq!(cell.preview.len(), GRID_PREVIEW_LIMIT);
    }
}
