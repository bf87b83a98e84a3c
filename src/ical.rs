use chrono::{Duration, NaiveDateTime};
use icalendar::{Calendar, Component, Event, EventLike};

use crate::duration::{parse_duration_minutes, parse_time_of_day};
use crate::models::CalendarEvent;

#[derive(Clone, Default)]
pub struct ICalExporter;

impl ICalExporter {
    pub fn new() -> Self {
        Self
    }

    /// Renders scheduled classes as an iCalendar document. Classes whose
    /// start time cannot be read are skipped.
    pub fn generate(&self, name: &str, events: &[CalendarEvent]) -> Vec<u8> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name(name);

        for item in events {
            let class = &item.class;
            let Some(time) = parse_time_of_day(&class.time) else {
                tracing::debug!(class_id = %class.class_id, time = %class.time, "skipping class without start time");
                continue;
            };
            let start = NaiveDateTime::new(class.date, time);
            // full date-time arithmetic, so late classes end on the next day
            let end = start + Duration::minutes(i64::from(parse_duration_minutes(&class.length)));

            let mut event = Event::new();
            event.summary(&format!("{} with {}", class.classname, class.instructor));
            event.starts(start);
            event.ends(end);
            event.location(&class.studio_name);
            event.description(&format!(
                "Studio: {}\nInstructor: {}\nLength: {}",
                class.studio_name, class.instructor, class.length
            ));
            event.uid(&format!("{}-classconnect", class.class_id));
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::ClassRecord;

    fn event(id: &str, time: &str, length: &str) -> CalendarEvent {
        CalendarEvent::new(
            ClassRecord {
                class_id: id.into(),
                classname: "Heels".into(),
                instructor: "Aya".into(),
                studio_name: "Millennium".into(),
                date: NaiveDate::from_ymd_opt(2025, 11, 24).unwrap(),
                time: time.into(),
                length: length.into(),
                price: None,
            },
            None,
        )
    }

    #[test]
    fn test_generate_single_class() {
        let exporter = ICalExporter::new();
        let bytes = exporter.generate("My classes", &[event("c1", "18:00", "90 min")]);
        let body = String::from_utf8(bytes).unwrap();
        assert!(body.contains("BEGIN:VEVENT"));
        assert!(body.contains("Heels with Aya"));
        assert!(body.contains("c1-classconnect"));
        assert!(body.contains("20251124T193000"));
    }

    #[test]
    fn test_late_class_ends_next_day() {
        let exporter = ICalExporter::new();
        let bytes = exporter.generate("My classes", &[event("c1", "23:30", "60 min")]);
        let body = String::from_utf8(bytes).unwrap();
        assert!(body.contains("20251125T003000"));
    }

    #[test]
    fn test_generate_skips_unreadable_times() {
        let exporter = ICalExporter::new();
        let bytes = exporter.generate("My classes", &[event("c1", "TBA", "60 min")]);
        let body = String::from_utf8(bytes).unwrap();
        assert!(!body.contains("BEGIN:VEVENT"));
    }

    #[test]
    fn test_generate_empty() {
        let exporter = ICalExporter::new();
        assert!(exporter.generate("My classes", &[]).is_empty());
    }
}
