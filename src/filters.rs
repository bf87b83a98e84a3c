use chrono::NaiveTime;

use crate::duration::parse_time_of_day;
use crate::models::ClassRecord;

/// Inclusive time-of-day bounds; an open side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl TimeRange {
    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start.is_none_or(|start| time >= start) && self.end.is_none_or(|end| time <= end)
    }
}

/// Filters applied to browsed class listings.
#[derive(Debug, Clone, Default)]
pub struct ClassFilter {
    pub search: Option<String>,
    pub time_range: TimeRange,
    pub studios: Vec<String>,
}

impl ClassFilter {
    pub fn matches(&self, class: &ClassRecord) -> bool {
        self.matches_search(class) && self.matches_time(class) && self.matches_studio(class)
    }

    fn matches_search(&self, class: &ClassRecord) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        [&class.classname, &class.instructor, &class.studio_name]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }

    fn matches_time(&self, class: &ClassRecord) -> bool {
        if self.time_range.is_open() {
            return true;
        }
        parse_time_of_day(&class.time).is_some_and(|t| self.time_range.contains(t))
    }

    fn matches_studio(&self, class: &ClassRecord) -> bool {
        self.studios.is_empty()
            || self
                .studios
                .iter()
                .any(|studio| studio.eq_ignore_ascii_case(&class.studio_name))
    }

    /// Keeps matching classes, ordered by date, time of day, then name.
    pub fn apply(&self, classes: Vec<ClassRecord>) -> Vec<ClassRecord> {
        let mut kept: Vec<ClassRecord> = classes.into_iter().filter(|c| self.matches(c)).collect();
        kept.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(parse_time_of_day(&a.time).cmp(&parse_time_of_day(&b.time)))
                .then(a.classname.cmp(&b.classname))
        });
        kept
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn class(id: &str, name: &str, studio: &str, date: u32, time: &str) -> ClassRecord {
        ClassRecord {
            class_id: id.into(),
            classname: name.into(),
            instructor: "Nika".into(),
            studio_name: studio.into(),
            date: NaiveDate::from_ymd_opt(2025, 11, date).unwrap(),
            time: time.into(),
            length: "60 min".into(),
            price: None,
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn listing() -> Vec<ClassRecord> {
        vec![
            class("a", "Heels", "MDC", 4, "19:00"),
            class("b", "Hip Hop", "TMILLY", 3, "9:30"),
            class("c", "Contemporary", "ML", 3, "18:00"),
            class("d", "Heels Beginner", "ML", 3, "TBA"),
        ]
    }

    #[test]
    fn test_default_filter_sorts_only() {
        let ids: Vec<_> = ClassFilter::default()
            .apply(listing())
            .into_iter()
            .map(|c| c.class_id)
            .collect();
        // unparseable times sort first within their day
        assert_eq!(ids, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let filter = ClassFilter {
            search: Some("  heels ".into()),
            ..Default::default()
        };
        let ids: Vec<_> = filter.apply(listing()).into_iter().map(|c| c.class_id).collect();
        assert_eq!(ids, vec!["d", "a"]);

        let by_studio = ClassFilter {
            search: Some("tmilly".into()),
            ..Default::default()
        };
        assert_eq!(by_studio.apply(listing()).len(), 1);
    }

    #[test]
    fn test_time_range_is_inclusive_and_drops_unknown_times() {
        let filter = ClassFilter {
            time_range: TimeRange {
                start: Some(t(18, 0)),
                end: Some(t(19, 0)),
            },
            ..Default::default()
        };
        let ids: Vec<_> = filter.apply(listing()).into_iter().map(|c| c.class_id).collect();
        assert_eq!(ids, vec!["c", "a"]);

        let evening = ClassFilter {
            time_range: TimeRange {
                start: Some(t(12, 0)),
                end: None,
            },
            ..Default::default()
        };
        assert_eq!(evening.apply(listing()).len(), 2);
    }

    #[test]
    fn test_studio_filter() {
        let filter = ClassFilter {
            studios: vec!["ml".into(), "mdc".into()],
            ..Default::default()
        };
        assert_eq!(filter.apply(listing()).len(), 3);
    }
}
