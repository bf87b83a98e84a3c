use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity handed out by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Studios publish prices either as text ("$25", "Free") or as plain numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClassRecord {
    pub class_id: String,
    pub classname: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub studio_name: String,
    #[schema(value_type = String, format = "date", example = "2025-11-24")]
    pub date: NaiveDate,
    #[schema(example = "18:30")]
    pub time: String,
    #[serde(default)]
    #[schema(example = "60 min")]
    pub length: String,
    #[serde(default)]
    pub price: Option<Price>,
}

/// Which per-user list a reference row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SavedList {
    Schedule,
    Bookmarks,
}

impl SavedList {
    pub fn table(self) -> &'static str {
        match self {
            SavedList::Schedule => "user_schedule",
            SavedList::Bookmarks => "bookmarks",
        }
    }
}

impl fmt::Display for SavedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SavedList::Schedule => f.write_str("schedule"),
            SavedList::Bookmarks => f.write_str("bookmarks"),
        }
    }
}

/// A `(user, class)` row in either the schedule or the bookmarks table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SavedReference {
    pub user_id: UserId,
    pub class_id: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

pub type ScheduleReference = SavedReference;
pub type BookmarkReference = SavedReference;

/// A scheduled class as shown on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CalendarEvent {
    #[serde(flatten)]
    pub class: ClassRecord,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CalendarEvent {
    pub fn new(class: ClassRecord, scheduled_at: Option<DateTime<Utc>>) -> Self {
        Self {
            class,
            scheduled_at,
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class.class_id
    }

    pub fn date(&self) -> NaiveDate {
        self.class.date
    }
}
