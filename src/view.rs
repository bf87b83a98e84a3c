//! Explicit calendar screen state: which month is shown, for whom, and the
//! last load outcome. Navigation and mutations re-load through the shared
//! [`crate::cache::MonthCache`]. The [`QueryState`] is published on a watch
//! channel, so subscribers see `is_loading` while a load is in flight.

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::warn;

use crate::cache::MonthEvents;
use crate::calendar::{self, DayEvents};
use crate::models::{CalendarEvent, SavedList, SavedReference, UserId};
use crate::month::YearMonth;
use crate::saved::{SaveError, SavedClasses};
use crate::store::StoreError;

#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub data: Option<MonthEvents>,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct CalendarView {
    saved: SavedClasses,
    user: Option<UserId>,
    month: YearMonth,
    state: watch::Sender<QueryState>,
}

impl CalendarView {
    pub fn new(saved: SavedClasses, user: Option<UserId>, month: YearMonth) -> Self {
        Self {
            saved,
            user,
            month,
            state: watch::Sender::new(QueryState::default()),
        }
    }

    pub fn month(&self) -> YearMonth {
        self.month
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Snapshot of the current query state.
    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state.subscribe()
    }

    /// Loaded events, empty before the first successful load.
    pub fn events(&self) -> MonthEvents {
        self.state.borrow().data.clone().unwrap_or_default()
    }

    /// Loads the current month. The outcome is recorded in `state()` and
    /// also returned so callers can propagate the failure.
    pub async fn refresh(&mut self) -> Result<MonthEvents, StoreError> {
        self.state.send_modify(|state| state.is_loading = true);
        let result = self.saved.cache().get(self.user.as_ref(), self.month).await;
        if let Err(err) = &result {
            warn!(month = %self.month, error = %err, "calendar load failed");
        }
        self.state.send_replace(match &result {
            Ok(events) => QueryState {
                data: Some(events.clone()),
                is_loading: false,
                error: None,
            },
            Err(err) => QueryState {
                data: None,
                is_loading: false,
                error: Some(err.to_string()),
            },
        });
        result
    }

    pub async fn navigate(&mut self, month: YearMonth) -> Result<MonthEvents, StoreError> {
        self.month = month;
        self.refresh().await
    }

    pub async fn next_month(&mut self) -> Result<MonthEvents, StoreError> {
        self.navigate(self.month.next()).await
    }

    pub async fn previous_month(&mut self) -> Result<MonthEvents, StoreError> {
        self.navigate(self.month.previous()).await
    }

    pub async fn go_to(&mut self, date: NaiveDate) -> Result<MonthEvents, StoreError> {
        self.navigate(YearMonth::of(date)).await
    }

    pub fn events_for_date(&self, date: NaiveDate) -> Vec<CalendarEvent> {
        calendar::events_for_date(&self.events(), date)
    }

    pub fn events_for_week(&self, week_start: NaiveDate) -> Vec<DayEvents> {
        calendar::events_for_week(&self.events(), week_start)
    }

    /// Takes a class off the user's schedule and reloads the month.
    pub async fn remove_event(&mut self, class_id: &str) -> Result<SavedReference, SaveError> {
        let Some(user) = self.user.clone() else {
            return Err(SaveError::NotSaved {
                list: SavedList::Schedule,
                class_id: class_id.to_string(),
            });
        };
        let removed = self.saved.remove(SavedList::Schedule, &user, class_id).await?;
        self.refresh().await?;
        Ok(removed)
    }
}
