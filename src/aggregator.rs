use std::collections::HashMap;

use tracing::debug;

use crate::models::{CalendarEvent, SavedList, UserId};
use crate::month::YearMonth;
use crate::store::{ClassStore, StoreResult};

/// Joins a user's schedule references with the class records dated inside
/// `month`.
///
/// No user means no events. References whose class no longer exists (or is
/// dated outside the month) produce nothing. Any store error aborts the whole
/// aggregation.
pub async fn aggregate_month(
    store: &dyn ClassStore,
    user: Option<&UserId>,
    month: YearMonth,
) -> StoreResult<Vec<CalendarEvent>> {
    let Some(user) = user else {
        return Ok(Vec::new());
    };

    let references = store.list_references(SavedList::Schedule, user).await?;
    if references.is_empty() {
        debug!(%user, %month, "no scheduled classes");
        return Ok(Vec::new());
    }

    let scheduled_at: HashMap<&str, _> = references
        .iter()
        .map(|r| (r.class_id.as_str(), r.created_at))
        .collect();
    let class_ids: Vec<String> = scheduled_at.keys().map(|id| id.to_string()).collect();

    let classes = store.classes_by_ids(&class_ids, month.window()).await?;
    let events: Vec<CalendarEvent> = classes
        .into_iter()
        .map(|class| {
            let created_at = scheduled_at.get(class.class_id.as_str()).copied();
            CalendarEvent::new(class, created_at)
        })
        .collect();

    debug!(
        %user,
        %month,
        references = references.len(),
        events = events.len(),
        "aggregated month"
    );
    Ok(events)
}
