use axum::extract::{Path, Query, State};
use axum::{Json, http::StatusCode, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::Days;
use futures::future::try_join_all;
use http::header;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{current_user, require_user};
use crate::calendar::{self, DayEvents, GridDay};
use crate::error::ApiError;
use crate::filters::{ClassFilter, TimeRange};
use crate::models::{CalendarEvent, ClassRecord, SavedList, SavedReference};
use crate::saved::AccountCleanup;
use crate::month::{DateWindow, YearMonth};
use crate::validation::{parse_date, parse_month, parse_time_bound};
use crate::view::CalendarView;
use crate::AppState;

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn bearer(auth: BearerHeader) -> Option<Authorization<Bearer>> {
    auth.map(|TypedHeader(a)| a)
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClassQuery {
    pub date: Option<String>,
    pub search: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    /// Comma separated studio names.
    pub studio: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthEventsResponse {
    #[schema(example = "2025-11")]
    pub month: String,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MonthGridResponse {
    #[schema(example = "2025-11")]
    pub month: String,
    pub weeks: Vec<Vec<GridDay>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavedIdsResponse {
    pub class_ids: Vec<String>,
}

#[utoipa::path(get, path = "/", tag = "calendar")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "ClassConnect Calendar API",
        "endpoints": {
            "/calendar": "Scheduled classes for a month",
            "/calendar/day": "Scheduled classes on one date",
            "/calendar/week": "Scheduled classes for seven days",
            "/calendar/grid": "Month grid for calendar views",
            "/calendar.ical": "Download a month as iCal file",
            "/classes": "Browse and filter class listings",
            "/schedule": "Classes on your calendar",
            "/bookmarks": "Bookmarked classes",
            "/account": "Delete all saved classes of the signed in user"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "calendar")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "calendar")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn load_view(
    state: &AppState,
    auth: BearerHeader,
    month: YearMonth,
) -> Result<CalendarView, ApiError> {
    let user = current_user(state.store.as_ref(), bearer(auth)).await?;
    let mut view = CalendarView::new(state.saved.clone(), user, month);
    view.refresh().await?;
    Ok(view)
}

#[utoipa::path(
    get,
    path = "/calendar",
    params(("month" = Option<String>, Query, description = "Month as YYYY-MM, defaults to the current month")),
    responses(
        (status = 200, description = "Scheduled classes in the month", body = MonthEventsResponse),
        (status = 400, description = "Malformed month"),
        (status = 503, description = "Calendar data unavailable")
    ),
    security((), ("bearer_auth" = [])),
    tag = "calendar"
)]
pub async fn get_calendar(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let month = parse_month(query.month.as_deref(), state.settings.today())?;
    let view = load_view(&state, auth, month).await?;
    Ok(Json(MonthEventsResponse {
        month: month.key(),
        events: view.events().to_vec(),
    }))
}

#[utoipa::path(
    get,
    path = "/calendar/day",
    params(("date" = String, Query, description = "Date as YYYY-MM-DD")),
    responses(
        (status = 200, description = "Scheduled classes on the date", body = DayEvents),
        (status = 400, description = "Malformed date"),
        (status = 503, description = "Calendar data unavailable")
    ),
    security((), ("bearer_auth" = [])),
    tag = "calendar"
)]
pub async fn get_day(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<DayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = parse_date(&query.date)?;
    let view = load_view(&state, auth, YearMonth::of(date)).await?;
    Ok(Json(DayEvents {
        date,
        events: view.events_for_date(date),
    }))
}

#[utoipa::path(
    get,
    path = "/calendar/week",
    params(("start" = Option<String>, Query, description = "First day as YYYY-MM-DD, defaults to this week's Sunday")),
    responses(
        (status = 200, description = "Seven day buckets", body = [DayEvents]),
        (status = 400, description = "Malformed date"),
        (status = 503, description = "Calendar data unavailable")
    ),
    security((), ("bearer_auth" = [])),
    tag = "calendar"
)]
pub async fn get_week(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<WeekQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let start = match query.start.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => calendar::start_of_week(state.settings.today()),
    };
    let user = current_user(state.store.as_ref(), bearer(auth)).await?;

    let first = YearMonth::of(start);
    let last = YearMonth::of(start + Days::new(6));
    let mut months = vec![first];
    if last != first {
        months.push(last);
    }

    let cache = state.saved.cache();
    let loaded = try_join_all(months.into_iter().map(|m| cache.get(user.as_ref(), m))).await?;
    let events: Vec<CalendarEvent> = loaded
        .iter()
        .flat_map(|month| month.iter().cloned())
        .collect();

    Ok(Json(calendar::events_for_week(&events, start)))
}

#[utoipa::path(
    get,
    path = "/calendar/grid",
    params(("month" = Option<String>, Query, description = "Month as YYYY-MM, defaults to the current month")),
    responses(
        (status = 200, description = "Sunday-first weeks covering the month", body = MonthGridResponse),
        (status = 400, description = "Malformed month"),
        (status = 503, description = "Calendar data unavailable")
    ),
    security((), ("bearer_auth" = [])),
    tag = "calendar"
)]
pub async fn get_grid(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let month = parse_month(query.month.as_deref(), state.settings.today())?;
    let view = load_view(&state, auth, month).await?;
    Ok(Json(MonthGridResponse {
        month: month.key(),
        weeks: calendar::month_grid(month, &view.events()),
    }))
}

#[utoipa::path(
    get,
    path = "/calendar.ical",
    params(("month" = Option<String>, Query, description = "Month as YYYY-MM, defaults to the current month")),
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 404, description = "No scheduled classes in the month"),
        (status = 503, description = "Calendar data unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "calendar"
)]
pub async fn get_calendar_ical(
    State(state): State<AppState>,
    auth: BearerHeader,
    Query(query): Query<MonthQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let month = parse_month(query.month.as_deref(), state.settings.today())?;
    let view = load_view(&state, auth, month).await?;
    if view.events().is_empty() {
        return Err(ApiError::NotFound("No scheduled classes found".into()));
    }

    let body = state
        .exporter
        .generate(&format!("ClassConnect {month}"), &view.events());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/calendar".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=classconnect_{month}.ics"),
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    get,
    path = "/classes",
    params(
        ("date" = Option<String>, Query, description = "Single day as YYYY-MM-DD; defaults to the next seven days"),
        ("search" = Option<String>, Query, description = "Matches class, instructor or studio name"),
        ("start" = Option<String>, Query, description = "Earliest start time, HH:MM"),
        ("end" = Option<String>, Query, description = "Latest start time, HH:MM"),
        ("studio" = Option<String>, Query, description = "Comma separated studio names")
    ),
    responses(
        (status = 200, description = "Matching classes ordered by date and time", body = [ClassRecord]),
        (status = 400, description = "Malformed filter"),
        (status = 503, description = "Class data unavailable")
    ),
    tag = "classes"
)]
pub async fn list_classes(
    State(state): State<AppState>,
    Query(query): Query<ClassQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = match query.date.as_deref() {
        Some(raw) => DateWindow::days(parse_date(raw)?, 1),
        None => DateWindow::days(state.settings.today(), 7),
    };
    let filter = ClassFilter {
        search: query.search,
        time_range: TimeRange {
            start: parse_time_bound(query.start.as_deref())?,
            end: parse_time_bound(query.end.as_deref())?,
        },
        studios: query
            .studio
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default(),
    };

    let classes = state.store.classes_in_window(window).await?;
    Ok(Json(filter.apply(classes)))
}

async fn saved_ids(
    state: &AppState,
    auth: BearerHeader,
    list: SavedList,
) -> Result<Json<SavedIdsResponse>, ApiError> {
    let user = require_user(state.store.as_ref(), bearer(auth)).await?;
    let class_ids = state.saved.saved_class_ids(list, &user).await?;
    Ok(Json(SavedIdsResponse { class_ids }))
}

async fn save_class(
    state: &AppState,
    auth: BearerHeader,
    list: SavedList,
    class_id: &str,
) -> Result<(StatusCode, Json<SavedReference>), ApiError> {
    let user = require_user(state.store.as_ref(), bearer(auth)).await?;
    let reference = state.saved.save(list, &user, class_id).await?;
    Ok((StatusCode::CREATED, Json(reference)))
}

async fn unsave_class(
    state: &AppState,
    auth: BearerHeader,
    list: SavedList,
    class_id: &str,
) -> Result<StatusCode, ApiError> {
    let user = require_user(state.store.as_ref(), bearer(auth)).await?;
    state.saved.remove(list, &user, class_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/schedule",
    responses(
        (status = 200, description = "Ids of scheduled classes", body = SavedIdsResponse),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = [])),
    tag = "saved"
)]
pub async fn list_schedule(
    State(state): State<AppState>,
    auth: BearerHeader,
) -> Result<impl IntoResponse, ApiError> {
    saved_ids(&state, auth, SavedList::Schedule).await
}

#[utoipa::path(
    post,
    path = "/schedule/{class_id}",
    params(("class_id" = String, Path, description = "Class to add")),
    responses(
        (status = 201, description = "Class added to the calendar", body = SavedReference),
        (status = 401, description = "Not signed in"),
        (status = 409, description = "Class is already scheduled")
    ),
    security(("bearer_auth" = [])),
    tag = "saved"
)]
pub async fn add_to_schedule(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(class_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    save_class(&state, auth, SavedList::Schedule, &class_id).await
}

#[utoipa::path(
    delete,
    path = "/schedule/{class_id}",
    params(("class_id" = String, Path, description = "Class to remove")),
    responses(
        (status = 204, description = "Class removed from the calendar"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Class was not scheduled")
    ),
    security(("bearer_auth" = [])),
    tag = "saved"
)]
pub async fn remove_from_schedule(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(class_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    unsave_class(&state, auth, SavedList::Schedule, &class_id).await
}

#[utoipa::path(
    get,
    path = "/bookmarks",
    responses(
        (status = 200, description = "Ids of bookmarked classes", body = SavedIdsResponse),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = [])),
    tag = "saved"
)]
pub async fn list_bookmarks(
    State(state): State<AppState>,
    auth: BearerHeader,
) -> Result<impl IntoResponse, ApiError> {
    saved_ids(&state, auth, SavedList::Bookmarks).await
}

#[utoipa::path(
    post,
    path = "/bookmarks/{class_id}",
    params(("class_id" = String, Path, description = "Class to bookmark")),
    responses(
        (status = 201, description = "Class bookmarked", body = SavedReference),
        (status = 401, description = "Not signed in"),
        (status = 409, description = "Class is already bookmarked")
    ),
    security(("bearer_auth" = [])),
    tag = "saved"
)]
pub async fn add_bookmark(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(class_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    save_class(&state, auth, SavedList::Bookmarks, &class_id).await
}

#[utoipa::path(
    delete,
    path = "/bookmarks/{class_id}",
    params(("class_id" = String, Path, description = "Bookmark to remove")),
    responses(
        (status = 204, description = "Bookmark removed"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Class was not bookmarked")
    ),
    security(("bearer_auth" = [])),
    tag = "saved"
)]
pub async fn remove_bookmark(
    State(state): State<AppState>,
    auth: BearerHeader,
    Path(class_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    unsave_class(&state, auth, SavedList::Bookmarks, &class_id).await
}

#[utoipa::path(
    delete,
    path = "/account",
    responses(
        (status = 200, description = "Schedule and bookmark rows removed", body = AccountCleanup),
        (status = 401, description = "Not signed in"),
        (status = 503, description = "Saved classes could not be deleted")
    ),
    security(("bearer_auth" = [])),
    tag = "account"
)]
pub async fn delete_account(
    State(state): State<AppState>,
    auth: BearerHeader,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_user(state.store.as_ref(), bearer(auth)).await?;
    let cleanup = state.saved.delete_account_data(&user).await?;
    Ok(Json(cleanup))
}
