use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::calendar::{DayEvents, GridDay};
use crate::handlers::{MonthEventsResponse, MonthGridResponse, SavedIdsResponse};
use crate::models::{CalendarEvent, ClassRecord, Price, SavedReference, UserId};
use crate::saved::AccountCleanup;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::get_calendar,
        crate::handlers::get_day,
        crate::handlers::get_week,
        crate::handlers::get_grid,
        crate::handlers::get_calendar_ical,
        crate::handlers::list_classes,
        crate::handlers::list_schedule,
        crate::handlers::add_to_schedule,
        crate::handlers::remove_from_schedule,
        crate::handlers::list_bookmarks,
        crate::handlers::add_bookmark,
        crate::handlers::remove_bookmark,
        crate::handlers::delete_account
    ),
    components(schemas(
        ClassRecord,
        Price,
        UserId,
        SavedReference,
        CalendarEvent,
        DayEvents,
        GridDay,
        MonthEventsResponse,
        MonthGridResponse,
        SavedIdsResponse,
        AccountCleanup
    )),
    tags(
        (name = "calendar", description = "Personal class calendar"),
        (name = "classes", description = "Class listings"),
        (name = "saved", description = "Schedule and bookmark lists"),
        (name = "account", description = "Account data removal")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_calendar_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/calendar"));
        assert!(doc.paths.paths.contains_key("/schedule/{class_id}"));
        assert!(doc.paths.paths.contains_key("/account"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
