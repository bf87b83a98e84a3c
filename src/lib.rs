pub mod aggregator;
pub mod auth;
pub mod cache;
pub mod calendar;
pub mod duration;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod ical;
pub mod memory;
pub mod models;
pub mod month;
pub mod openapi;
pub mod saved;
pub mod settings;
pub mod store;
pub mod supabase;
pub mod validation;
pub mod view;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use handlers::{
    add_bookmark, add_to_schedule, delete_account, get_calendar, get_calendar_ical, get_day, get_grid, get_week,
    healthz_live, healthz_ready, list_bookmarks, list_classes, list_schedule, remove_bookmark,
    remove_from_schedule, root,
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::cache::MonthCache;
use crate::ical::ICalExporter;
use crate::memory::MemoryStore;
use crate::openapi::ApiDoc;
use crate::saved::SavedClasses;
use crate::settings::{Settings, StoreBackend};
use crate::store::ClassStore;
use crate::supabase::SupabaseStore;

#[derive(Clone)]
pub struct AppState {
    pub(crate) settings: Settings,
    pub(crate) store: Arc<dyn ClassStore>,
    pub(crate) saved: SavedClasses,
    pub(crate) exporter: Arc<ICalExporter>,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn ClassStore>) -> Self {
        let cache = MonthCache::new(store.clone(), settings.cache_ttl());
        Self {
            settings,
            store,
            saved: SavedClasses::new(cache),
            exporter: Arc::new(ICalExporter::new()),
        }
    }

    pub fn cache(&self) -> &MonthCache {
        self.saved.cache()
    }
}

fn build_store(settings: &Settings) -> Result<Arc<dyn ClassStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn ClassStore> = match settings.store_backend {
        StoreBackend::Supabase => Arc::new(SupabaseStore::new(
            settings.supabase_url.clone(),
            settings.supabase_key.clone(),
        )),
        StoreBackend::Memory => match &settings.seed_path {
            Some(path) => Arc::new(MemoryStore::from_json_file(path)?),
            None => Arc::new(MemoryStore::new()),
        },
    };
    Ok(store)
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let store = build_store(&settings)?;
    info!(backend = ?settings.store_backend, timezone = %settings.timezone, "store configured");
    let state = AppState::new(settings, store);

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting ClassConnect Calendar API on {addr}");
    let listener = TcpListener::bind(addr).await?;
    serve(listener, state, shutdown_signal()).await?;
    Ok(())
}

/// Serves the API until `shutdown` resolves, then waits for outstanding
/// month prefetches before returning.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    state.cache().settle().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/calendar", get(get_calendar))
        .route("/calendar/day", get(get_day))
        .route("/calendar/week", get(get_week))
        .route("/calendar/grid", get(get_grid))
        .route("/calendar.ical", get(get_calendar_ical))
        .route("/classes", get(list_classes))
        .route("/schedule", get(list_schedule))
        .route(
            "/schedule/{class_id}",
            axum::routing::post(add_to_schedule).delete(remove_from_schedule),
        )
        .route("/bookmarks", get(list_bookmarks))
        .route(
            "/bookmarks/{class_id}",
            axum::routing::post(add_bookmark).delete(remove_bookmark),
        )
        .route("/account", axum::routing::delete(delete_account))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer)
}
