use axum::{
    middleware,
    routing::{get, patch},
    Router,
};
use mission_core::config::MissionConfig;
use mission_cron::CacheCoordinator;
use mission_store::{CalendarStore, SettingsStore, TaskStore};
use std::sync::Arc;
use std::time::Duration;

use crate::http::{calendar, health, memory, settings, status, tasks};

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: MissionConfig,
    /// Cron descriptors and occurrences behind the TTL cache.
    pub cron: CacheCoordinator,
    pub calendar: CalendarStore,
    pub tasks: TaskStore,
    pub settings: SettingsStore,
    /// Client for the automation backend's HTTP API.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: MissionConfig,
        cron: CacheCoordinator,
        calendar: CalendarStore,
        tasks: TaskStore,
        settings: SettingsStore,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            cron,
            calendar,
            tasks,
            settings,
            http,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/calendar",
            get(calendar::list_calendar).post(calendar::create_item),
        )
        .route(
            "/api/calendar/{id}",
            patch(calendar::update_item).delete(calendar::delete_item),
        )
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/api/tasks/{id}", patch(tasks::update_task))
        .route(
            "/api/settings",
            get(settings::get_settings).patch(settings::update_settings),
        )
        .route("/api/memory", get(memory::search_memory))
        .route("/api/openclaw/status", get(status::openclaw_status))
        .layer(middleware::from_fn(crate::guard::localhost_only))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
