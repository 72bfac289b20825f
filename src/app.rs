use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/sessions", get(handlers::get_sessions))
        .route("/api/archived-sessions", get(handlers::get_archived_sessions))
        .route("/api/history/timeslots", get(handlers::get_timeslots))
        .route("/api/history/data", get(handlers::get_history_data))
        .route("/api/all-data", get(handlers::get_all_data))
        .route("/api/analytics/top-products", get(handlers::get_top_products))
        .route(
            "/api/analytics/category-distribution",
            get(handlers::get_category_distribution),
        )
        .route("/api/import", post(handlers::import_rows))
        .route("/api/archive", post(handlers::archive_now))
        .route("/api/cache-status", get(handlers::cache_status))
        .with_state(state)
}
