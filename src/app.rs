use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/theme/toggle", post(handlers::toggle_theme_form))
        .route("/api/theme", get(handlers::get_theme))
        .route("/api/theme/toggle", post(handlers::toggle_theme))
        .route("/api/refresh", post(handlers::refresh))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/students", get(handlers::list_students))
        .route("/api/teachers", get(handlers::list_teachers))
        .route("/api/sessions", get(handlers::list_sessions))
        .route("/api/attendance", get(handlers::list_attendance))
        .route("/api/counters/stream", get(handlers::counters_stream))
        .with_state(state)
}
