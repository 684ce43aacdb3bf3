use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/progress", get(handlers::get_progress))
        .route("/api/progress/start", post(handlers::start_progress))
        .route("/api/progress/complete", post(handlers::complete_routine))
        .route("/api/achievements", get(handlers::get_achievements))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/analysis", get(handlers::get_analysis).post(handlers::submit_analysis))
        .route("/api/preferences/sound", get(handlers::get_sound).put(handlers::update_sound))
        .route("/api/preferences/sound/toggle", post(handlers::toggle_sound))
        .with_state(state)
}
