pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/readers", post(handlers::handle_make_reader))
        .route("/api/v1/grades/:grade/kanji", get(handlers::handle_grade_kanji))
        .with_state(state)
}
