use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus whether the run uses live collaborators or fixtures.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let backend = if state.config.local_fixtures_dir.is_some() {
        "local"
    } else {
        "openai"
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "kanji-reader",
        "backend": backend
    }))
}
