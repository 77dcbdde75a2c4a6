//! Health check endpoint

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let live = state.live.stats();
    Json(serde_json::json!({
        "status": "ok",
        "service": "kpi-server",
        "version": env!("CARGO_PKG_VERSION"),
        "online_users": live.online_users,
        "total_connections": live.total_connections,
    }))
}
