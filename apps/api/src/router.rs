use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::get,
};
use serde_json::{json, Value};

use appointment_cell::appointment_routes;
use calendar_sync_cell::calendar_sync_routes;
use group_activity_cell::group_activity_routes;
use schedule_cell::schedule_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .route("/health", get(health).with_state(state.clone()))
        .nest("/schedule", schedule_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/group-activities", group_activity_routes(state.clone()))
        .nest("/calendar-sync", calendar_sync_routes(state))
}

async fn health(State(state): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store_configured": state.is_configured(),
        "calendar_sync_configured": state.is_calendar_sync_configured(),
    }))
}
