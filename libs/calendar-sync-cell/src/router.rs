// libs/calendar-sync-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::post,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn calendar_sync_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/appointments/{appointment_id}", post(handlers::sync_appointment).delete(handlers::remove_appointment_event))
        .route("/activities/{activity_id}", post(handlers::sync_activity).delete(handlers::remove_activity_event))
        .route("/professionals/{professional_id}/pending", post(handlers::sync_pending))
        .with_state(state)
}
