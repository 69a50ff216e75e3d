// libs/group-activity-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn group_activity_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_activity))
        .route("/recurrence/preview", post(handlers::preview_recurrence))
        .route("/{activity_id}", get(handlers::get_activity))
        .route("/{activity_id}/stats", get(handlers::get_activity_stats))
        .route("/{activity_id}/participants", get(handlers::list_participants).post(handlers::enroll_participant))

        // Participant records
        .route("/participants/{participant_id}", delete(handlers::remove_participant))
        .route("/participants/{participant_id}/status", patch(handlers::update_participant_status))
        .with_state(state)
}
