// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/professionals/{professional_id}", get(handlers::list_professional_day))

        // Utility endpoints
        .route("/conflicts/check", get(handlers::check_conflicts))
        .route("/clients/lookup", get(handlers::lookup_client))
        .with_state(state)
}
