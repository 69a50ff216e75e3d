// libs/schedule-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        // Weekly pattern and breaks
        .route("/professionals/{professional_id}/intervals", get(handlers::get_weekly_schedule))
        .route("/intervals", post(handlers::create_interval))
        .route("/intervals/{interval_id}", put(handlers::update_interval).delete(handlers::delete_interval))
        .route("/intervals/{interval_id}/breaks", post(handlers::add_break))
        .route("/breaks/{break_id}", put(handlers::update_break).delete(handlers::delete_break))

        // Date-specific exceptions
        .route("/professionals/{professional_id}/exceptions", put(handlers::set_date_exception))
        .route("/professionals/{professional_id}/exceptions/{date}", delete(handlers::clear_date_exception))

        // Availability
        .route("/professionals/{professional_id}/availability", get(handlers::get_available_slots))
        .route("/professionals/{professional_id}/availability/range", get(handlers::get_available_range))
        .route("/professionals/{professional_id}/availability/next", get(handlers::get_next_available_slot))
        .with_state(state)
}
