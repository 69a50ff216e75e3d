//! Group activities: recurring series, participant enrollment against a soft
//! capacity cap.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;
pub use services::*;
pub use router::group_activity_routes;
