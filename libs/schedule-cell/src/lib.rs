//! Working-time configuration of professionals and the slot calculation
//! built on top of it.

pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::*;
pub use services::*;
pub use router::schedule_routes;
