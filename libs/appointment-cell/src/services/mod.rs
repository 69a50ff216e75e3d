pub mod booking;
pub mod client;
pub mod conflict;
pub mod store;

pub use booking::AppointmentBookingService;
pub use client::{normalize_phone, ClientDirectory};
pub use conflict::ConflictGuard;
pub use store::{AppointmentStore, SupabaseAppointmentStore};
