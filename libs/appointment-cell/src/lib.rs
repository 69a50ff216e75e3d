//! Single-appointment booking: client resolution by phone, the conflict guard
//! that keeps a professional's appointments from overlapping, and status
//! changes.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, NewAppointment};
pub use services::{AppointmentBookingService, AppointmentStore, ConflictGuard};
pub use router::appointment_routes;
