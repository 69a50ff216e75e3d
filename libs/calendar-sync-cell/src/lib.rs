//! Mirrors appointments and group activities into a professional's Google
//! Calendar.
//!
//! Sync is idempotent per record (the stored event id is verified before
//! anything is written) and never part of the booking transaction: booking
//! flows hand targets to [`CalendarSyncDispatcher`], which runs them in the
//! background with a bounded timeout.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{CalendarSyncError, SyncAction, SyncOutcome, SyncReport, SyncTarget};
pub use services::{CalendarSyncDispatcher, CalendarSyncService};
pub use router::calendar_sync_routes;
