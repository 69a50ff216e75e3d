pub mod credentials;
pub mod dispatch;
pub mod google;
pub mod mapping;
pub mod sync;

pub use credentials::CredentialService;
pub use dispatch::CalendarSyncDispatcher;
pub use google::GoogleCalendarClient;
pub use sync::{local_today, CalendarSyncService};
