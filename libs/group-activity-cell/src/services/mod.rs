pub mod activity;
pub mod capacity;
pub mod enrollment;
pub mod recurrence;

pub use activity::GroupActivityService;
pub use capacity::decide_enrollment_status;
pub use enrollment::{EnrollmentStore, SupabaseEnrollmentStore};
pub use recurrence::{generate_recurrence_dates, MAX_OCCURRENCES};
