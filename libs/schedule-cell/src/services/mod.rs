pub mod schedule;
pub mod availability;

pub use schedule::WorkScheduleService;
pub use availability::{calculate_slots, check_requested_range, AvailabilityService};
