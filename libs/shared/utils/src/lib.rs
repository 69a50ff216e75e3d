pub mod time;
pub mod test_utils;

pub use time::{
    add_minutes, clamp_to_day, format_clock_time, minutes_between, parse_clock_time,
    ranges_overlap, subtract_minutes, TimeError, MINUTES_PER_DAY,
};
