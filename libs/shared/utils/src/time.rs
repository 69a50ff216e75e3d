//! Clock-time helpers shared by the scheduling cells.
//!
//! Times of day are carried as `"HH:MM"` / `"HH:MM:SS"` strings at the storage
//! boundary and as minute offsets from midnight everywhere else. `24:00` is a
//! valid end-of-day marker (1440).

use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("Invalid clock time: {0}")]
    InvalidFormat(String),

    #[error("Clock time out of range: {0}")]
    OutOfRange(String),
}

/// Parse `HH:MM` or `HH:MM:SS` into minutes since midnight. Seconds are
/// accepted but must be zero except for the `23:59:59` end-of-day alias
/// some stores emit, which is rounded up to `24:00`.
pub fn parse_clock_time(value: &str) -> Result<u32, TimeError> {
    let trimmed = value.trim();
    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(TimeError::InvalidFormat(value.to_string()));
    }

    let parse_part = |part: &str| -> Result<u32, TimeError> {
        if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(TimeError::InvalidFormat(value.to_string()));
        }
        part.parse::<u32>()
            .map_err(|_| TimeError::InvalidFormat(value.to_string()))
    };

    let hours = parse_part(parts[0])?;
    let minutes = parse_part(parts[1])?;
    let seconds = match parts.get(2) {
        Some(part) => parse_part(part)?,
        None => 0,
    };

    if minutes > 59 || seconds > 59 || hours > 24 {
        return Err(TimeError::OutOfRange(value.to_string()));
    }
    if hours == 24 && (minutes > 0 || seconds > 0) {
        return Err(TimeError::OutOfRange(value.to_string()));
    }
    if hours == 23 && minutes == 59 && seconds == 59 {
        return Ok(MINUTES_PER_DAY);
    }

    Ok(hours * 60 + minutes)
}

/// Format minutes since midnight as `HH:MM`, clamped to the day.
pub fn format_clock_time(minutes: u32) -> String {
    let clamped = minutes.min(MINUTES_PER_DAY);
    format!("{:02}:{:02}", clamped / 60, clamped % 60)
}

/// Clamp an arbitrary minute offset into `[0, 1440]`.
pub fn clamp_to_day(minutes: i64) -> u32 {
    minutes.clamp(0, MINUTES_PER_DAY as i64) as u32
}

pub fn add_minutes(time: &str, delta: i64) -> Result<String, TimeError> {
    let base = parse_clock_time(time)? as i64;
    Ok(format_clock_time(clamp_to_day(base + delta)))
}

pub fn subtract_minutes(time: &str, delta: i64) -> Result<String, TimeError> {
    add_minutes(time, -delta)
}

/// Signed number of minutes from `start` to `end`.
pub fn minutes_between(start: &str, end: &str) -> Result<i64, TimeError> {
    Ok(parse_clock_time(end)? as i64 - parse_clock_time(start)? as i64)
}

/// Half-open `[start, end)` overlap. Ranges that only touch do not overlap.
pub fn ranges_overlap(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && a_end > b_start
}
