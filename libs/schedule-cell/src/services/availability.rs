// libs/schedule-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::time::{format_clock_time, parse_clock_time, ranges_overlap};

use crate::models::{
    BookedRange, DayAvailability, DayInterval, NextAvailableSlot, RangeRejection, ScheduleError,
    Slot,
};
use crate::services::schedule::WorkScheduleService;

pub const MAX_RANGE_DAYS: i64 = 31;
pub const DEFAULT_SEARCH_DAYS: i64 = 14;
pub const MAX_SEARCH_DAYS: i64 = 90;

/// Fixed-duration slots for one day.
///
/// Each interval is walked from its start in steps of `duration_minutes`. A
/// candidate `[s, s + d)` survives when it overlaps none of the interval's
/// breaks and `[s - buffer, s + d + buffer)` overlaps no booking. All tests are
/// half-open, so a slot that ends exactly when a break or booking starts is
/// kept (buffer permitting). Breaks may overlap each other; each is simply an
/// exclusion window.
pub fn calculate_slots(
    intervals: &[DayInterval],
    bookings: &[BookedRange],
    duration_minutes: i32,
) -> Result<Vec<Slot>, ScheduleError> {
    if duration_minutes <= 0 {
        return Err(ScheduleError::Validation("Slot duration must be positive".to_string()));
    }
    let duration = duration_minutes as u32;

    let mut candidates: Vec<(u32, u32)> = Vec::new();

    for interval in intervals {
        let buffer = interval.buffer_minutes as i64;
        let mut start = interval.range.start;

        while start + duration <= interval.range.end {
            let end = start + duration;

            let hits_break = interval.breaks.iter().any(|brk| {
                ranges_overlap(start as i64, end as i64, brk.start as i64, brk.end as i64)
            });

            let hits_booking = !hits_break && bookings.iter().any(|booking| {
                ranges_overlap(
                    start as i64 - buffer,
                    end as i64 + buffer,
                    booking.start as i64,
                    booking.end as i64,
                )
            });

            if !hits_break && !hits_booking {
                candidates.push((start, end));
            }

            start += duration;
        }
    }

    // Overlapping intervals would otherwise yield the same slot twice.
    candidates.sort_unstable();
    candidates.dedup();

    Ok(candidates
        .into_iter()
        .map(|(start, end)| Slot {
            start_time: format_clock_time(start),
            end_time: format_clock_time(end),
            duration_minutes: duration,
        })
        .collect())
}

/// Test an arbitrary `[start, end)` against a resolved day with the same rules
/// the slot calculator applies: the range must sit inside one interval, miss
/// every break of that interval, and stay clear of bookings by the interval's
/// buffer on both sides. Returns the buffer that applied.
pub fn check_requested_range(
    intervals: &[DayInterval],
    bookings: &[BookedRange],
    start: u32,
    end: u32,
) -> Result<u32, RangeRejection> {
    let interval = intervals
        .iter()
        .find(|i| i.range.start <= start && end <= i.range.end)
        .ok_or(RangeRejection::OutsideWorkingHours)?;

    if let Some(brk) = interval.breaks.iter().find(|brk| {
        ranges_overlap(start as i64, end as i64, brk.start as i64, brk.end as i64)
    }) {
        return Err(RangeRejection::OverlapsBreak {
            start: format_clock_time(brk.start),
            end: format_clock_time(brk.end),
        });
    }

    let buffer = interval.buffer_minutes as i64;
    if bookings.iter().any(|booking| {
        ranges_overlap(start as i64 - buffer, end as i64 + buffer, booking.start as i64, booking.end as i64)
    }) {
        return Err(RangeRejection::Occupied);
    }

    Ok(interval.buffer_minutes)
}

#[derive(Debug, Deserialize)]
struct BookingRow {
    start_time: String,
    end_time: String,
}

pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    schedule: WorkScheduleService,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        Self::with_client(supabase)
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            schedule: WorkScheduleService::with_client(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// Bookable slots for a professional on a date, against the bookings
    /// currently stored. The result is advisory: booking re-validates.
    pub async fn compute_available_slots(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
        auth_token: &str,
    ) -> Result<Vec<Slot>, ScheduleError> {
        if duration_minutes <= 0 {
            return Err(ScheduleError::Validation("Slot duration must be positive".to_string()));
        }

        debug!("Calculating {}-minute slots for professional {} on {}",
               duration_minutes, professional_id, date);

        let day = self.schedule.resolve_day(professional_id, date, auth_token).await?;
        if day.intervals.is_empty() {
            debug!("No working intervals for professional {} on {}", professional_id, date);
            return Ok(Vec::new());
        }

        let bookings = self.get_booked_ranges(professional_id, date, auth_token).await?;
        let slots = calculate_slots(&day.intervals, &bookings, duration_minutes)?;

        debug!("Found {} available slots", slots.len());
        Ok(slots)
    }

    /// Same as [`compute_available_slots`](Self::compute_available_slots) but
    /// with a caller-supplied catalog of existing bookings.
    pub async fn compute_with_bookings(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        duration_minutes: i32,
        bookings: &[BookedRange],
        auth_token: &str,
    ) -> Result<Vec<Slot>, ScheduleError> {
        let day = self.schedule.resolve_day(professional_id, date, auth_token).await?;
        calculate_slots(&day.intervals, bookings, duration_minutes)
    }

    pub async fn compute_range(
        &self,
        professional_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        duration_minutes: i32,
        auth_token: &str,
    ) -> Result<Vec<DayAvailability>, ScheduleError> {
        if to < from {
            return Err(ScheduleError::Validation("Range end must not precede its start".to_string()));
        }
        if (to - from).num_days() >= MAX_RANGE_DAYS {
            return Err(ScheduleError::Validation(format!(
                "Range cannot exceed {} days", MAX_RANGE_DAYS
            )));
        }

        let mut days = Vec::new();
        let mut date = from;
        while date <= to {
            let slots = self.compute_available_slots(professional_id, date, duration_minutes, auth_token).await?;
            days.push(DayAvailability { date, slots });
            date += Duration::days(1);
        }
        Ok(days)
    }

    pub async fn find_next_available_slot(
        &self,
        professional_id: Uuid,
        from: NaiveDate,
        duration_minutes: i32,
        max_days: Option<i64>,
        auth_token: &str,
    ) -> Result<Option<NextAvailableSlot>, ScheduleError> {
        let max_days = max_days.unwrap_or(DEFAULT_SEARCH_DAYS).clamp(1, MAX_SEARCH_DAYS);

        for offset in 0..max_days {
            let date = from + Duration::days(offset);
            let slots = self.compute_available_slots(professional_id, date, duration_minutes, auth_token).await?;
            if let Some(slot) = slots.into_iter().next() {
                return Ok(Some(NextAvailableSlot { date, slot }));
            }
        }

        debug!("No slot found for professional {} within {} days of {}", professional_id, max_days, from);
        Ok(None)
    }

    /// Non-cancelled appointments of the professional on the date.
    pub async fn get_booked_ranges(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<BookedRange>, ScheduleError> {
        let path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&date=eq.{}&status=neq.cancelled&select=start_time,end_time&order=start_time.asc",
            professional_id, date
        );

        let result: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        let mut ranges = Vec::with_capacity(result.len());
        for row in result {
            let booking: BookingRow = serde_json::from_value(row)?;
            match (parse_clock_time(&booking.start_time), parse_clock_time(&booking.end_time)) {
                (Ok(start), Ok(end)) if start < end => ranges.push(BookedRange { start, end }),
                _ => warn!("Skipping appointment with unusable times {}-{}", booking.start_time, booking.end_time),
            }
        }
        Ok(ranges)
    }
}
