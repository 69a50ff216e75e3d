// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use schedule_cell::{check_requested_range, BookedRange, RangeRejection, WorkScheduleService};
use shared_utils::time::{format_clock_time, parse_clock_time, ranges_overlap};

use crate::models::{Appointment, AppointmentError, NewAppointment};
use crate::services::store::AppointmentStore;

/// Half-open overlap between a stored appointment and `[start, end)` minutes.
/// Cancelled appointments never overlap anything.
pub fn occupies(appointment: &Appointment, start: u32, end: u32) -> bool {
    if !appointment.status.occupies_time() {
        return false;
    }
    match appointment.minutes() {
        Ok((a_start, a_end)) => ranges_overlap(a_start as i64, a_end as i64, start as i64, end as i64),
        Err(e) => {
            warn!("Appointment {} has unreadable times: {}", appointment.id, e);
            false
        }
    }
}

/// Last check before an appointment row exists. The requested range is first
/// held against the professional's resolved day (working intervals, breaks,
/// buffer around existing bookings); the decisive overlap test then runs inside
/// the store's atomic insert. `check` is an advisory read for callers that
/// want to know about conflicts before attempting a write.
pub struct ConflictGuard {
    store: Arc<dyn AppointmentStore>,
    schedule: WorkScheduleService,
}

impl ConflictGuard {
    pub fn new(store: Arc<dyn AppointmentStore>, schedule: WorkScheduleService) -> Self {
        Self { store, schedule }
    }

    /// Insert `candidate` as `confirmed` when it fits the professional's
    /// schedule for the day and no non-cancelled appointment sits within the
    /// interval's buffer of it. Times are normalized to `HH:MM`.
    pub async fn admit(&self, mut candidate: NewAppointment, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let (start, end) = validate_range(&candidate.start_time, &candidate.end_time)?;
        candidate.start_time = format_clock_time(start);
        candidate.end_time = format_clock_time(end);
        candidate.duration_minutes = (end - start) as i32;
        candidate.buffer_minutes = self.fit_to_schedule(&candidate, start, end, auth_token).await? as i32;

        let appointment = self.store.insert_if_free(&candidate, auth_token).await?;
        debug!("Admitted appointment {} for professional {} on {} {}-{}",
               appointment.id, appointment.professional_id, appointment.date,
               appointment.start_time, appointment.end_time);
        Ok(appointment)
    }

    /// Buffer of the interval that holds `[start, end)`.
    async fn fit_to_schedule(
        &self,
        candidate: &NewAppointment,
        start: u32,
        end: u32,
        auth_token: &str,
    ) -> Result<u32, AppointmentError> {
        let day = self.schedule
            .resolve_day(candidate.professional_id, candidate.date, auth_token)
            .await?;

        let booked: Vec<BookedRange> = self.store
            .list_for_day(candidate.professional_id, candidate.date, auth_token)
            .await?
            .iter()
            .filter(|a| a.status.occupies_time())
            .filter_map(|a| a.minutes().ok())
            .map(|(booked_start, booked_end)| BookedRange { start: booked_start, end: booked_end })
            .collect();

        check_requested_range(&day.intervals, &booked, start, end).map_err(|rejection| {
            warn!("Rejected {} {}-{} for professional {}: {}",
                  candidate.date, candidate.start_time, candidate.end_time, candidate.professional_id, rejection);
            match rejection {
                RangeRejection::Occupied => AppointmentError::SlotConflict,
                other => AppointmentError::OutsideSchedule(other.to_string()),
            }
        })
    }

    pub async fn check(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let (start, end) = validate_range(start_time, end_time)?;

        let candidates = self.store
            .find_overlapping(
                professional_id,
                date,
                &format_clock_time(start),
                &format_clock_time(end),
                exclude_id,
                auth_token,
            )
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|a| occupies(a, start, end))
            .collect())
    }
}

fn validate_range(start_time: &str, end_time: &str) -> Result<(u32, u32), AppointmentError> {
    let start = parse_clock_time(start_time)?;
    let end = parse_clock_time(end_time)?;
    if start >= end {
        return Err(AppointmentError::Validation(
            "Appointment must end after it starts".to_string(),
        ));
    }
    Ok((start, end))
}
