// libs/appointment-cell/src/services/store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, NewAppointment};

/// Name of the database function that locks the professional's day, re-checks
/// overlap and inserts in one transaction.
pub const BOOK_IF_FREE_FUNCTION: &str = "book_appointment_if_free";

/// Persistence seam for appointments. `insert_if_free` must perform the
/// overlap check and the insert as one atomic step: two concurrent calls for
/// overlapping ranges of the same professional and date must not both succeed.
/// The candidate's `buffer_minutes` widens it on both sides for that check.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert_if_free(&self, candidate: &NewAppointment, auth_token: &str) -> Result<Appointment, AppointmentError>;

    /// Non-cancelled appointments overlapping `[start_time, end_time)`.
    async fn find_overlapping(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<Appointment>, AppointmentError>;

    async fn list_for_day(&self, professional_id: Uuid, date: NaiveDate, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError>;

    async fn update_status(&self, id: Uuid, status: AppointmentStatus, auth_token: &str) -> Result<Appointment, AppointmentError>;
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(AppointmentError::from))
            .collect()
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert_if_free(&self, candidate: &NewAppointment, auth_token: &str) -> Result<Appointment, AppointmentError> {
        debug!("Admitting {} {}-{} for professional {}",
               candidate.date, candidate.start_time, candidate.end_time, candidate.professional_id);

        let args = json!({
            "p_professional_id": candidate.professional_id,
            "p_client_id": candidate.client_id,
            "p_service_id": candidate.service_id,
            "p_date": candidate.date,
            "p_start_time": candidate.start_time,
            "p_end_time": candidate.end_time,
            "p_duration_minutes": candidate.duration_minutes,
            "p_notes": candidate.notes,
            "p_is_group_activity": candidate.is_group_activity,
            "p_group_activity_id": candidate.group_activity_id,
            "p_buffer_minutes": candidate.buffer_minutes
        });

        match self.supabase.rpc::<Appointment>(BOOK_IF_FREE_FUNCTION, Some(auth_token), args).await {
            Ok(appointment) => Ok(appointment),
            Err(e) if e.is_conflict() => {
                warn!("Slot {} {}-{} already taken for professional {}",
                      candidate.date, candidate.start_time, candidate.end_time, candidate.professional_id);
                Err(AppointmentError::SlotConflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_overlapping(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&date=eq.{}&status=neq.cancelled&start_time=lt.{}&end_time=gt.{}",
            professional_id, date, end_time, start_time
        );
        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }
        path.push_str("&order=start_time.asc");

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Self::parse_rows(rows)
    }

    async fn get(&self, id: Uuid, auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn list_for_day(&self, professional_id: Uuid, date: NaiveDate, auth_token: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&date=eq.{}&order=start_time.asc",
            professional_id, date
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Self::parse_rows(rows)
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let updated: Vec<Appointment> = self.supabase
            .request_returning(Method::PATCH, &path, Some(auth_token), Some(json!({ "status": status })))
            .await?;

        updated.into_iter().next().ok_or(AppointmentError::NotFound(id))
    }
}
