// libs/group-activity-cell/src/services/activity.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use appointment_cell::{
    AppointmentError, AppointmentStatus, AppointmentStore, ConflictGuard, NewAppointment,
};
use appointment_cell::services::SupabaseAppointmentStore;
use calendar_sync_cell::{CalendarSyncDispatcher, SyncTarget};
use schedule_cell::WorkScheduleService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::time::minutes_between;

use crate::models::{
    ActivitySeriesResult, CreateActivityRequest, EnrollmentStatus, GroupActivity,
    GroupActivityError, Participant, ParticipantStats, SkippedOccurrence,
};
use crate::services::enrollment::{EnrollmentStore, SupabaseEnrollmentStore};
use crate::services::recurrence::generate_recurrence_dates;

pub struct GroupActivityService {
    supabase: Arc<SupabaseClient>,
    store: Arc<dyn AppointmentStore>,
    enrollments: Arc<dyn EnrollmentStore>,
    guard: ConflictGuard,
    calendar: CalendarSyncDispatcher,
}

impl GroupActivityService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        let enrollments: Arc<dyn EnrollmentStore> = Arc::new(SupabaseEnrollmentStore::new(Arc::clone(&supabase)));
        Self::build(config, supabase, enrollments)
    }

    /// Same wiring with a caller-provided enrollment store.
    pub fn with_enrollments(config: Arc<AppConfig>, enrollments: Arc<dyn EnrollmentStore>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        Self::build(config, supabase, enrollments)
    }

    fn build(config: Arc<AppConfig>, supabase: Arc<SupabaseClient>, enrollments: Arc<dyn EnrollmentStore>) -> Self {
        let store: Arc<dyn AppointmentStore> = Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase)));
        Self {
            guard: ConflictGuard::new(Arc::clone(&store), WorkScheduleService::with_client(Arc::clone(&supabase))),
            calendar: CalendarSyncDispatcher::new(config),
            supabase,
            store,
            enrollments,
        }
    }

    // ==========================================================================
    // ACTIVITIES
    // ==========================================================================

    /// Materialize a one-off activity or every occurrence of a series.
    ///
    /// Each occurrence first reserves the professional's time through the
    /// conflict guard, then gets its own `group_activities` row. Occurrences
    /// whose time is already taken, or that fall outside that day's working
    /// intervals or inside a break, are skipped and reported; the rest of the
    /// series is still created.
    #[instrument(skip(self, request, auth_token), fields(professional_id = %request.professional_id))]
    pub async fn create_activity(
        &self,
        request: CreateActivityRequest,
        auth_token: &str,
    ) -> Result<ActivitySeriesResult, GroupActivityError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(GroupActivityError::Validation("Activity title is required".to_string()));
        }
        if request.max_participants < 1 {
            return Err(GroupActivityError::Validation("max_participants must be at least 1".to_string()));
        }
        if minutes_between(&request.start_time, &request.end_time)? <= 0 {
            return Err(GroupActivityError::Validation("Activity must end after it starts".to_string()));
        }

        let (dates, series_id) = match &request.recurrence {
            Some(rule) => (generate_recurrence_dates(request.date, rule)?, Some(Uuid::new_v4())),
            None => (vec![request.date], None),
        };
        debug!("Creating {} occurrence(s) of '{}'", dates.len(), title);

        let mut result = ActivitySeriesResult { series_id, created: Vec::new(), skipped: Vec::new() };

        for date in dates {
            let activity_id = Uuid::new_v4();
            let reservation = NewAppointment {
                professional_id: request.professional_id,
                client_id: None,
                service_id: None,
                date,
                start_time: request.start_time.clone(),
                end_time: request.end_time.clone(),
                duration_minutes: 0,
                notes: Some(title.to_string()),
                is_group_activity: true,
                group_activity_id: Some(activity_id),
                buffer_minutes: 0,
            };

            let appointment = match self.guard.admit(reservation, auth_token).await {
                Ok(appointment) => appointment,
                Err(e @ (AppointmentError::SlotConflict | AppointmentError::OutsideSchedule(_))) => {
                    warn!("Skipping {} for '{}': {}", date, title, e);
                    result.skipped.push(SkippedOccurrence { date, reason: e.to_string() });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let row = json!({
                "id": activity_id,
                "professional_id": request.professional_id,
                "title": title,
                "description": request.description.as_deref().map(str::trim).filter(|d| !d.is_empty()),
                "date": date,
                "start_time": appointment.start_time,
                "end_time": appointment.end_time,
                "max_participants": request.max_participants,
                "recurrence_series_id": series_id,
            });

            let inserted: Result<Vec<GroupActivity>, _> = self.supabase
                .request_returning(Method::POST, "/rest/v1/group_activities", Some(auth_token), Some(row))
                .await;

            let activity = match inserted.map(|rows| rows.into_iter().next()) {
                Ok(Some(activity)) => activity,
                Ok(None) => {
                    self.release_reservation(appointment.id, auth_token).await;
                    return Err(GroupActivityError::Database("Activity insert returned no rows".to_string()));
                }
                Err(e) => {
                    error!("Failed to store activity for {}: {}", date, e);
                    self.release_reservation(appointment.id, auth_token).await;
                    return Err(e.into());
                }
            };

            self.calendar.dispatch(SyncTarget::GroupActivity(activity.id), auth_token);
            result.created.push(activity);
        }

        info!("Created {} activities, skipped {}", result.created.len(), result.skipped.len());
        Ok(result)
    }

    async fn release_reservation(&self, appointment_id: Uuid, auth_token: &str) {
        if let Err(e) = self.store.update_status(appointment_id, AppointmentStatus::Cancelled, auth_token).await {
            error!("Could not release reservation {}: {}", appointment_id, e);
        }
    }

    pub async fn get_activity(&self, activity_id: Uuid, auth_token: &str) -> Result<GroupActivity, GroupActivityError> {
        let path = format!("/rest/v1/group_activities?id=eq.{}", activity_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;

        match rows.into_iter().next() {
            Some(row) => Ok(serde_json::from_value(row)?),
            None => Err(GroupActivityError::NotFound(format!("group activity {}", activity_id))),
        }
    }

    // ==========================================================================
    // PARTICIPANTS
    // ==========================================================================

    pub async fn list_participants(&self, activity_id: Uuid, auth_token: &str) -> Result<Vec<Participant>, GroupActivityError> {
        let path = format!(
            "/rest/v1/activity_participants?activity_id=eq.{}&order=created_at.asc",
            activity_id
        );
        let rows: Vec<Participant> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        Ok(rows)
    }

    pub async fn get_stats(&self, activity_id: Uuid, auth_token: &str) -> Result<ParticipantStats, GroupActivityError> {
        let activity = self.get_activity(activity_id, auth_token).await?;
        let participants = self.list_participants(activity_id, auth_token).await?;
        Ok(ParticipantStats::from_participants(&participants, activity.max_participants))
    }

    /// Enroll a client, confirmed while seats remain and waiting-listed after.
    /// A previously cancelled enrollment of the same client is reactivated.
    /// Counting seats and writing the row happen in one step of the store.
    #[instrument(skip(self, auth_token))]
    pub async fn enroll_participant(
        &self,
        activity_id: Uuid,
        client_id: Uuid,
        auth_token: &str,
    ) -> Result<Participant, GroupActivityError> {
        let participant = self.enrollments.enroll_if_room(activity_id, client_id, auth_token).await?;

        info!("Client {} enrolled in activity {} as {}", client_id, activity_id, participant.enrollment_status);

        self.calendar.dispatch(SyncTarget::GroupActivity(activity_id), auth_token);
        Ok(participant)
    }

    /// Any transition is accepted; callers own the rules.
    pub async fn update_participant_status(
        &self,
        participant_id: Uuid,
        status: EnrollmentStatus,
        auth_token: &str,
    ) -> Result<Participant, GroupActivityError> {
        let participant = self.write_status(participant_id, status, auth_token).await?;
        self.calendar.dispatch(SyncTarget::GroupActivity(participant.activity_id), auth_token);
        Ok(participant)
    }

    /// Hard delete; the row is gone rather than cancelled.
    pub async fn remove_participant(&self, participant_id: Uuid, auth_token: &str) -> Result<Participant, GroupActivityError> {
        let path = format!("/rest/v1/activity_participants?id=eq.{}", participant_id);
        let removed: Vec<Participant> = self.supabase
            .request_returning(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        let participant = removed
            .into_iter()
            .next()
            .ok_or_else(|| GroupActivityError::NotFound(format!("participant {}", participant_id)))?;

        info!("Removed participant {} from activity {}", participant_id, participant.activity_id);
        self.calendar.dispatch(SyncTarget::GroupActivity(participant.activity_id), auth_token);
        Ok(participant)
    }

    async fn write_status(
        &self,
        participant_id: Uuid,
        status: EnrollmentStatus,
        auth_token: &str,
    ) -> Result<Participant, GroupActivityError> {
        let path = format!("/rest/v1/activity_participants?id=eq.{}", participant_id);
        let updated: Vec<Participant> = self.supabase
            .request_returning(Method::PATCH, &path, Some(auth_token), Some(json!({ "enrollment_status": status })))
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| GroupActivityError::NotFound(format!("participant {}", participant_id)))
    }
}
