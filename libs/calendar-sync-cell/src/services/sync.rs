// libs/calendar-sync-cell/src/services/sync.rs
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ActivitySyncRecord, AppointmentSyncRecord, CalendarEvent, CalendarSyncError, SyncAction,
    SyncOutcome, SyncReport, SyncTarget,
};
use crate::services::credentials::CredentialService;
use crate::services::google::GoogleCalendarClient;
use crate::services::mapping::{activity_event, appointment_event};

const APPOINTMENT_SELECT: &str =
    "id,professional_id,date,start_time,end_time,status,notes,external_calendar_event_id,client:clients(name,phone,email),service:services(name)";
const ACTIVITY_SELECT: &str =
    "id,professional_id,title,description,date,start_time,end_time,max_participants,external_calendar_event_id,participants:activity_participants(enrollment_status,client:clients(name,phone,email))";

/// Calendar date at `now` on the clinic's wall clock. An unknown zone name
/// falls back to UTC.
pub fn local_today(timezone: &str, now: DateTime<Utc>) -> NaiveDate {
    match timezone.parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).date_naive(),
        Err(_) => {
            warn!("Unknown calendar timezone '{}', using UTC", timezone);
            now.date_naive()
        }
    }
}

#[derive(Debug, Deserialize)]
struct LinkedEvent {
    professional_id: Uuid,
    external_calendar_event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PendingRow {
    id: Uuid,
}

/// Mirrors appointments and group activities into the professional's
/// external calendar. Writes are verify-before-write: a stored event id is
/// looked up first and updated when it still exists, so repeated syncs of the
/// same record never create a second event.
pub struct CalendarSyncService {
    supabase: Arc<SupabaseClient>,
    google: GoogleCalendarClient,
    credentials: CredentialService,
    timezone: String,
}

impl CalendarSyncService {
    pub fn new(config: &AppConfig) -> Result<Self, CalendarSyncError> {
        let supabase = Arc::new(SupabaseClient::new(config));
        Ok(Self {
            google: GoogleCalendarClient::new(config)?,
            credentials: CredentialService::new(config, Arc::clone(&supabase))?,
            supabase,
            timezone: config.calendar_timezone.clone(),
        })
    }

    #[instrument(skip(self, target, auth_token), fields(target = %target))]
    pub async fn sync(&self, target: SyncTarget, auth_token: &str) -> Result<SyncOutcome, CalendarSyncError> {
        let (professional_id, existing_id, event) = match target {
            SyncTarget::Appointment(id) => {
                let record = self.load_appointment(id, auth_token).await?;
                if record.status == "cancelled" {
                    debug!("Appointment {} is cancelled, removing its event instead", id);
                    return self.remove(target, auth_token).await;
                }
                let event = appointment_event(&record, &self.timezone)?;
                (record.professional_id, record.external_calendar_event_id, event)
            }
            SyncTarget::GroupActivity(id) => {
                let record = self.load_activity(id, auth_token).await?;
                let event = activity_event(&record, &self.timezone)?;
                (record.professional_id, record.external_calendar_event_id, event)
            }
        };

        let mut access_token = self.credentials.access_token(professional_id, auth_token).await?;
        let written = match self.write_event(&access_token, existing_id.as_deref(), &event).await {
            Err(CalendarSyncError::Unauthorized) => {
                debug!("Access token rejected, forcing refresh for professional {}", professional_id);
                access_token = self.credentials.force_refresh(professional_id, auth_token).await?;
                self.write_event(&access_token, existing_id.as_deref(), &event).await
            }
            other => other,
        };
        let (event_id, action) = written?;

        if let Err(e) = self.mark_synced(target, Some(&event_id), auth_token).await {
            warn!("Calendar event {} was written for {} but its link could not be stored: {}",
                  event_id, target, e);
            return Err(e);
        }
        info!("Synced {} to calendar event {} ({:?})", target, event_id, action);

        Ok(SyncOutcome { target, event_id: Some(event_id), action })
    }

    /// Delete the external event of a record and clear its link.
    #[instrument(skip(self, target, auth_token), fields(target = %target))]
    pub async fn remove(&self, target: SyncTarget, auth_token: &str) -> Result<SyncOutcome, CalendarSyncError> {
        let linked = self.load_link(target, auth_token).await?;

        let Some(event_id) = linked.external_calendar_event_id else {
            debug!("{} has no calendar event to remove", target);
            return Ok(SyncOutcome { target, event_id: None, action: SyncAction::Removed });
        };

        let access_token = self.credentials.access_token(linked.professional_id, auth_token).await?;
        match self.google.delete_event(&access_token, &event_id).await {
            Err(CalendarSyncError::Unauthorized) => {
                let access_token = self.credentials.force_refresh(linked.professional_id, auth_token).await?;
                self.google.delete_event(&access_token, &event_id).await?;
            }
            other => other?,
        }

        self.mark_synced(target, None, auth_token).await?;
        info!("Removed calendar event {} of {}", event_id, target);

        Ok(SyncOutcome { target, event_id: Some(event_id), action: SyncAction::Removed })
    }

    /// Sync every unsynced, non-cancelled appointment and activity of the
    /// professional dated today or later, today being the clinic's local date.
    /// Individual failures are counted, not propagated.
    pub async fn sync_pending(&self, professional_id: Uuid, auth_token: &str) -> Result<SyncReport, CalendarSyncError> {
        let today = local_today(&self.timezone, Utc::now());

        let appointments_path = format!(
            "/rest/v1/appointments?professional_id=eq.{}&synced_with_google=eq.false&status=neq.cancelled&is_group_activity=eq.false&date=gte.{}&select=id",
            professional_id, today
        );
        let activities_path = format!(
            "/rest/v1/group_activities?professional_id=eq.{}&synced_with_google=eq.false&date=gte.{}&select=id",
            professional_id, today
        );

        let appointments: Vec<PendingRow> = self.supabase.request(Method::GET, &appointments_path, Some(auth_token), None).await?;
        let activities: Vec<PendingRow> = self.supabase.request(Method::GET, &activities_path, Some(auth_token), None).await?;

        let targets = appointments
            .into_iter()
            .map(|row| SyncTarget::Appointment(row.id))
            .chain(activities.into_iter().map(|row| SyncTarget::GroupActivity(row.id)));

        let mut report = SyncReport::default();
        for target in targets {
            match self.sync(target, auth_token).await {
                Ok(_) => report.synced += 1,
                Err(e) => {
                    warn!("Failed to sync {}: {}", target, e);
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", target, e));
                }
            }
        }

        info!("Pending sync for professional {}: {} synced, {} failed",
              professional_id, report.synced, report.failed);
        Ok(report)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn write_event(
        &self,
        access_token: &str,
        existing_id: Option<&str>,
        event: &CalendarEvent,
    ) -> Result<(String, SyncAction), CalendarSyncError> {
        if let Some(event_id) = existing_id {
            if self.google.get_event(access_token, event_id).await?.is_some() {
                let updated = self.google.update_event(access_token, event_id, event).await?;
                return Ok((updated.id, SyncAction::Updated));
            }
            debug!("Stored calendar event {} is gone, creating a new one", event_id);
        }

        let created = self.google.create_event(access_token, event).await?;
        Ok((created.id, SyncAction::Created))
    }

    async fn mark_synced(&self, target: SyncTarget, event_id: Option<&str>, auth_token: &str) -> Result<(), CalendarSyncError> {
        let path = format!("/rest/v1/{}?id=eq.{}", target.table(), target.id());
        let update = json!({
            "external_calendar_event_id": event_id,
            "synced_with_google": event_id.is_some(),
            "last_synced_at": Utc::now().to_rfc3339()
        });
        let _: Value = self.supabase.request(Method::PATCH, &path, Some(auth_token), Some(update)).await?;
        Ok(())
    }

    async fn load_appointment(&self, id: Uuid, auth_token: &str) -> Result<AppointmentSyncRecord, CalendarSyncError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", id, APPOINTMENT_SELECT);
        self.fetch_one(&path, SyncTarget::Appointment(id), auth_token).await
    }

    async fn load_activity(&self, id: Uuid, auth_token: &str) -> Result<ActivitySyncRecord, CalendarSyncError> {
        let path = format!("/rest/v1/group_activities?id=eq.{}&select={}", id, ACTIVITY_SELECT);
        self.fetch_one(&path, SyncTarget::GroupActivity(id), auth_token).await
    }

    async fn load_link(&self, target: SyncTarget, auth_token: &str) -> Result<LinkedEvent, CalendarSyncError> {
        let path = format!(
            "/rest/v1/{}?id=eq.{}&select=professional_id,external_calendar_event_id",
            target.table(),
            target.id()
        );
        self.fetch_one(&path, target, auth_token).await
    }

    async fn fetch_one<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        target: SyncTarget,
        auth_token: &str,
    ) -> Result<T, CalendarSyncError> {
        let rows: Vec<Value> = self.supabase.request(Method::GET, path, Some(auth_token), None).await?;
        match rows.into_iter().next() {
            Some(row) => Ok(serde_json::from_value(row)?),
            None => Err(CalendarSyncError::NotFound(target.to_string())),
        }
    }
}
