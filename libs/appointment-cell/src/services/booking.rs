// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use calendar_sync_cell::{CalendarSyncDispatcher, SyncTarget};
use schedule_cell::WorkScheduleService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::time::minutes_between;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, ClientContact,
    NewAppointment,
};
use crate::services::client::ClientDirectory;
use crate::services::conflict::ConflictGuard;
use crate::services::store::{AppointmentStore, SupabaseAppointmentStore};

pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    guard: ConflictGuard,
    clients: ClientDirectory,
    calendar: CalendarSyncDispatcher,
}

impl AppointmentBookingService {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        let store: Arc<dyn AppointmentStore> = Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase)));
        Self::build(config, supabase, store)
    }

    /// Same wiring with a caller-provided appointment store.
    pub fn with_store(config: Arc<AppConfig>, store: Arc<dyn AppointmentStore>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        Self::build(config, supabase, store)
    }

    fn build(config: Arc<AppConfig>, supabase: Arc<SupabaseClient>, store: Arc<dyn AppointmentStore>) -> Self {
        Self {
            guard: ConflictGuard::new(Arc::clone(&store), WorkScheduleService::with_client(Arc::clone(&supabase))),
            clients: ClientDirectory::new(&config, supabase),
            calendar: CalendarSyncDispatcher::new(config),
            store,
        }
    }

    pub fn guard(&self) -> &ConflictGuard {
        &self.guard
    }

    pub fn clients(&self) -> &ClientDirectory {
        &self.clients
    }

    /// Resolve the client by phone, admit the appointment through the
    /// conflict guard (schedule fit, buffer, overlap), then hand the calendar sync to the background. The
    /// returned appointment is final whatever happens to the sync.
    #[instrument(skip(self, request, auth_token), fields(professional_id = %request.professional_id, date = %request.date))]
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking {}-{} on {}", request.start_time, request.end_time, request.date);

        // Reject malformed input before touching the store.
        if minutes_between(&request.start_time, &request.end_time)? <= 0 {
            return Err(AppointmentError::Validation("Appointment must end after it starts".to_string()));
        }
        self.clients.normalize(&request.client_phone)?;
        if request.client_name.trim().is_empty() {
            return Err(AppointmentError::Validation("Client name is required".to_string()));
        }

        let contact = ClientContact {
            name: request.client_name.clone(),
            phone: request.client_phone.clone(),
            email: request.client_email.clone(),
        };
        let client = self.clients.find_or_create(&contact, auth_token).await?;

        let candidate = NewAppointment {
            professional_id: request.professional_id,
            client_id: Some(client.id),
            service_id: request.service_id,
            date: request.date,
            start_time: request.start_time,
            end_time: request.end_time,
            duration_minutes: 0,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            is_group_activity: false,
            group_activity_id: None,
            buffer_minutes: 0,
        };

        let appointment = self.guard.admit(candidate, auth_token).await?;
        info!("Appointment {} booked for client {}", appointment.id, client.id);

        self.calendar.dispatch(SyncTarget::Appointment(appointment.id), auth_token);
        Ok(appointment)
    }

    /// Status changes are driven by callers; no transition is forbidden.
    /// Cancelling also removes the external calendar event.
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.store.update_status(appointment_id, status, auth_token).await?;
        info!("Appointment {} is now {}", appointment_id, status);

        let target = SyncTarget::Appointment(appointment_id);
        if status == AppointmentStatus::Cancelled {
            self.calendar.dispatch_removal(target, auth_token);
        } else if appointment.synced_with_google {
            self.calendar.dispatch(target, auth_token);
        }
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.store
            .get(appointment_id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound(appointment_id))
    }

    pub async fn list_day(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_for_day(professional_id, date, auth_token).await
    }
}
