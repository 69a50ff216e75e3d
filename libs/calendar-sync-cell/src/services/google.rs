// libs/calendar-sync-cell/src/services/google.rs
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, error, info};

use shared_config::AppConfig;

use crate::models::{CalendarEvent, CalendarSyncError, GoogleEventResponse};

/// Google Calendar v3 events client. Every call carries the professional's
/// access token; credential handling lives in `CredentialService`.
pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &AppConfig) -> Result<Self, CalendarSyncError> {
        if !config.is_calendar_sync_configured() {
            return Err(CalendarSyncError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.calendar_sync_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.google_calendar_base_url.trim_end_matches('/').to_string(),
            calendar_id: config.google_calendar_id.clone(),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, urlencoding::encode(&self.calendar_id))
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    /// POST /calendars/{calendarId}/events
    pub async fn create_event(
        &self,
        access_token: &str,
        event: &CalendarEvent,
    ) -> Result<GoogleEventResponse, CalendarSyncError> {
        debug!("Creating calendar event '{}'", event.summary);

        let response = self.client
            .post(self.events_url())
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;

        let created: GoogleEventResponse = Self::parse(response).await?;
        info!("Created calendar event {}", created.id);
        Ok(created)
    }

    /// GET /calendars/{calendarId}/events/{eventId}. A deleted or cancelled
    /// event reads as `None` so callers can recreate it.
    pub async fn get_event(
        &self,
        access_token: &str,
        event_id: &str,
    ) -> Result<Option<GoogleEventResponse>, CalendarSyncError> {
        let response = self.client
            .get(self.event_url(event_id))
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            debug!("Calendar event {} no longer exists", event_id);
            return Ok(None);
        }

        let event: GoogleEventResponse = Self::parse(response).await?;
        if event.is_cancelled() {
            debug!("Calendar event {} is cancelled", event_id);
            return Ok(None);
        }
        Ok(Some(event))
    }

    /// PUT /calendars/{calendarId}/events/{eventId}
    pub async fn update_event(
        &self,
        access_token: &str,
        event_id: &str,
        event: &CalendarEvent,
    ) -> Result<GoogleEventResponse, CalendarSyncError> {
        debug!("Updating calendar event {}", event_id);

        let response = self.client
            .put(self.event_url(event_id))
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;

        Self::parse(response).await
    }

    /// DELETE /calendars/{calendarId}/events/{eventId}. Already-deleted events
    /// are not an error.
    pub async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), CalendarSyncError> {
        debug!("Deleting calendar event {}", event_id);

        let response = self.client
            .delete(self.event_url(event_id))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(());
        }
        Err(Self::api_error(response).await)
    }

    async fn parse(response: Response) -> Result<GoogleEventResponse, CalendarSyncError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| CalendarSyncError::GoogleApi {
            status: 200,
            message: format!("Failed to parse event response: {}", e),
        })
    }

    async fn api_error(response: Response) -> CalendarSyncError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return CalendarSyncError::Unauthorized;
        }
        let message = response.text().await.unwrap_or_default();
        error!("Calendar API error ({}): {}", status, message);
        CalendarSyncError::GoogleApi { status: status.as_u16(), message }
    }
}
