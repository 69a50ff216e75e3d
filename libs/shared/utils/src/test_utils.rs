use std::sync::Arc;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub const TEST_TOKEN: &str = "test-access-token";

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub google_base_url: String,
    pub timezone: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            google_base_url: "http://localhost:54322".to_string(),
            timezone: "Europe/Madrid".to_string(),
        }
    }
}

impl TestConfig {
    /// Point both the store and the calendar API at the same mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            google_base_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            google_client_id: "test-client-id".to_string(),
            google_client_secret: "test-client-secret".to_string(),
            google_calendar_base_url: format!("{}/calendar/v3", self.google_base_url),
            google_oauth_token_url: format!("{}/oauth/token", self.google_base_url),
            google_calendar_id: "primary".to_string(),
            calendar_timezone: self.timezone.clone(),
            calendar_sync_timeout_secs: 5,
            default_phone_country_code: "34".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Row shapes as returned by the PostgREST endpoints.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn weekly_interval(
        id: Uuid,
        professional_id: Uuid,
        day_of_week: i32,
        start_time: &str,
        end_time: &str,
        buffer_minutes: i32,
    ) -> Value {
        json!({
            "id": id,
            "professional_id": professional_id,
            "day_of_week": day_of_week,
            "specific_date": null,
            "start_time": start_time,
            "end_time": end_time,
            "is_active": true,
            "buffer_minutes": buffer_minutes
        })
    }

    pub fn exception_interval(
        id: Uuid,
        professional_id: Uuid,
        date: &str,
        start_time: &str,
        end_time: &str,
        is_active: bool,
    ) -> Value {
        json!({
            "id": id,
            "professional_id": professional_id,
            "day_of_week": null,
            "specific_date": date,
            "start_time": start_time,
            "end_time": end_time,
            "is_active": is_active,
            "buffer_minutes": 0
        })
    }

    pub fn break_interval(interval_id: Uuid, name: &str, start_time: &str, end_time: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "interval_id": interval_id,
            "name": name,
            "start_time": start_time,
            "end_time": end_time,
            "is_active": true,
            "sort_order": 0
        })
    }

    pub fn appointment(
        id: Uuid,
        professional_id: Uuid,
        client_id: Uuid,
        date: &str,
        start_time: &str,
        end_time: &str,
        status: &str,
        external_event_id: Option<&str>,
    ) -> Value {
        json!({
            "id": id,
            "professional_id": professional_id,
            "client_id": client_id,
            "service_id": null,
            "date": date,
            "start_time": start_time,
            "end_time": end_time,
            "duration_minutes": 30,
            "status": status,
            "notes": null,
            "external_calendar_event_id": external_event_id,
            "synced_with_google": external_event_id.is_some(),
            "last_synced_at": null,
            "is_group_activity": false,
            "group_activity_id": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn client(id: Uuid, name: &str, phone: &str, email: Option<&str>) -> Value {
        json!({
            "id": id,
            "name": name,
            "phone": phone,
            "email": email,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn group_activity(
        id: Uuid,
        professional_id: Uuid,
        title: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
        max_participants: i32,
        external_event_id: Option<&str>,
    ) -> Value {
        json!({
            "id": id,
            "professional_id": professional_id,
            "title": title,
            "description": null,
            "date": date,
            "start_time": start_time,
            "end_time": end_time,
            "max_participants": max_participants,
            "recurrence_series_id": null,
            "external_calendar_event_id": external_event_id,
            "synced_with_google": external_event_id.is_some(),
            "last_synced_at": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn participant(activity_id: Uuid, client_id: Uuid, status: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "activity_id": activity_id,
            "client_id": client_id,
            "enrollment_status": status,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    /// Credentials that stay valid for the next hour.
    pub fn calendar_credentials(professional_id: Uuid) -> Value {
        json!({
            "professional_id": professional_id,
            "access_token": "google-access-token",
            "refresh_token": "google-refresh-token",
            "expires_at": (Utc::now() + Duration::hours(1)).to_rfc3339()
        })
    }

    pub fn expired_calendar_credentials(professional_id: Uuid) -> Value {
        json!({
            "professional_id": professional_id,
            "access_token": "stale-access-token",
            "refresh_token": "google-refresh-token",
            "expires_at": (Utc::now() - Duration::minutes(5)).to_rfc3339()
        })
    }

    pub fn google_event(event_id: &str) -> Value {
        json!({
            "id": event_id,
            "status": "confirmed",
            "summary": "Appointment",
            "htmlLink": format!("https://calendar.google.com/event?eid={}", event_id)
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}
