use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Tokens are refreshed this long before they actually expire.
pub const REFRESH_SKEW_SECONDS: i64 = 60;

// ==============================================================================
// CREDENTIALS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarCredentials {
    pub professional_id: Uuid,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CalendarCredentials {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(REFRESH_SKEW_SECONDS),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: Option<String>,
}

// ==============================================================================
// GOOGLE CALENDAR PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Event body sent on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<EventAttendee>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub html_link: Option<String>,
}

impl GoogleEventResponse {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

// ==============================================================================
// SYNC SOURCES (rows read from the store with their embedded relations)
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSyncRecord {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub external_calendar_event_id: Option<String>,
    #[serde(default)]
    pub client: Option<ContactInfo>,
    #[serde(default)]
    pub service: Option<ServiceInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantContact {
    pub enrollment_status: String,
    #[serde(default)]
    pub client: Option<ContactInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySyncRecord {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub max_participants: i32,
    #[serde(default)]
    pub external_calendar_event_id: Option<String>,
    #[serde(default)]
    pub participants: Vec<ParticipantContact>,
}

// ==============================================================================
// SYNC TARGETS AND OUTCOMES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SyncTarget {
    Appointment(Uuid),
    GroupActivity(Uuid),
}

impl SyncTarget {
    pub fn id(&self) -> Uuid {
        match self {
            SyncTarget::Appointment(id) | SyncTarget::GroupActivity(id) => *id,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            SyncTarget::Appointment(_) => "appointments",
            SyncTarget::GroupActivity(_) => "group_activities",
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTarget::Appointment(id) => write!(f, "appointment {}", id),
            SyncTarget::GroupActivity(id) => write!(f, "group activity {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub target: SyncTarget,
    pub event_id: Option<String>,
    pub action: SyncAction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum CalendarSyncError {
    #[error("Calendar sync is not configured")]
    NotConfigured,

    #[error("No calendar credentials stored for professional {0}")]
    CredentialsMissing(Uuid),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Calendar rejected the access token")]
    Unauthorized,

    #[error("Calendar API error ({status}): {message}")]
    GoogleApi { status: u16, message: String },

    #[error("Sync source not found: {0}")]
    NotFound(String),

    #[error("Invalid sync source: {0}")]
    InvalidRecord(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar sync timed out after {0} seconds")]
    Timeout(u64),
}

impl From<shared_database::SupabaseError> for CalendarSyncError {
    fn from(err: shared_database::SupabaseError) -> Self {
        CalendarSyncError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CalendarSyncError {
    fn from(err: serde_json::Error) -> Self {
        CalendarSyncError::Database(format!("Failed to parse sync source: {}", err))
    }
}

impl From<CalendarSyncError> for shared_models::AppError {
    fn from(err: CalendarSyncError) -> Self {
        use shared_models::AppError;
        match err {
            CalendarSyncError::NotFound(msg) => AppError::NotFound(msg),
            CalendarSyncError::InvalidRecord(msg) => AppError::ValidationError(msg),
            CalendarSyncError::Database(msg) => AppError::Database(msg),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}
