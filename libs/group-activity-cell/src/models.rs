// libs/group-activity-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::AppointmentError;
use shared_utils::time::TimeError;

// ==============================================================================
// GROUP ACTIVITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupActivity {
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
    pub recurrence_series_id: Option<Uuid>,
    #[serde(default)]
    pub external_calendar_event_id: Option<String>,
    #[serde(default)]
    pub synced_with_google: bool,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Confirmed,
    Pending,
    WaitingList,
    Cancelled,
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnrollmentStatus::Confirmed => write!(f, "confirmed"),
            EnrollmentStatus::Pending => write!(f, "pending"),
            EnrollmentStatus::WaitingList => write!(f, "waiting_list"),
            EnrollmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: Uuid,
    pub activity_id: Uuid,
    pub client_id: Uuid,
    pub enrollment_status: EnrollmentStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.enrollment_status != EnrollmentStatus::Cancelled
    }
}

/// Participant counts of one activity, cancelled enrollments excluded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ParticipantStats {
    pub confirmed: u32,
    pub pending: u32,
    pub waiting_list: u32,
    pub total_active: u32,
    pub max_participants: u32,
    pub available_spots: u32,
}

// ==============================================================================
// RECURRENCE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Weekly,
    Monthly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceTermination {
    ByDate { end_date: NaiveDate },
    ByCount { count: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: RecurrenceFrequency,
    #[serde(default = "default_interval")]
    pub interval: u32,
    pub termination: RecurrenceTermination,
}

fn default_interval() -> u32 {
    1
}

impl RecurrenceRule {
    pub fn weekly(interval: u32, termination: RecurrenceTermination) -> Self {
        Self { frequency: RecurrenceFrequency::Weekly, interval, termination }
    }

    pub fn monthly(interval: u32, termination: RecurrenceTermination) -> Self {
        Self { frequency: RecurrenceFrequency::Monthly, interval, termination }
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivityRequest {
    pub professional_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub max_participants: i32,
    /// Absent for a one-off activity.
    pub recurrence: Option<RecurrenceRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollParticipantRequest {
    pub client_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateParticipantStatusRequest {
    pub status: EnrollmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrencePreviewRequest {
    pub start_date: NaiveDate,
    pub rule: RecurrenceRule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedOccurrence {
    pub date: NaiveDate,
    pub reason: String,
}

/// Result of materializing an activity or a whole series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySeriesResult {
    pub series_id: Option<Uuid>,
    pub created: Vec<GroupActivity>,
    pub skipped: Vec<SkippedOccurrence>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum GroupActivityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Client {0} is already enrolled in this activity")]
    AlreadyEnrolled(Uuid),

    #[error("Requested time overlaps an existing appointment")]
    SlotConflict,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<TimeError> for GroupActivityError {
    fn from(err: TimeError) -> Self {
        GroupActivityError::Validation(err.to_string())
    }
}

impl From<shared_database::SupabaseError> for GroupActivityError {
    fn from(err: shared_database::SupabaseError) -> Self {
        GroupActivityError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for GroupActivityError {
    fn from(err: serde_json::Error) -> Self {
        GroupActivityError::Database(format!("Failed to parse activity row: {}", err))
    }
}

impl From<AppointmentError> for GroupActivityError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Validation(msg) => GroupActivityError::Validation(msg),
            AppointmentError::SlotConflict => GroupActivityError::SlotConflict,
            AppointmentError::OutsideSchedule(_) => GroupActivityError::Validation(err.to_string()),
            AppointmentError::NotFound(id) => GroupActivityError::NotFound(format!("appointment {}", id)),
            AppointmentError::Storage(msg) => GroupActivityError::Database(msg),
        }
    }
}

impl From<GroupActivityError> for shared_models::AppError {
    fn from(err: GroupActivityError) -> Self {
        use shared_models::AppError;
        match err {
            GroupActivityError::Validation(msg) => AppError::ValidationError(msg),
            GroupActivityError::NotFound(msg) => AppError::NotFound(msg),
            GroupActivityError::AlreadyEnrolled(_) | GroupActivityError::SlotConflict => {
                AppError::Conflict(err.to_string())
            }
            GroupActivityError::Database(msg) => AppError::Database(msg),
        }
    }
}
