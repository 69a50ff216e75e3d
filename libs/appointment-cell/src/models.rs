// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;
use thiserror::Error;

use shared_utils::time::{parse_clock_time, TimeError};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub service_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub external_calendar_event_id: Option<String>,
    #[serde(default)]
    pub synced_with_google: bool,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_group_activity: bool,
    #[serde(default)]
    pub group_activity_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn minutes(&self) -> Result<(u32, u32), TimeError> {
        Ok((parse_clock_time(&self.start_time)?, parse_clock_time(&self.end_time)?))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// Cancelled appointments free their time; every other status holds it.
    pub fn occupies_time(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// A row about to be admitted by the conflict guard. Times are `HH:MM`.
/// `duration_minutes` and `buffer_minutes` are filled in by the guard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub professional_id: Uuid,
    pub client_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    pub is_group_activity: bool,
    pub group_activity_id: Option<Uuid>,
    #[serde(default)]
    pub buffer_minutes: i32,
}

// ==============================================================================
// CLIENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientContact {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// A phone number reduced to country code and national digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPhone {
    pub country_code: String,
    pub national: String,
}

impl NormalizedPhone {
    pub fn canonical(&self) -> String {
        format!("+{}{}", self.country_code, self.national)
    }

    /// Spellings of the same number that may already be stored.
    pub fn variants(&self) -> Vec<String> {
        let mut variants = vec![
            self.canonical(),
            format!("{}{}", self.country_code, self.national),
            self.national.clone(),
            format!("00{}{}", self.country_code, self.national),
        ];
        variants.dedup();
        variants
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub professional_id: Uuid,
    pub client_name: String,
    pub client_phone: String,
    pub client_email: Option<String>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub service_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckQuery {
    pub professional_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientLookupQuery {
    pub phone: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Requested time overlaps an existing appointment")]
    SlotConflict,

    #[error("Outside the professional's schedule: {0}")]
    OutsideSchedule(String),

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<TimeError> for AppointmentError {
    fn from(err: TimeError) -> Self {
        AppointmentError::Validation(err.to_string())
    }
}

impl From<shared_database::SupabaseError> for AppointmentError {
    fn from(err: shared_database::SupabaseError) -> Self {
        if err.is_conflict() {
            return AppointmentError::SlotConflict;
        }
        AppointmentError::Storage(err.to_string())
    }
}

impl From<schedule_cell::ScheduleError> for AppointmentError {
    fn from(err: schedule_cell::ScheduleError) -> Self {
        use schedule_cell::ScheduleError;
        match err {
            ScheduleError::Validation(msg) => AppointmentError::Validation(msg),
            other => AppointmentError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppointmentError {
    fn from(err: serde_json::Error) -> Self {
        AppointmentError::Storage(format!("Failed to parse appointment row: {}", err))
    }
}

impl From<AppointmentError> for shared_models::AppError {
    fn from(err: AppointmentError) -> Self {
        use shared_models::AppError;
        match err {
            AppointmentError::Validation(msg) => AppError::ValidationError(msg),
            AppointmentError::SlotConflict => AppError::Conflict(err.to_string()),
            AppointmentError::OutsideSchedule(_) => AppError::ValidationError(err.to_string()),
            AppointmentError::NotFound(_) => AppError::NotFound(err.to_string()),
            AppointmentError::Storage(msg) => AppError::Database(msg),
        }
    }
}
