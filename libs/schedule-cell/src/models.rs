use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::NaiveDate;
use thiserror::Error;

use shared_utils::time::{parse_clock_time, TimeError};

// ==============================================================================
// STORED SCHEDULE ROWS
// ==============================================================================

/// A contiguous schedulable range on a weekday, or on one specific date when
/// `specific_date` is set (an exception that replaces the weekday pattern).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkInterval {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub day_of_week: Option<i32>, // 0 = Sunday, 6 = Saturday
    pub specific_date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
    #[serde(default)]
    pub buffer_minutes: i32,
}

impl WorkInterval {
    pub fn is_exception(&self) -> bool {
        self.specific_date.is_some()
    }

    pub fn minutes(&self) -> Result<(u32, u32), TimeError> {
        Ok((parse_clock_time(&self.start_time)?, parse_clock_time(&self.end_time)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakInterval {
    pub id: Uuid,
    pub interval_id: Uuid,
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl BreakInterval {
    pub fn minutes(&self) -> Result<(u32, u32), TimeError> {
        Ok((parse_clock_time(&self.start_time)?, parse_clock_time(&self.end_time)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkIntervalWithBreaks {
    #[serde(flatten)]
    pub interval: WorkInterval,
    pub breaks: Vec<BreakInterval>,
}

// ==============================================================================
// RESOLVED DAY (minute offsets, ready for slot calculation)
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteRange {
    pub start: u32,
    pub end: u32,
}

impl MinuteRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayInterval {
    pub interval_id: Uuid,
    pub range: MinuteRange,
    pub buffer_minutes: u32,
    pub breaks: Vec<MinuteRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaySource {
    Weekly,
    Exception,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDay {
    pub date: NaiveDate,
    pub source: DaySource,
    pub intervals: Vec<DayInterval>,
}

/// An existing booking expressed in minutes, as seen by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedRange {
    pub start: u32,
    pub end: u32,
}

// ==============================================================================
// OUTPUT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextAvailableSlot {
    pub date: NaiveDate,
    pub slot: Slot,
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntervalRequest {
    pub professional_id: Uuid,
    pub day_of_week: Option<i32>,
    pub specific_date: Option<NaiveDate>,
    pub start_time: String,
    pub end_time: String,
    pub buffer_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIntervalRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub buffer_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBreakRequest {
    pub name: String,
    pub start_time: String,
    pub end_time: String,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBreakRequest {
    pub name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionIntervalInput {
    pub start_time: String,
    pub end_time: String,
    pub buffer_minutes: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDateExceptionRequest {
    pub date: NaiveDate,
    /// Empty means the professional does not work that day.
    pub intervals: Vec<ExceptionIntervalInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextSlotQuery {
    pub from: NaiveDate,
    pub duration_minutes: i32,
    pub max_days: Option<i64>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Why a requested range cannot be booked on a resolved day.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeRejection {
    #[error("Requested time is outside working hours")]
    OutsideWorkingHours,

    #[error("Requested time overlaps a break ({start}-{end})")]
    OverlapsBreak { start: String, end: String },

    #[error("Requested time is too close to an existing appointment")]
    Occupied,
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Schedule entry not found: {0}")]
    NotFound(String),

    #[error("Interval overlaps an existing active interval ({0})")]
    OverlappingInterval(Uuid),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<TimeError> for ScheduleError {
    fn from(err: TimeError) -> Self {
        ScheduleError::Validation(err.to_string())
    }
}

impl From<shared_database::SupabaseError> for ScheduleError {
    fn from(err: shared_database::SupabaseError) -> Self {
        ScheduleError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ScheduleError {
    fn from(err: serde_json::Error) -> Self {
        ScheduleError::Database(format!("Failed to parse schedule row: {}", err))
    }
}

impl From<ScheduleError> for shared_models::AppError {
    fn from(err: ScheduleError) -> Self {
        use shared_models::AppError;
        match err {
            ScheduleError::Validation(msg) => AppError::ValidationError(msg),
            ScheduleError::NotFound(msg) => AppError::NotFound(msg),
            ScheduleError::OverlappingInterval(_) => AppError::Conflict(err.to_string()),
            ScheduleError::Database(msg) => AppError::Database(msg),
        }
    }
}
