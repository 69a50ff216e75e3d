// libs/schedule-cell/src/services/schedule.rs
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::time::{format_clock_time, parse_clock_time, ranges_overlap};

use crate::models::{
    BreakInterval, CreateBreakRequest, CreateIntervalRequest, DayInterval, DaySource,
    MinuteRange, ResolvedDay, ScheduleError, SetDateExceptionRequest, UpdateBreakRequest,
    UpdateIntervalRequest, WorkInterval, WorkIntervalWithBreaks,
};

/// Database function that deletes and re-inserts a date's exception rows in
/// one transaction.
pub const REPLACE_DATE_EXCEPTION_FUNCTION: &str = "replace_date_exception";

/// Day-of-week index used by the schedule tables (0 = Sunday).
pub fn day_of_week(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

/// Turn stored rows into minute ranges. Rows that violate `start < end` are
/// skipped rather than failing the whole day.
pub fn build_day_intervals(
    intervals: &[WorkInterval],
    breaks: &[BreakInterval],
) -> Result<Vec<DayInterval>, ScheduleError> {
    let mut day_intervals = Vec::new();

    for interval in intervals.iter().filter(|i| i.is_active) {
        let (start, end) = interval.minutes()?;
        if start >= end {
            warn!("Ignoring work interval {} with start {} >= end {}",
                  interval.id, interval.start_time, interval.end_time);
            continue;
        }

        let mut interval_breaks = Vec::new();
        for brk in breaks.iter().filter(|b| b.interval_id == interval.id && b.is_active) {
            let (break_start, break_end) = brk.minutes()?;
            if break_start >= break_end {
                warn!("Ignoring empty break {} on interval {}", brk.id, interval.id);
                continue;
            }
            interval_breaks.push(MinuteRange::new(break_start, break_end));
        }

        day_intervals.push(DayInterval {
            interval_id: interval.id,
            range: MinuteRange::new(start, end),
            buffer_minutes: interval.buffer_minutes.max(0) as u32,
            breaks: interval_breaks,
        });
    }

    day_intervals.sort_by_key(|i| (i.range.start, i.range.end));
    Ok(day_intervals)
}

fn validate_range(start_time: &str, end_time: &str) -> Result<(u32, u32), ScheduleError> {
    let start = parse_clock_time(start_time)?;
    let end = parse_clock_time(end_time)?;
    if start >= end {
        return Err(ScheduleError::Validation("Start time must be before end time".to_string()));
    }
    Ok((start, end))
}

fn validate_buffer(buffer_minutes: Option<i32>) -> Result<i32, ScheduleError> {
    let buffer = buffer_minutes.unwrap_or(0);
    if buffer < 0 {
        return Err(ScheduleError::Validation("Buffer minutes cannot be negative".to_string()));
    }
    Ok(buffer)
}

pub struct WorkScheduleService {
    supabase: Arc<SupabaseClient>,
}

impl WorkScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Weekday pattern of a professional, breaks attached.
    pub async fn get_weekly_schedule(
        &self,
        professional_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<WorkIntervalWithBreaks>, ScheduleError> {
        debug!("Fetching weekly schedule for professional {}", professional_id);

        let path = format!(
            "/rest/v1/work_intervals?professional_id=eq.{}&specific_date=is.null&order=day_of_week.asc,start_time.asc",
            professional_id
        );
        let intervals = self.fetch_intervals(&path, auth_token).await?;
        let breaks = self.fetch_breaks(&intervals, false, auth_token).await?;

        Ok(intervals
            .into_iter()
            .map(|interval| {
                let own_breaks = breaks
                    .iter()
                    .filter(|b| b.interval_id == interval.id)
                    .cloned()
                    .collect();
                WorkIntervalWithBreaks { interval, breaks: own_breaks }
            })
            .collect())
    }

    /// Resolve the working intervals for one calendar date. Exception rows for
    /// the date replace the weekday pattern entirely, even when they are all
    /// inactive (a day off).
    pub async fn resolve_day(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<ResolvedDay, ScheduleError> {
        let exceptions = self.get_date_exception(professional_id, date, auth_token).await?;

        let (source, intervals) = if !exceptions.is_empty() {
            debug!("Using {} exception interval(s) for {} on {}", exceptions.len(), professional_id, date);
            (DaySource::Exception, exceptions)
        } else {
            let path = format!(
                "/rest/v1/work_intervals?professional_id=eq.{}&day_of_week=eq.{}&specific_date=is.null&is_active=eq.true&order=start_time.asc",
                professional_id,
                day_of_week(date)
            );
            (DaySource::Weekly, self.fetch_intervals(&path, auth_token).await?)
        };

        let active: Vec<WorkInterval> = intervals.into_iter().filter(|i| i.is_active).collect();
        let breaks = self.fetch_breaks(&active, true, auth_token).await?;

        Ok(ResolvedDay {
            date,
            source,
            intervals: build_day_intervals(&active, &breaks)?,
        })
    }

    pub async fn get_date_exception(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<WorkInterval>, ScheduleError> {
        let path = format!(
            "/rest/v1/work_intervals?professional_id=eq.{}&specific_date=eq.{}&order=start_time.asc",
            professional_id, date
        );
        self.fetch_intervals(&path, auth_token).await
    }

    pub async fn create_interval(
        &self,
        request: CreateIntervalRequest,
        auth_token: &str,
    ) -> Result<WorkInterval, ScheduleError> {
        debug!("Creating work interval for professional {}", request.professional_id);

        let (start, end) = validate_range(&request.start_time, &request.end_time)?;
        let buffer = validate_buffer(request.buffer_minutes)?;

        match (request.day_of_week, request.specific_date) {
            (Some(day), None) if (0..=6).contains(&day) => {}
            (Some(_), None) => {
                return Err(ScheduleError::Validation(
                    "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                ));
            }
            (None, Some(_)) => {}
            _ => {
                return Err(ScheduleError::Validation(
                    "Exactly one of day_of_week or specific_date is required".to_string(),
                ));
            }
        }

        let is_active = request.is_active.unwrap_or(true);
        if is_active {
            self.check_interval_conflicts(
                request.professional_id,
                request.day_of_week,
                request.specific_date,
                start,
                end,
                None,
                auth_token,
            ).await?;
        }

        let interval_data = json!({
            "professional_id": request.professional_id,
            "day_of_week": request.day_of_week,
            "specific_date": request.specific_date,
            "start_time": format_clock_time(start),
            "end_time": format_clock_time(end),
            "is_active": is_active,
            "buffer_minutes": buffer
        });

        let created = self.insert_one::<WorkInterval>("/rest/v1/work_intervals", interval_data, auth_token).await?;
        info!("Work interval {} created for professional {}", created.id, created.professional_id);
        Ok(created)
    }

    pub async fn update_interval(
        &self,
        interval_id: Uuid,
        request: UpdateIntervalRequest,
        auth_token: &str,
    ) -> Result<WorkInterval, ScheduleError> {
        debug!("Updating work interval {}", interval_id);

        let current = self.get_interval(interval_id, auth_token).await?;
        let start_time = request.start_time.clone().unwrap_or_else(|| current.start_time.clone());
        let end_time = request.end_time.clone().unwrap_or_else(|| current.end_time.clone());
        let (start, end) = validate_range(&start_time, &end_time)?;
        let is_active = request.is_active.unwrap_or(current.is_active);

        if is_active {
            self.check_interval_conflicts(
                current.professional_id,
                current.day_of_week,
                current.specific_date,
                start,
                end,
                Some(interval_id),
                auth_token,
            ).await?;
        }

        if request.start_time.is_some() || request.end_time.is_some() {
            let resized = WorkInterval {
                start_time: format_clock_time(start),
                end_time: format_clock_time(end),
                ..current.clone()
            };
            for brk in self.fetch_breaks(std::slice::from_ref(&current), false, auth_token).await? {
                let (break_start, break_end) = brk.minutes()?;
                Self::check_break_containment(&resized, break_start, break_end).map_err(|_| {
                    ScheduleError::Validation(format!(
                        "Break '{}' ({}-{}) would fall outside the interval {}-{}",
                        brk.name, brk.start_time, brk.end_time, resized.start_time, resized.end_time
                    ))
                })?;
            }
        }

        let mut update_data = serde_json::Map::new();
        if request.start_time.is_some() {
            update_data.insert("start_time".to_string(), json!(format_clock_time(start)));
        }
        if request.end_time.is_some() {
            update_data.insert("end_time".to_string(), json!(format_clock_time(end)));
        }
        if request.buffer_minutes.is_some() {
            update_data.insert("buffer_minutes".to_string(), json!(validate_buffer(request.buffer_minutes)?));
        }
        if let Some(active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(active));
        }

        let path = format!("/rest/v1/work_intervals?id=eq.{}", interval_id);
        let updated: Vec<WorkInterval> = self.supabase
            .request_returning(Method::PATCH, &path, Some(auth_token), Some(Value::Object(update_data)))
            .await?;

        updated
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::NotFound(format!("work interval {}", interval_id)))
    }

    pub async fn set_interval_active(
        &self,
        interval_id: Uuid,
        is_active: bool,
        auth_token: &str,
    ) -> Result<WorkInterval, ScheduleError> {
        let request = UpdateIntervalRequest {
            is_active: Some(is_active),
            ..Default::default()
        };
        self.update_interval(interval_id, request, auth_token).await
    }

    pub async fn delete_interval(&self, interval_id: Uuid, auth_token: &str) -> Result<(), ScheduleError> {
        debug!("Deleting work interval {}", interval_id);
        self.delete_intervals(&[interval_id], auth_token).await
    }

    /// Attach a break to an interval. The break must sit inside the interval;
    /// overlap with sibling breaks is allowed and handled at read time.
    pub async fn add_break(
        &self,
        interval_id: Uuid,
        request: CreateBreakRequest,
        auth_token: &str,
    ) -> Result<BreakInterval, ScheduleError> {
        debug!("Adding break '{}' to interval {}", request.name, interval_id);

        if request.name.trim().is_empty() {
            return Err(ScheduleError::Validation("Break name is required".to_string()));
        }

        let interval = self.get_interval(interval_id, auth_token).await?;
        let (start, end) = validate_range(&request.start_time, &request.end_time)?;
        Self::check_break_containment(&interval, start, end)?;

        let break_data = json!({
            "interval_id": interval_id,
            "name": request.name.trim(),
            "start_time": format_clock_time(start),
            "end_time": format_clock_time(end),
            "is_active": true,
            "sort_order": request.sort_order.unwrap_or(0)
        });

        self.insert_one::<BreakInterval>("/rest/v1/interval_breaks", break_data, auth_token).await
    }

    pub async fn update_break(
        &self,
        break_id: Uuid,
        request: UpdateBreakRequest,
        auth_token: &str,
    ) -> Result<BreakInterval, ScheduleError> {
        let path = format!("/rest/v1/interval_breaks?id=eq.{}", break_id);
        let current: BreakInterval = self.fetch_one(&path, auth_token)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("break {}", break_id)))?;

        let interval = self.get_interval(current.interval_id, auth_token).await?;
        let start_time = request.start_time.clone().unwrap_or_else(|| current.start_time.clone());
        let end_time = request.end_time.clone().unwrap_or_else(|| current.end_time.clone());
        let (start, end) = validate_range(&start_time, &end_time)?;
        Self::check_break_containment(&interval, start, end)?;

        let mut update_data = serde_json::Map::new();
        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if request.start_time.is_some() {
            update_data.insert("start_time".to_string(), json!(format_clock_time(start)));
        }
        if request.end_time.is_some() {
            update_data.insert("end_time".to_string(), json!(format_clock_time(end)));
        }
        if let Some(active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(active));
        }
        if let Some(order) = request.sort_order {
            update_data.insert("sort_order".to_string(), json!(order));
        }

        let updated: Vec<BreakInterval> = self.supabase
            .request_returning(Method::PATCH, &path, Some(auth_token), Some(Value::Object(update_data)))
            .await?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::NotFound(format!("break {}", break_id)))
    }

    pub async fn delete_break(&self, break_id: Uuid, auth_token: &str) -> Result<(), ScheduleError> {
        let path = format!("/rest/v1/interval_breaks?id=eq.{}", break_id);
        let _: Value = self.supabase.request(Method::DELETE, &path, Some(auth_token), None).await?;
        Ok(())
    }

    /// Replace every exception row of a date in one database transaction, so a
    /// failure never leaves the date without its previous exception. An empty
    /// interval list stores an inactive marker so the date resolves to no
    /// working time at all.
    pub async fn set_date_exception(
        &self,
        professional_id: Uuid,
        request: SetDateExceptionRequest,
        auth_token: &str,
    ) -> Result<Vec<WorkInterval>, ScheduleError> {
        info!("Setting schedule exception for professional {} on {}", professional_id, request.date);

        let mut parsed: Vec<(u32, u32, i32)> = Vec::with_capacity(request.intervals.len());
        for input in &request.intervals {
            let (start, end) = validate_range(&input.start_time, &input.end_time)?;
            let buffer = validate_buffer(input.buffer_minutes)?;
            if parsed.iter().any(|(s, e, _)| ranges_overlap(start as i64, end as i64, *s as i64, *e as i64)) {
                return Err(ScheduleError::Validation(format!(
                    "Exception intervals overlap at {}-{}", input.start_time, input.end_time
                )));
            }
            parsed.push((start, end, buffer));
        }

        let rows: Vec<Value> = if parsed.is_empty() {
            vec![json!({
                "start_time": "00:00",
                "end_time": "24:00",
                "is_active": false,
                "buffer_minutes": 0
            })]
        } else {
            parsed
                .iter()
                .map(|(start, end, buffer)| json!({
                    "start_time": format_clock_time(*start),
                    "end_time": format_clock_time(*end),
                    "is_active": true,
                    "buffer_minutes": buffer
                }))
                .collect()
        };

        let args = json!({
            "p_professional_id": professional_id,
            "p_date": request.date,
            "p_intervals": rows
        });
        let created: Vec<WorkInterval> = self.supabase
            .rpc(REPLACE_DATE_EXCEPTION_FUNCTION, Some(auth_token), args)
            .await?;
        Ok(created)
    }

    pub async fn clear_date_exception(
        &self,
        professional_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        let existing = self.get_date_exception(professional_id, date, auth_token).await?;
        if existing.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = existing.iter().map(|i| i.id).collect();
        self.delete_intervals(&ids, auth_token).await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn get_interval(&self, interval_id: Uuid, auth_token: &str) -> Result<WorkInterval, ScheduleError> {
        let path = format!("/rest/v1/work_intervals?id=eq.{}", interval_id);
        self.fetch_one(&path, auth_token)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("work interval {}", interval_id)))
    }

    fn check_break_containment(interval: &WorkInterval, start: u32, end: u32) -> Result<(), ScheduleError> {
        let (interval_start, interval_end) = interval.minutes()?;
        if start < interval_start || end > interval_end {
            return Err(ScheduleError::Validation(format!(
                "Break must be within the interval {}-{}",
                interval.start_time, interval.end_time
            )));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn check_interval_conflicts(
        &self,
        professional_id: Uuid,
        day: Option<i32>,
        specific_date: Option<NaiveDate>,
        start: u32,
        end: u32,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), ScheduleError> {
        let mut path = format!(
            "/rest/v1/work_intervals?professional_id=eq.{}&is_active=eq.true",
            professional_id
        );
        match (day, specific_date) {
            (_, Some(date)) => path.push_str(&format!("&specific_date=eq.{}", date)),
            (Some(day), None) => path.push_str(&format!("&day_of_week=eq.{}&specific_date=is.null", day)),
            (None, None) => return Ok(()),
        }
        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        for existing in self.fetch_intervals(&path, auth_token).await? {
            let (existing_start, existing_end) = existing.minutes()?;
            if ranges_overlap(start as i64, end as i64, existing_start as i64, existing_end as i64) {
                warn!("Interval {}-{} overlaps existing interval {}",
                      format_clock_time(start), format_clock_time(end), existing.id);
                return Err(ScheduleError::OverlappingInterval(existing.id));
            }
        }

        Ok(())
    }

    async fn delete_intervals(&self, ids: &[Uuid], auth_token: &str) -> Result<(), ScheduleError> {
        let id_list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");

        let breaks_path = format!("/rest/v1/interval_breaks?interval_id=in.({})", id_list);
        let _: Value = self.supabase.request(Method::DELETE, &breaks_path, Some(auth_token), None).await?;

        let path = format!("/rest/v1/work_intervals?id=in.({})", id_list);
        let _: Value = self.supabase.request(Method::DELETE, &path, Some(auth_token), None).await?;
        Ok(())
    }

    async fn fetch_intervals(&self, path: &str, auth_token: &str) -> Result<Vec<WorkInterval>, ScheduleError> {
        let result: Vec<Value> = self.supabase.request(Method::GET, path, Some(auth_token), None).await?;
        let intervals = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<WorkInterval>, _>>()?;
        Ok(intervals)
    }

    async fn fetch_breaks(
        &self,
        intervals: &[WorkInterval],
        active_only: bool,
        auth_token: &str,
    ) -> Result<Vec<BreakInterval>, ScheduleError> {
        if intervals.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = intervals.iter().map(|i| i.id.to_string()).collect::<Vec<_>>().join(",");
        let mut path = format!("/rest/v1/interval_breaks?interval_id=in.({})", id_list);
        if active_only {
            path.push_str("&is_active=eq.true");
        }
        path.push_str("&order=sort_order.asc");

        let result: Vec<Value> = self.supabase.request(Method::GET, &path, Some(auth_token), None).await?;
        let breaks = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BreakInterval>, _>>()?;
        Ok(breaks)
    }

    async fn fetch_one<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Option<T>, ScheduleError> {
        let result: Vec<Value> = self.supabase.request(Method::GET, path, Some(auth_token), None).await?;
        match result.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn insert_one<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        auth_token: &str,
    ) -> Result<T, ScheduleError> {
        let result: Vec<T> = self.supabase
            .request_returning(Method::POST, path, Some(auth_token), Some(body))
            .await?;
        result
            .into_iter()
            .next()
            .ok_or_else(|| ScheduleError::Database(format!("Insert into {} returned no rows", path)))
    }
}
