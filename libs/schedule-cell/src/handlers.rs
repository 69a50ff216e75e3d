// libs/schedule-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::NaiveDate;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityQuery, AvailabilityRangeQuery, CreateBreakRequest, CreateIntervalRequest,
    NextSlotQuery, SetDateExceptionRequest, UpdateBreakRequest, UpdateIntervalRequest,
};
use crate::services::{AvailabilityService, WorkScheduleService};

// ==============================================================================
// WORK SCHEDULE HANDLERS
// ==============================================================================

pub async fn get_weekly_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = WorkScheduleService::new(&state);
    let schedule = service.get_weekly_schedule(professional_id, auth.token()).await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "intervals": schedule,
    })))
}

pub async fn create_interval(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateIntervalRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = WorkScheduleService::new(&state);
    let interval = service.create_interval(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(interval))))
}

pub async fn update_interval(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(interval_id): Path<Uuid>,
    Json(request): Json<UpdateIntervalRequest>,
) -> Result<Json<Value>, AppError> {
    let service = WorkScheduleService::new(&state);
    let interval = service.update_interval(interval_id, request, auth.token()).await?;

    Ok(Json(json!(interval)))
}

pub async fn delete_interval(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(interval_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = WorkScheduleService::new(&state);
    service.delete_interval(interval_id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_break(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(interval_id): Path<Uuid>,
    Json(request): Json<CreateBreakRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = WorkScheduleService::new(&state);
    let brk = service.add_break(interval_id, request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(brk))))
}

pub async fn update_break(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(break_id): Path<Uuid>,
    Json(request): Json<UpdateBreakRequest>,
) -> Result<Json<Value>, AppError> {
    let service = WorkScheduleService::new(&state);
    let brk = service.update_break(break_id, request, auth.token()).await?;

    Ok(Json(json!(brk)))
}

pub async fn delete_break(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(break_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = WorkScheduleService::new(&state);
    service.delete_break(break_id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_date_exception(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
    Json(request): Json<SetDateExceptionRequest>,
) -> Result<Json<Value>, AppError> {
    let service = WorkScheduleService::new(&state);
    let date = request.date;
    let intervals = service.set_date_exception(professional_id, request, auth.token()).await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "date": date,
        "intervals": intervals,
    })))
}

pub async fn clear_date_exception(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path((professional_id, date)): Path<(Uuid, NaiveDate)>,
) -> Result<StatusCode, AppError> {
    let service = WorkScheduleService::new(&state);
    service.clear_date_exception(professional_id, date, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let slots = service
        .compute_available_slots(professional_id, query.date, query.duration_minutes, auth.token())
        .await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "date": query.date,
        "duration_minutes": query.duration_minutes,
        "slots": slots,
    })))
}

pub async fn get_available_range(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<AvailabilityRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let days = service
        .compute_range(professional_id, query.from, query.to, query.duration_minutes, auth.token())
        .await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "days": days,
    })))
}

pub async fn get_next_available_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<NextSlotQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let next = service
        .find_next_available_slot(professional_id, query.from, query.duration_minutes, query.max_days, auth.token())
        .await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "next_available": next,
    })))
}
