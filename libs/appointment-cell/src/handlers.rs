// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    BookAppointmentRequest, ClientLookupQuery, ConflictCheckQuery, DayQuery, UpdateStatusRequest,
};
use crate::services::AppointmentBookingService;

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AppointmentBookingService::new(state);
    let appointment = service.book_appointment(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let appointment = service.get_appointment(appointment_id, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

pub async fn update_appointment_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let appointment = service.update_status(appointment_id, request.status, auth.token()).await?;

    Ok(Json(json!(appointment)))
}

pub async fn list_professional_day(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let appointments = service.list_day(professional_id, query.date, auth.token()).await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "date": query.date,
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

// ==============================================================================
// UTILITY HANDLERS
// ==============================================================================

pub async fn check_conflicts(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ConflictCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let conflicts = service
        .guard()
        .check(
            query.professional_id,
            query.date,
            &query.start_time,
            &query.end_time,
            query.exclude_appointment_id,
            auth.token(),
        )
        .await?;

    Ok(Json(json!({
        "has_conflict": !conflicts.is_empty(),
        "conflicting_appointments": conflicts,
    })))
}

pub async fn lookup_client(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<ClientLookupQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state);
    let phone = service.clients().normalize(&query.phone)?;
    let client = service.clients().find_by_phone(&phone, auth.token()).await?;

    Ok(Json(json!({
        "phone": phone.canonical(),
        "client": client,
    })))
}
