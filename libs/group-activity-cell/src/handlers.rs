// libs/group-activity-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
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
    CreateActivityRequest, EnrollParticipantRequest, RecurrencePreviewRequest,
    UpdateParticipantStatusRequest,
};
use crate::services::{generate_recurrence_dates, GroupActivityService};

// ==============================================================================
// ACTIVITY HANDLERS
// ==============================================================================

pub async fn create_activity(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateActivityRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = GroupActivityService::new(state);
    let result = service.create_activity(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(result))))
}

pub async fn get_activity(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = GroupActivityService::new(state);
    let activity = service.get_activity(activity_id, auth.token()).await?;

    Ok(Json(json!(activity)))
}

pub async fn get_activity_stats(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = GroupActivityService::new(state);
    let stats = service.get_stats(activity_id, auth.token()).await?;

    Ok(Json(json!(stats)))
}

pub async fn preview_recurrence(
    Json(request): Json<RecurrencePreviewRequest>,
) -> Result<Json<Value>, AppError> {
    let dates = generate_recurrence_dates(request.start_date, &request.rule)?;

    Ok(Json(json!({
        "dates": dates,
        "count": dates.len(),
    })))
}

// ==============================================================================
// PARTICIPANT HANDLERS
// ==============================================================================

pub async fn list_participants(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = GroupActivityService::new(state);
    let participants = service.list_participants(activity_id, auth.token()).await?;

    Ok(Json(json!({
        "activity_id": activity_id,
        "participants": participants,
        "total": participants.len(),
    })))
}

pub async fn enroll_participant(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(activity_id): Path<Uuid>,
    Json(request): Json<EnrollParticipantRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = GroupActivityService::new(state);
    let participant = service.enroll_participant(activity_id, request.client_id, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(participant))))
}

pub async fn update_participant_status(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(participant_id): Path<Uuid>,
    Json(request): Json<UpdateParticipantStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let service = GroupActivityService::new(state);
    let participant = service
        .update_participant_status(participant_id, request.status, auth.token())
        .await?;

    Ok(Json(json!(participant)))
}

pub async fn remove_participant(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(participant_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = GroupActivityService::new(state);
    service.remove_participant(participant_id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}
