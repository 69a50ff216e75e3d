// libs/calendar-sync-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CalendarSyncError, SyncOutcome, SyncTarget};
use crate::services::CalendarSyncService;

/// External sync never fails the caller's request: anything other than an
/// unknown record comes back as a warning payload.
fn sync_response(result: Result<SyncOutcome, CalendarSyncError>) -> Result<Json<Value>, AppError> {
    match result {
        Ok(outcome) => Ok(Json(json!({
            "synced": true,
            "event_id": outcome.event_id,
            "action": outcome.action,
        }))),
        Err(CalendarSyncError::NotFound(msg)) => Err(AppError::NotFound(msg)),
        Err(e) => {
            warn!("Calendar sync failed: {}", e);
            Ok(Json(json!({
                "synced": false,
                "warning": e.to_string(),
            })))
        }
    }
}

async fn run_sync(config: &AppConfig, target: SyncTarget, token: &str, remove: bool) -> Result<Json<Value>, AppError> {
    let service = match CalendarSyncService::new(config) {
        Ok(service) => service,
        Err(e) => return sync_response(Err(e)),
    };
    let result = if remove {
        service.remove(target, token).await
    } else {
        service.sync(target, token).await
    };
    sync_response(result)
}

pub async fn sync_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    run_sync(&state, SyncTarget::Appointment(appointment_id), auth.token(), false).await
}

pub async fn remove_appointment_event(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    run_sync(&state, SyncTarget::Appointment(appointment_id), auth.token(), true).await
}

pub async fn sync_activity(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    run_sync(&state, SyncTarget::GroupActivity(activity_id), auth.token(), false).await
}

pub async fn remove_activity_event(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(activity_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    run_sync(&state, SyncTarget::GroupActivity(activity_id), auth.token(), true).await
}

pub async fn sync_pending(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(professional_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = CalendarSyncService::new(&state)?;
    let report = service.sync_pending(professional_id, auth.token()).await?;

    Ok(Json(json!({
        "professional_id": professional_id,
        "synced": report.synced,
        "failed": report.failed,
        "errors": report.errors,
    })))
}
