// libs/calendar-sync-cell/tests/sync_test.rs
use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{extract::{Path, State}, Json};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{Authorization, authorization::Bearer};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use calendar_sync_cell::handlers::sync_appointment;
use calendar_sync_cell::models::*;
use calendar_sync_cell::services::{local_today, CalendarSyncDispatcher, CalendarSyncService};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig, TEST_TOKEN};

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";

fn appointment_row(appointment_id: Uuid, professional_id: Uuid, status: &str, event_id: Option<&str>) -> serde_json::Value {
    let mut row = MockSupabaseResponses::appointment(
        appointment_id,
        professional_id,
        Uuid::new_v4(),
        "2030-05-06",
        "10:00:00",
        "10:30:00",
        status,
        event_id,
    );
    row["client"] = json!({ "name": "Ana Ruiz", "phone": "+34 612345678", "email": "ana@example.com" });
    row["service"] = json!({ "name": "Physiotherapy" });
    row
}

async fn mount_appointment(server: &MockServer, row: serde_json::Value, times: Option<u64>) {
    let id = row["id"].as_str().unwrap().to_string();
    let mock = Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", id).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

async fn mount_credentials(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/calendar_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([body])))
        .mount(server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/calendar_credentials"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn mount_record_updates(server: &MockServer) {
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn mount_token_refresh(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn syncing_twice_creates_one_event_then_updates_it() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    // Before the first sync the row has no event id; afterwards it does.
    mount_appointment(&server, appointment_row(appointment_id, professional_id, "confirmed", None), Some(1)).await;
    mount_appointment(&server, appointment_row(appointment_id, professional_id, "confirmed", Some("evt-1")), None).await;
    mount_credentials(&server, MockSupabaseResponses::calendar_credentials(professional_id)).await;
    mount_record_updates(&server).await;

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer google-access-token"))
        .and(body_partial_json(json!({
            "summary": "Physiotherapy - Ana Ruiz",
            "start": { "dateTime": "2030-05-06T10:00:00", "timeZone": "Europe/Madrid" },
            "attendees": [{ "email": "ana@example.com" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::google_event("evt-1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/evt-1", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::google_event("evt-1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/evt-1", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::google_event("evt-1")))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let service = CalendarSyncService::new(&config).unwrap();
    let target = SyncTarget::Appointment(appointment_id);

    let first = service.sync(target, TEST_TOKEN).await.unwrap();
    assert_eq!(first.action, SyncAction::Created);
    assert_eq!(first.event_id.as_deref(), Some("evt-1"));

    let second = service.sync(target, TEST_TOKEN).await.unwrap();
    assert_eq!(second.action, SyncAction::Updated);
    assert_eq!(second.event_id.as_deref(), Some("evt-1"));
}

#[tokio::test]
async fn event_deleted_externally_is_recreated() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_appointment(&server, appointment_row(appointment_id, professional_id, "confirmed", Some("evt-gone")), None).await;
    mount_credentials(&server, MockSupabaseResponses::calendar_credentials(professional_id)).await;
    mount_record_updates(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/evt-gone", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/evt-gone", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::google_event("evt-new")))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let service = CalendarSyncService::new(&config).unwrap();
    let outcome = service.sync(SyncTarget::Appointment(appointment_id), TEST_TOKEN).await.unwrap();

    assert_eq!(outcome.action, SyncAction::Created);
    assert_eq!(outcome.event_id.as_deref(), Some("evt-new"));
}

#[tokio::test]
async fn expired_token_is_refreshed_before_writing() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_appointment(&server, appointment_row(appointment_id, professional_id, "confirmed", None), None).await;
    mount_credentials(&server, MockSupabaseResponses::expired_calendar_credentials(professional_id)).await;
    mount_record_updates(&server).await;
    mount_token_refresh(&server, "fresh-token").await;

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::google_event("evt-2")))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let service = CalendarSyncService::new(&config).unwrap();
    let outcome = service.sync(SyncTarget::Appointment(appointment_id), TEST_TOKEN).await.unwrap();

    assert_eq!(outcome.event_id.as_deref(), Some("evt-2"));
}

#[tokio::test]
async fn rejected_token_is_refreshed_once_and_retried() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_appointment(&server, appointment_row(appointment_id, professional_id, "confirmed", None), None).await;
    mount_credentials(&server, MockSupabaseResponses::calendar_credentials(professional_id)).await;
    mount_record_updates(&server).await;
    mount_token_refresh(&server, "fresh-token").await;

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer google-access-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::google_event("evt-3")))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let service = CalendarSyncService::new(&config).unwrap();
    let outcome = service.sync(SyncTarget::Appointment(appointment_id), TEST_TOKEN).await.unwrap();

    assert_eq!(outcome.action, SyncAction::Created);
    assert_eq!(outcome.event_id.as_deref(), Some("evt-3"));
}

#[tokio::test]
async fn cancelled_appointment_removes_its_event() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_appointment(&server, appointment_row(appointment_id, professional_id, "cancelled", Some("evt-4")), None).await;
    mount_credentials(&server, MockSupabaseResponses::calendar_credentials(professional_id)).await;

    Mock::given(method("DELETE"))
        .and(path(format!("{}/evt-4", EVENTS_PATH)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "external_calendar_event_id": null, "synced_with_google": false })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let service = CalendarSyncService::new(&config).unwrap();
    let outcome = service.sync(SyncTarget::Appointment(appointment_id), TEST_TOKEN).await.unwrap();

    assert_eq!(outcome.action, SyncAction::Removed);
    assert_eq!(outcome.event_id.as_deref(), Some("evt-4"));
}

#[tokio::test]
async fn missing_credentials_are_reported() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_appointment(&server, appointment_row(appointment_id, professional_id, "confirmed", None), None).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/calendar_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let service = CalendarSyncService::new(&config).unwrap();
    let result = service.sync(SyncTarget::Appointment(appointment_id), TEST_TOKEN).await;

    assert_matches!(result, Err(CalendarSyncError::CredentialsMissing(id)) if id == professional_id);
}

#[tokio::test]
async fn pending_sync_counts_failures() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let missing_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("synced_with_google", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": missing_id }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/group_activities"))
        .and(query_param("synced_with_google", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", missing_id).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let service = CalendarSyncService::new(&config).unwrap();
    let report = service.sync_pending(professional_id, TEST_TOKEN).await.unwrap();

    assert_eq!(report.synced, 0);
    assert_eq!(report.failed, 1);
    assert!(report.errors[0].contains(&missing_id.to_string()));
}

#[tokio::test]
async fn pending_sync_starts_at_the_clinic_date() {
    let server = MockServer::start().await;
    let mut config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    config.calendar_timezone = "Pacific/Kiritimati".to_string();
    let today = local_today(&config.calendar_timezone, Utc::now());

    for table in ["appointments", "group_activities"] {
        Mock::given(method("GET"))
            .and(path(format!("/rest/v1/{}", table)))
            .and(query_param("date", format!("gte.{}", today).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let service = CalendarSyncService::new(&config).unwrap();
    let report = service.sync_pending(Uuid::new_v4(), TEST_TOKEN).await.unwrap();

    assert_eq!(report.synced, 0);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn unstored_event_link_fails_the_sync() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_appointment(&server, appointment_row(appointment_id, professional_id, "confirmed", None), None).await;
    mount_credentials(&server, MockSupabaseResponses::calendar_credentials(professional_id)).await;
    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockSupabaseResponses::google_event("evt-orphan")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({ "external_calendar_event_id": "evt-orphan" })))
        .respond_with(ResponseTemplate::new(500).set_body_json(MockSupabaseResponses::error_response(
            "connection reset", "XX000",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_app_config();
    let service = CalendarSyncService::new(&config).unwrap();
    let result = service.sync(SyncTarget::Appointment(appointment_id), TEST_TOKEN).await;

    assert_matches!(result, Err(CalendarSyncError::Database(_)));
}

#[tokio::test]
async fn dispatcher_is_inert_without_configuration() {
    let mut config = TestConfig::default().to_app_config();
    config.google_client_id.clear();

    let dispatcher = CalendarSyncDispatcher::new(Arc::new(config));
    assert!(dispatcher.dispatch(SyncTarget::Appointment(Uuid::new_v4()), TEST_TOKEN).is_none());
    assert!(dispatcher.dispatch_removal(SyncTarget::GroupActivity(Uuid::new_v4()), TEST_TOKEN).is_none());
}

#[tokio::test]
async fn dispatched_failure_stays_in_the_background() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_json(
            MockSupabaseResponses::error_response("boom", "XX000"),
        ))
        .mount(&server)
        .await;

    let dispatcher = CalendarSyncDispatcher::new(TestConfig::with_mock_server(&server.uri()).to_arc());
    let handle = dispatcher
        .dispatch(SyncTarget::Appointment(Uuid::new_v4()), TEST_TOKEN)
        .unwrap();

    assert!(handle.await.is_ok());
}

#[tokio::test]
async fn handler_turns_sync_failure_into_warning() {
    let server = MockServer::start().await;
    let professional_id = Uuid::new_v4();
    let appointment_id = Uuid::new_v4();

    mount_appointment(&server, appointment_row(appointment_id, professional_id, "confirmed", None), None).await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/calendar_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = TestConfig::with_mock_server(&server.uri()).to_arc();
    let auth = TypedHeader(Authorization::bearer(TEST_TOKEN).unwrap());
    let Json(body) = sync_appointment(State(config), auth, Path(appointment_id)).await.unwrap();

    assert_eq!(body["synced"], false);
    assert!(body["warning"].as_str().unwrap().contains("credentials"));
}
